//! Verify a raw IPN body read from stdin and print the normalized record

use anyhow::Context;
use paypal_gateway::{GatewayConfig, NotificationPayload, NotificationVerifier};
use std::io::Read;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .context("Failed to read IPN body from stdin")?;

    let payload = NotificationPayload::from_form_body(&body);
    if payload.fields().is_empty() {
        anyhow::bail!("empty IPN body");
    }

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    let verifier = NotificationVerifier::from_config(&config)?;
    let record = verifier.verify(&payload).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
