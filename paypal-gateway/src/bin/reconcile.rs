//! Print reconciled transactions for a date range as JSON
//!
//! Usage: `paypal-reconcile [START [END]]` with RFC 3339 timestamps.
//! Missing bounds default to the configured search window ending now.

use anyhow::Context;
use chrono::{DateTime, Utc};
use paypal_gateway::{DateRange, GatewayConfig, TransactionReconciler};

fn parse_bound(arg: Option<String>) -> anyhow::Result<Option<DateTime<Utc>>> {
    arg.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .with_context(|| format!("invalid timestamp {:?}", raw))
    })
    .transpose()
}

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

    let mut args = std::env::args().skip(1);
    let range = DateRange {
        start: parse_bound(args.next())?,
        end: parse_bound(args.next())?,
    };

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    tracing::info!("Reconciling against {:?} endpoint", config.mode);

    let reconciler = TransactionReconciler::from_config(&config)?;
    let page = reconciler.query_transactions(range).await?;

    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
