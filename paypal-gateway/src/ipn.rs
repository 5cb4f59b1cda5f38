//! IPN (instant payment notification) verification
//!
//! A notification is only trusted after it has been posted back to the
//! processor verbatim, prefixed with `cmd=_notify-validate`, and the
//! processor has answered with the single line `VERIFIED`.

use crate::{metrics::*, types::parse_decimal, Error, GatewayConfig, Result};
use crate::{NotificationRecord, NotificationStatus, Payer};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

/// Field prepended to the re-posted payload
pub const VALIDATE_COMMAND: (&str, &str) = ("cmd", "_notify-validate");

/// Raw notification fields, in the order they were received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPayload {
    fields: Vec<(String, String)>,
}

impl NotificationPayload {
    /// Parse a form-encoded webhook body
    pub fn from_form_body(body: &str) -> Self {
        form_urlencoded::parse(body.trim().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in received order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn decimal(&self, key: &str) -> Result<Option<rust_decimal::Decimal>> {
        self.get(key).map(|raw| parse_decimal(key, raw)).transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NotificationPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Processor's answer to a validation post-back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// `VERIFIED`
    Verified,
    /// `INVALID`
    Invalid,
}

impl VerificationOutcome {
    /// Interpret the response body; anything but exactly one known line is ambiguous
    pub fn parse(body: &str) -> Result<Self> {
        let lines: Vec<&str> = body.lines().collect();
        match lines.as_slice() {
            [line] => match *line {
                "VERIFIED" => Ok(VerificationOutcome::Verified),
                "INVALID" => Ok(VerificationOutcome::Invalid),
                _ => Err(ambiguous(body)),
            },
            _ => Err(ambiguous(body)),
        }
    }
}

fn ambiguous(body: &str) -> Error {
    let excerpt: String = body.chars().take(200).collect();
    Error::Protocol(format!("ambiguous verification response: {:?}", excerpt))
}

/// Posts a payload back to the processor and returns the raw response body
#[async_trait]
pub trait IpnValidator: Send + Sync {
    /// Re-post `payload` with the validate command
    async fn validate(&self, payload: &NotificationPayload) -> Result<String>;
}

/// IPN validation over HTTPS
pub struct HttpIpnValidator {
    endpoint: String,
    client: Client,
}

impl HttpIpnValidator {
    /// Create new validator
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: config.ipn_endpoint().to_string(),
            client,
        })
    }
}

#[async_trait]
impl IpnValidator for HttpIpnValidator {
    async fn validate(&self, payload: &NotificationPayload) -> Result<String> {
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(payload.fields().len() + 1);
        form.push(VALIDATE_COMMAND);
        form.extend(payload.fields().iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Transport(format!(
                "IPN endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Verifies IPNs and maps them to [`NotificationRecord`]s
pub struct NotificationVerifier {
    validator: Arc<dyn IpnValidator>,
    receiver_email: Option<String>,
}

impl NotificationVerifier {
    /// Create verifier over any validator
    pub fn new(validator: Arc<dyn IpnValidator>) -> Self {
        Self {
            validator,
            receiver_email: None,
        }
    }

    /// Verifier over HTTPS, honouring `receiver_email`
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let verifier = Self::new(Arc::new(HttpIpnValidator::new(config)?));
        Ok(match &config.receiver_email {
            Some(email) => verifier.with_receiver_email(email.clone()),
            None => verifier,
        })
    }

    /// Require notifications to be addressed to `email`
    pub fn with_receiver_email(mut self, email: impl Into<String>) -> Self {
        self.receiver_email = Some(email.into());
        self
    }

    /// Verify authenticity with the processor, then normalize
    pub async fn verify(&self, payload: &NotificationPayload) -> Result<NotificationRecord> {
        let txn_id = payload.get("txn_id").unwrap_or_default();

        let body = match self.validator.validate(payload).await {
            Ok(body) => body,
            Err(e) => {
                error!("IPN validation for txn {} failed: {}", txn_id, e);
                IPN_VERIFICATIONS_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };

        match VerificationOutcome::parse(&body) {
            Ok(VerificationOutcome::Verified) => {
                IPN_VERIFICATIONS_TOTAL.with_label_values(&["verified"]).inc();
            }
            Ok(VerificationOutcome::Invalid) => {
                warn!("IPN for txn {} rejected as INVALID", txn_id);
                IPN_VERIFICATIONS_TOTAL.with_label_values(&["invalid"]).inc();
                return Err(Error::Verification(format!(
                    "processor reported INVALID for txn {:?}",
                    txn_id
                )));
            }
            Err(e) => {
                IPN_VERIFICATIONS_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        }

        if let Some(expected) = &self.receiver_email {
            let receiver = payload.get("receiver_email").unwrap_or_default();
            if !receiver.eq_ignore_ascii_case(expected) {
                warn!(
                    "IPN for txn {} addressed to {:?}, expected {:?}",
                    txn_id, receiver, expected
                );
                return Err(Error::Verification(format!(
                    "notification addressed to {:?}",
                    receiver
                )));
            }
        }

        let record = map_notification(payload)?;
        info!(
            "IPN verified: txn {} invoice {} status {} ({})",
            record.gateway_transaction_id, record.payment_id, record.status, record.raw_status
        );
        Ok(record)
    }
}

/// Map a verified payload into a [`NotificationRecord`]
pub fn map_notification(payload: &NotificationPayload) -> Result<NotificationRecord> {
    let raw_status = payload.text("payment_status");

    let amount = payload
        .decimal("mc_gross")?
        .ok_or_else(|| Error::validation("mc_gross", ""))?;
    let fee = payload.decimal("mc_fee")?.unwrap_or_default();
    let settle_amount = payload.decimal("settle_amount")?;
    let exchange_rate = payload.decimal("exchange_rate")?;
    let net_amount = settle_amount
        .unwrap_or(amount)
        .checked_sub(fee)
        .ok_or_else(|| Error::validation("mc_fee", payload.text("mc_fee")))?;

    let name = format!("{} {}", payload.text("first_name"), payload.text("last_name"))
        .trim()
        .to_string();

    debug!(
        "IPN amounts: gross={} fee={} settle={:?} net={}",
        amount, fee, settle_amount, net_amount
    );

    Ok(NotificationRecord {
        payment_id: payload.text("invoice"),
        status: NotificationStatus::classify(&raw_status),
        raw_status,
        gateway_transaction_id: payload.text("txn_id"),
        amount,
        fee,
        settle_amount,
        net_amount,
        exchange_rate,
        currency: payload.get("mc_currency").map(str::to_string),
        date: payload.text("payment_date"),
        payer: Payer {
            name,
            email: payload.text("payer_email"),
        },
    })
}
