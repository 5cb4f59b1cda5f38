//! Hosted checkout redirect fields

use crate::{Error, GatewayConfig, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the storefront wants to charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Merchant account (email or merchant ID)
    pub business: String,
    /// Merchant-side invoice identifier
    pub invoice: String,
    /// Line shown to the buyer
    pub item_name: String,
    /// Amount to charge
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Where the buyer lands after paying
    pub return_url: Option<String>,
    /// Where the buyer lands after cancelling
    pub cancel_url: Option<String>,
    /// IPN listener
    pub notify_url: Option<String>,
}

/// Form the buyer's browser posts to the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutForm {
    /// Form action URL
    pub action: String,
    /// Ordered form fields
    pub fields: Vec<(&'static str, String)>,
}

impl CheckoutForm {
    /// Map a checkout request to redirect fields for the configured mode
    pub fn build(config: &GatewayConfig, request: &CheckoutRequest) -> Result<Self> {
        if request.business.trim().is_empty() {
            return Err(Error::validation("business", request.business.as_str()));
        }
        if request.invoice.trim().is_empty() {
            return Err(Error::validation("invoice", request.invoice.as_str()));
        }
        if request.amount <= Decimal::ZERO {
            return Err(Error::validation("amount", request.amount.to_string()));
        }

        let mut fields = vec![
            ("cmd", "_xclick".to_string()),
            ("business", request.business.clone()),
            ("invoice", request.invoice.clone()),
            ("item_name", request.item_name.clone()),
            ("amount", format!("{:.2}", request.amount)),
            ("currency_code", request.currency.to_uppercase()),
            ("charset", "utf-8".to_string()),
            ("no_shipping", "1".to_string()),
        ];

        let optional = [
            ("return", &request.return_url),
            ("cancel_return", &request.cancel_url),
            ("notify_url", &request.notify_url),
        ];
        fields.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone()))),
        );

        Ok(Self {
            action: config.checkout_endpoint().to_string(),
            fields,
        })
    }

    /// Value of a field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}
