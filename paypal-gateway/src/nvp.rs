//! NVP (name-value-pair) RPC client

use crate::{config::Credentials, metrics::*, Error, GatewayConfig, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

/// Literal acknowledgement marker for a successful call
pub const ACK_SUCCESS: &str = "Success";

/// Parsed NVP response, in the order the processor sent the fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NvpResponse {
    fields: Vec<(String, String)>,
}

impl NvpResponse {
    /// Parse a form-encoded response body
    pub fn parse(body: &str) -> Self {
        let fields = form_urlencoded::parse(body.trim().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { fields }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `ACK` field
    pub fn ack(&self) -> Option<&str> {
        self.get("ACK")
    }

    /// True when `ACK` is exactly [`ACK_SUCCESS`]
    pub fn is_success(&self) -> bool {
        self.ack() == Some(ACK_SUCCESS)
    }

    /// Fail with [`Error::Gateway`] unless the call was acknowledged
    pub fn ensure_success(self, method: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let ack = self.ack().unwrap_or_default().to_string();
        warn!("NVP {} returned ACK={:?}: {}", method, ack, self.dump());
        Err(Error::Gateway {
            method: method.to_string(),
            ack,
            response: self.dump(),
        })
    }

    /// Values of `<prefix><i>` keys by numeric index `i`
    ///
    /// Keys whose suffix is not a plain decimal index are skipped.
    pub fn indexed(&self, prefix: &str) -> BTreeMap<u32, &str> {
        self.fields
            .iter()
            .filter_map(|(k, v)| {
                let suffix = k.strip_prefix(prefix)?;
                if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                suffix.parse::<u32>().ok().map(|i| (i, v.as_str()))
            })
            .collect()
    }

    /// Raw response, re-encoded, for diagnostics
    pub fn dump(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the response has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NvpResponse {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// NVP transport
#[async_trait]
pub trait NvpTransport: Send + Sync {
    /// Call `method` with method-specific `params`; credentials are added by the transport
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<NvpResponse>;
}

/// NVP over HTTPS
pub struct HttpNvpClient {
    endpoint: String,
    credentials: Credentials,
    api_version: String,
    client: Client,
}

impl HttpNvpClient {
    /// Create new NVP client
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: config.nvp_endpoint().to_string(),
            credentials: config.credentials.clone(),
            api_version: config.api_version.clone(),
            client,
        })
    }

    async fn post(&self, method: &str, params: &[(&str, String)]) -> Result<NvpResponse> {
        let mut form: Vec<(&str, &str)> = vec![
            ("USER", self.credentials.username.as_str()),
            ("PWD", self.credentials.password.as_str()),
            ("SIGNATURE", self.credentials.signature.as_str()),
            ("VERSION", self.api_version.as_str()),
            ("METHOD", method),
        ];
        form.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "NVP endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        Ok(NvpResponse::parse(&body))
    }
}

#[async_trait]
impl NvpTransport for HttpNvpClient {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<NvpResponse> {
        info!("NVP call {} to {}", method, self.endpoint);
        debug!("NVP {} params: {:?}", method, params);

        let start = Instant::now();
        let result = self.post(method, params).await;
        NVP_REQUEST_DURATION
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(response) if response.is_success() => "success",
            Ok(_) => "failure",
            Err(e) => {
                error!("NVP {} transport failure: {}", method, e);
                "error"
            }
        };
        NVP_REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();

        result
    }
}
