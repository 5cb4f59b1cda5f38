//! Driver configuration (credentials, sandbox/live endpoints, timeouts)

use crate::{Error, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const LIVE_NVP_ENDPOINT: &str = "https://api-3t.paypal.com/nvp";
const SANDBOX_NVP_ENDPOINT: &str = "https://api-3t.sandbox.paypal.com/nvp";
const LIVE_IPN_ENDPOINT: &str = "https://ipnpb.paypal.com/cgi-bin/webscr";
const SANDBOX_IPN_ENDPOINT: &str = "https://ipnpb.sandbox.paypal.com/cgi-bin/webscr";
const LIVE_CHECKOUT_ENDPOINT: &str = "https://www.paypal.com/cgi-bin/webscr";
const SANDBOX_CHECKOUT_ENDPOINT: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";

/// Endpoint selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Processor test environment
    Sandbox,
    /// Production
    Live,
}

/// NVP API credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// API username
    pub username: String,
    /// API password
    pub password: String,
    /// API signature
    pub signature: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("signature", &"<redacted>")
            .finish()
    }
}

/// Gateway driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Sandbox or live
    pub mode: Mode,

    /// NVP credentials
    pub credentials: Credentials,

    /// NVP `VERSION` sent with every call
    pub api_version: String,

    /// Outbound request timeout, passed through to the HTTP client
    pub timeout_seconds: u64,

    /// NVP endpoint override
    #[serde(default)]
    pub nvp_endpoint: Option<String>,

    /// IPN validation endpoint override
    #[serde(default)]
    pub ipn_endpoint: Option<String>,

    /// Hosted checkout endpoint override
    #[serde(default)]
    pub checkout_endpoint: Option<String>,

    /// Default search window when a range has no start
    pub search_window_days: i64,

    /// Detail lookups in flight during a transaction query
    pub detail_concurrency: usize,

    /// Merchant account notifications must be addressed to
    #[serde(default)]
    pub receiver_email: Option<String>,
}

impl GatewayConfig {
    /// Create a config with defaults for the given mode and credentials
    pub fn new(mode: Mode, credentials: Credentials) -> Self {
        Self {
            mode,
            credentials,
            api_version: crate::DEFAULT_API_VERSION.to_string(),
            timeout_seconds: crate::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            nvp_endpoint: None,
            ipn_endpoint: None,
            checkout_endpoint: None,
            search_window_days: crate::DEFAULT_SEARCH_WINDOW_DAYS,
            detail_concurrency: crate::DEFAULT_DETAIL_CONCURRENCY,
            receiver_email: None,
        }
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = config::Config::builder()
            .set_default("mode", "sandbox")?
            .set_default("credentials.username", "")?
            .set_default("credentials.password", "")?
            .set_default("credentials.signature", "")?
            .set_default("api_version", crate::DEFAULT_API_VERSION)?
            .set_default("timeout_seconds", crate::DEFAULT_REQUEST_TIMEOUT_SECONDS as i64)?
            .set_default("search_window_days", crate::DEFAULT_SEARCH_WINDOW_DAYS)?
            .set_default("detail_concurrency", crate::DEFAULT_DETAIL_CONCURRENCY as i64)?;
        Ok(builder)
    }

    /// Load from defaults, optional `PAYPAL_CONFIG_FILE`, then environment
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder()?;

        if let Ok(config_file) = env::var("PAYPAL_CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        }

        // PAYPAL__CREDENTIALS__USERNAME, PAYPAL__TIMEOUT_SECONDS, ...
        builder = builder.add_source(Environment::with_prefix("PAYPAL").separator("__"));

        if let Ok(username) = env::var("PAYPAL_API_USERNAME") {
            builder = builder.set_override("credentials.username", username)?;
        }

        if let Ok(password) = env::var("PAYPAL_API_PASSWORD") {
            builder = builder.set_override("credentials.password", password)?;
        }

        if let Ok(signature) = env::var("PAYPAL_API_SIGNATURE") {
            builder = builder.set_override("credentials.signature", signature)?;
        }

        if let Ok(mode) = env::var("PAYPAL_MODE") {
            builder = builder.set_override("mode", mode.to_lowercase())?;
        }

        let config: GatewayConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an in-memory TOML document layered over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: GatewayConfig = Self::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.is_empty()
            || self.credentials.password.is_empty()
            || self.credentials.signature.is_empty()
        {
            return Err(Error::Config(
                "API username, password and signature are required".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(Error::Config("Timeout cannot be 0".to_string()));
        }

        if self.search_window_days <= 0 {
            return Err(Error::Config(
                "Search window must be at least one day".to_string(),
            ));
        }

        if self.search_window_days > crate::MAX_SEARCH_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "Search window cannot exceed {} days",
                crate::MAX_SEARCH_WINDOW_DAYS
            )));
        }

        if self.detail_concurrency == 0 {
            return Err(Error::Config(
                "Detail concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// NVP endpoint for the configured mode
    pub fn nvp_endpoint(&self) -> &str {
        self.nvp_endpoint.as_deref().unwrap_or(match self.mode {
            Mode::Live => LIVE_NVP_ENDPOINT,
            Mode::Sandbox => SANDBOX_NVP_ENDPOINT,
        })
    }

    /// IPN validation endpoint for the configured mode
    pub fn ipn_endpoint(&self) -> &str {
        self.ipn_endpoint.as_deref().unwrap_or(match self.mode {
            Mode::Live => LIVE_IPN_ENDPOINT,
            Mode::Sandbox => SANDBOX_IPN_ENDPOINT,
        })
    }

    /// Hosted checkout endpoint for the configured mode
    pub fn checkout_endpoint(&self) -> &str {
        self.checkout_endpoint.as_deref().unwrap_or(match self.mode {
            Mode::Live => LIVE_CHECKOUT_ENDPOINT,
            Mode::Sandbox => SANDBOX_CHECKOUT_ENDPOINT,
        })
    }
}
