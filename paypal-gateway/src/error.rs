//! Error types for the gateway driver

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection could not be established or the HTTP status was an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response shape violates the expected contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Notification proven inauthentic
    #[error("Notification verification failed: {0}")]
    Verification(String),

    /// Processor returned a non-success acknowledgement
    #[error("Gateway returned ACK={ack} for {method}: {response}")]
    Gateway {
        /// NVP method that was called
        method: String,
        /// Acknowledgement value (empty when missing)
        ack: String,
        /// Raw response dump for diagnostics
        response: String,
    },

    /// Field could not be parsed into its expected type
    #[error("Invalid value for field {field}: {value:?}")]
    Validation {
        /// Field name
        field: String,
        /// Raw value
        value: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`]
    pub fn validation(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
