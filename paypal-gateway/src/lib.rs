//! # PayPal Gateway Driver
//!
//! Adapts the processor's NVP API and IPN webhooks to the storefront's
//! payment-gateway abstraction:
//! - IPN verification and status normalization
//! - Transaction search + per-transaction detail reconciliation
//! - Hosted checkout field mapping
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌───────────────────────────┐
//! │ NotificationVerifier │      │   TransactionReconciler   │
//! └──────────┬───────────┘      └─────────────┬─────────────┘
//!            │                                │
//! ┌──────────▼───────────┐      ┌─────────────▼─────────────┐
//! │  IpnValidator (HTTP) │      │    NvpTransport (HTTP)    │
//! └──────────┬───────────┘      └─────────────┬─────────────┘
//!            │                                │
//!            └───────────────┬────────────────┘
//!                            │
//!            ┌───────────────▼────────────────┐
//!            │ GatewayConfig (sandbox / live, │
//!            │   credentials, timeout)        │
//!            └────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod checkout;
pub mod config;
pub mod error;
pub mod ipn;
pub mod metrics;
pub mod nvp;
pub mod reconcile;
pub mod timestamp;
pub mod types;

pub use checkout::{CheckoutForm, CheckoutRequest};
pub use crate::config::{Credentials, GatewayConfig, Mode};
pub use error::{Error, Result};
pub use ipn::{HttpIpnValidator, IpnValidator, NotificationPayload, NotificationVerifier};
pub use nvp::{HttpNvpClient, NvpResponse, NvpTransport};
pub use reconcile::TransactionReconciler;
pub use types::*;

/// Default NVP API version
pub const DEFAULT_API_VERSION: &str = "124.0";

/// Default request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default transaction search window (days before the range end)
pub const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 30;

/// Upper bound on the configured search window (days)
pub const MAX_SEARCH_WINDOW_DAYS: i64 = 3650;

/// Default number of detail lookups in flight (1 = sequential)
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 1;
