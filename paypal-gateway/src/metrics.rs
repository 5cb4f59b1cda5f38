//! Gateway metrics

use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static::lazy_static! {
    /// NVP calls by method and outcome (success, failure, error)
    pub static ref NVP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "paypal_nvp_requests_total",
        "Total NVP calls",
        &["method", "outcome"]
    )
    .expect("register paypal_nvp_requests_total");

    /// NVP call latency by method
    pub static ref NVP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "paypal_nvp_request_duration_seconds",
        "NVP call duration",
        &["method"]
    )
    .expect("register paypal_nvp_request_duration_seconds");

    /// IPN post-back outcomes
    pub static ref IPN_VERIFICATIONS_TOTAL: CounterVec = register_counter_vec!(
        "paypal_ipn_verifications_total",
        "IPN verification outcomes (verified, invalid, error)",
        &["outcome"]
    )
    .expect("register paypal_ipn_verifications_total");
}
