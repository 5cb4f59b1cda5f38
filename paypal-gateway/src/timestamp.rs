//! NVP timestamp format (`YYYY-MM-DDTHH:MM:SSZ`, always UTC)

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// strftime pattern used by the NVP API for request and response timestamps
pub const NVP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a UTC timestamp for an NVP request field
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(NVP_TIMESTAMP_FORMAT).to_string()
}

/// Parse an NVP timestamp, naming `field` on failure
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, NVP_TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| Error::validation(field, raw))
}
