//! Normalized records handed back to the storefront

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalized notification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Funds captured
    Completed,
    /// Awaiting clearance
    Processing,
    /// Denied, expired or failed
    Failed,
    /// Voided, refunded or reversed
    Refunded,
    /// Status the driver does not recognise
    Unknown,
}

impl NotificationStatus {
    /// Classify the processor's literal `payment_status` (case-sensitive)
    pub fn classify(raw: &str) -> Self {
        match raw {
            "Completed" | "Processed" => NotificationStatus::Completed,
            "Denied" | "Expired" | "Failed" => NotificationStatus::Failed,
            "Voided" | "Refunded" | "Reversed" => NotificationStatus::Refunded,
            "Pending" => NotificationStatus::Processing,
            _ => NotificationStatus::Unknown,
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Completed => write!(f, "completed"),
            NotificationStatus::Processing => write!(f, "processing"),
            NotificationStatus::Failed => write!(f, "failed"),
            NotificationStatus::Refunded => write!(f, "refunded"),
            NotificationStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Buyer identity as reported by the processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Verified IPN, normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Merchant-side invoice identifier
    pub payment_id: String,
    /// Normalized status
    pub status: NotificationStatus,
    /// Processor's literal status string
    pub raw_status: String,
    /// Processor transaction ID
    pub gateway_transaction_id: String,
    /// Gross amount
    pub amount: Decimal,
    /// Processor fee (zero when absent)
    pub fee: Decimal,
    /// Settled amount after currency conversion, if any
    pub settle_amount: Option<Decimal>,
    /// Settle-or-gross amount minus fee
    pub net_amount: Decimal,
    /// Conversion rate, if any
    pub exchange_rate: Option<Decimal>,
    /// Currency of the gross amount
    pub currency: Option<String>,
    /// Processor-native payment date, not reparsed
    pub date: String,
    /// Buyer
    pub payer: Payer,
}

/// One transaction, as returned by a detail lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    /// Merchant-side invoice identifier
    pub payment_id: String,
    /// Lower-cased processor status (not mapped to [`NotificationStatus`])
    pub status: String,
    /// Gross amount
    pub amount: Decimal,
    /// Processor fee (zero when absent)
    pub fee: Decimal,
    /// Settled amount, or gross minus fee
    pub net_amount: Decimal,
    /// Tax (zero when absent)
    pub tax: Decimal,
    /// Conversion rate, if any
    pub exchange_rate: Option<Decimal>,
    /// Currency code
    pub currency: Option<String>,
    /// Order time
    pub date: DateTime<Utc>,
    /// Buyer email
    pub buyer_email: String,
}

/// Aggregated query result. Always a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Always 1
    pub current_page: u32,
    /// Number of transactions below
    pub results_in_this_page: usize,
    /// Always 1
    pub total_pages: u32,
    /// Details, in processor order
    pub transactions: Vec<TransactionDetail>,
}

impl TransactionPage {
    /// Wrap details into the degenerate single-page shape
    pub fn single(transactions: Vec<TransactionDetail>) -> Self {
        Self {
            current_page: 1,
            results_in_this_page: transactions.len(),
            total_pages: 1,
            transactions,
        }
    }
}

/// Search range; missing bounds are filled in by [`DateRange::resolve`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Range start
    pub start: Option<DateTime<Utc>>,
    /// Range end
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Range with both bounds set
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Fill defaults: `end = now`, `start = end - window`
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let end = self.end.unwrap_or(now);
        let start = match self.start {
            Some(start) => start,
            None => end.checked_sub_signed(window).ok_or_else(|| {
                let raw = format!("{} days before {}", window.num_days(), end.to_rfc3339());
                Error::validation("STARTDATE", raw)
            })?,
        };

        if start > end {
            return Err(Error::validation("STARTDATE", start.to_rfc3339()));
        }

        Ok((start, end))
    }
}

/// Parse a decimal-formatted field
pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| Error::validation(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_classify_table() {
        for s in ["Completed", "Processed"] {
            assert_eq!(NotificationStatus::classify(s), NotificationStatus::Completed);
        }
        for s in ["Denied", "Expired", "Failed"] {
            assert_eq!(NotificationStatus::classify(s), NotificationStatus::Failed);
        }
        for s in ["Voided", "Refunded", "Reversed"] {
            assert_eq!(NotificationStatus::classify(s), NotificationStatus::Refunded);
        }
        assert_eq!(NotificationStatus::classify("Pending"), NotificationStatus::Processing);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(NotificationStatus::classify("completed"), NotificationStatus::Unknown);
        assert_eq!(NotificationStatus::classify("PENDING"), NotificationStatus::Unknown);
        assert_eq!(NotificationStatus::classify(""), NotificationStatus::Unknown);
        assert_eq!(
            NotificationStatus::classify("Canceled_Reversal"),
            NotificationStatus::Unknown
        );
    }

    #[test]
    fn test_single_page_shape() {
        let page = TransactionPage::single(Vec::new());
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.results_in_this_page, 0);
    }

    #[test]
    fn test_range_defaults() {
        let now = Utc.with_ymd_and_hms(2023, 5, 31, 0, 0, 0).unwrap();
        let (start, end) = DateRange::default().resolve(now, Duration::days(30)).unwrap();
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_range_start_defaults_from_given_end() {
        let end = Utc.with_ymd_and_hms(2023, 2, 10, 12, 0, 0).unwrap();
        let range = DateRange { start: None, end: Some(end) };
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (start, resolved_end) = range.resolve(now, Duration::days(30)).unwrap();
        assert_eq!(resolved_end, end);
        assert_eq!(start, end - Duration::days(30));
    }

    #[test]
    fn test_range_rejects_inverted() {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap();
        let err = DateRange::between(start, end)
            .resolve(end, Duration::days(30))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "STARTDATE"));
    }

    #[test]
    fn test_range_rejects_window_past_calendar() {
        let now = Utc.with_ymd_and_hms(2023, 5, 31, 0, 0, 0).unwrap();
        let err = DateRange::default()
            .resolve(now, Duration::days(200_000_000))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "STARTDATE"));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("mc_gross", "100.00").unwrap(), dec!(100.00));
        assert_eq!(parse_decimal("mc_gross", "-5.25").unwrap(), dec!(-5.25));
        assert!(matches!(
            parse_decimal("mc_gross", "ten"),
            Err(Error::Validation { .. })
        ));
    }
}
