//! Transaction reconciliation over NVP
//!
//! `TransactionSearch` lists every ledger line in a range; only payment
//! lines are kept, and each surviving transaction ID is resolved with
//! `GetTransactionDetails`. Any failed call fails the whole query.

use crate::{
    nvp::{HttpNvpClient, NvpResponse, NvpTransport},
    timestamp::{format_timestamp, parse_timestamp},
    types::parse_decimal,
    DateRange, Error, GatewayConfig, Result, TransactionDetail, TransactionPage,
};
use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// NVP method listing transactions in a range
pub const SEARCH_METHOD: &str = "TransactionSearch";

/// NVP method fetching one transaction
pub const DETAILS_METHOD: &str = "GetTransactionDetails";

/// Transaction reconciler
pub struct TransactionReconciler {
    transport: Arc<dyn NvpTransport>,
    search_window: Duration,
    detail_concurrency: usize,
}

impl TransactionReconciler {
    /// Create reconciler with the default window and sequential detail lookups
    pub fn new(transport: Arc<dyn NvpTransport>) -> Self {
        Self {
            transport,
            search_window: Duration::days(crate::DEFAULT_SEARCH_WINDOW_DAYS),
            detail_concurrency: crate::DEFAULT_DETAIL_CONCURRENCY,
        }
    }

    /// Reconciler over HTTPS NVP, using the configured window and concurrency
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpNvpClient::new(config)?))
            .with_search_window_days(config.search_window_days)
            .with_detail_concurrency(config.detail_concurrency))
    }

    /// Window used when a range has no start; out-of-range day counts saturate
    pub fn with_search_window_days(mut self, days: i64) -> Self {
        self.search_window = Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        self
    }

    /// Detail lookups in flight; 1 keeps them strictly sequential
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    /// Search a range and resolve every payment in it
    pub async fn query_transactions(&self, range: DateRange) -> Result<TransactionPage> {
        let (start, end) = range.resolve(Utc::now(), self.search_window)?;
        info!(
            "Searching transactions from {} to {}",
            format_timestamp(&start),
            format_timestamp(&end)
        );

        let response = self
            .transport
            .call(
                SEARCH_METHOD,
                &[
                    ("STARTDATE", format_timestamp(&start)),
                    ("ENDDATE", format_timestamp(&end)),
                ],
            )
            .await?
            .ensure_success(SEARCH_METHOD)?;

        let ids = payment_transaction_ids(&response);
        info!("Search returned {} payment transaction(s)", ids.len());

        let transactions = if self.detail_concurrency <= 1 {
            let mut transactions = Vec::with_capacity(ids.len());
            for id in &ids {
                transactions.push(self.get_details(id).await?);
            }
            transactions
        } else {
            // `buffered` keeps input order; `try_collect` stops at the first error
            stream::iter(ids.iter())
                .map(|id| self.get_details(id))
                .buffered(self.detail_concurrency)
                .try_collect::<Vec<_>>()
                .await?
        };

        Ok(TransactionPage::single(transactions))
    }

    /// Fetch and normalize one transaction
    pub async fn get_details(&self, transaction_id: &str) -> Result<TransactionDetail> {
        debug!("Fetching details for transaction {}", transaction_id);
        let response = self
            .transport
            .call(DETAILS_METHOD, &[("TRANSACTIONID", transaction_id.to_string())])
            .await?
            .ensure_success(DETAILS_METHOD)?;

        map_details(&response)
    }
}

/// Transaction IDs whose paired `L_TYPE<i>` is `payment` (any case), in index order
pub fn payment_transaction_ids(response: &NvpResponse) -> Vec<String> {
    let types = response.indexed("L_TYPE");
    response
        .indexed("L_TRANSACTIONID")
        .into_iter()
        .filter(|(i, _)| {
            types
                .get(i)
                .is_some_and(|kind| kind.eq_ignore_ascii_case("payment"))
        })
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Map a `GetTransactionDetails` response into a [`TransactionDetail`]
pub fn map_details(response: &NvpResponse) -> Result<TransactionDetail> {
    let decimal = |field: &str| -> Result<Option<Decimal>> {
        response
            .get(field)
            .map(|raw| parse_decimal(field, raw))
            .transpose()
    };
    let text = |field: &str| response.get(field).unwrap_or_default().to_string();

    let amount = decimal("AMT")?.ok_or_else(|| Error::validation("AMT", ""))?;
    let fee = decimal("FEEAMT")?.unwrap_or_default();
    let net_amount = match decimal("SETTLEAMT")? {
        Some(settled) => settled,
        None => amount
            .checked_sub(fee)
            .ok_or_else(|| Error::validation("FEEAMT", text("FEEAMT")))?,
    };
    let date = parse_timestamp("ORDERTIME", response.get("ORDERTIME").unwrap_or_default())?;

    Ok(TransactionDetail {
        payment_id: text("INVNUM"),
        status: text("PAYMENTSTATUS").to_lowercase(),
        amount,
        fee,
        net_amount,
        tax: decimal("TAXAMT")?.unwrap_or_default(),
        exchange_rate: decimal("EXCHANGERATE")?,
        currency: response.get("CURRENCYCODE").map(str::to_string),
        date,
        buyer_email: text("EMAIL"),
    })
}
