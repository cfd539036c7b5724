// =============================================================================
// Price Source — boundary to the historical data provider
// =============================================================================
//
// The dashboard calls the source exactly once per request. Implementations
// return an empty series (not an error) when the provider has no bars for the
// requested window; errors are reserved for transport and decoding failures.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::PriceSeries;
use crate::types::Interval;

/// Parameters for one history download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub symbol: String,
    /// Inclusive start date (UTC midnight).
    pub start: NaiveDate,
    /// Exclusive end date (UTC midnight).
    pub end: NaiveDate,
    pub interval: Interval,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_history(&self, query: &HistoryQuery) -> Result<PriceSeries>;
}
