// =============================================================================
// Yahoo Finance Chart API Client — historical OHLC download
// =============================================================================
//
// One GET per dashboard request against `/v8/finance/chart/{symbol}`. No retry
// and no caching. A provider-side error object (unknown symbol, interval not
// available for the window) is reported as an empty series; transport and
// decoding failures are errors.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::{HistoryQuery, PriceBar, PriceSeries, PriceSource};

/// Some edge nodes reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) candle-dashboard/1.0";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `YahooClient`.
    ///
    /// # Arguments
    /// * `base_url` — e.g. `https://query1.finance.yahoo.com` (no trailing slash).
    /// * `timeout`  — per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET request for `query`. The symbol travels as a single encoded path
    /// segment and the end date is exclusive.
    pub fn history_request(&self, query: &HistoryQuery) -> Result<reqwest::Request> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid Yahoo base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Yahoo base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", query.symbol.as_str()]);

        let period1 = midnight_utc(query.start).to_string();
        let period2 = midnight_utc(query.end).to_string();

        self.client
            .get(url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", query.interval.as_str()),
                ("includePrePost", "false"),
                ("events", "div,splits"),
            ])
            .build()
            .context("failed to build chart request")
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    /// GET /v8/finance/chart/{symbol}.
    #[instrument(skip(self), fields(symbol = %query.symbol, interval = %query.interval), name = "yahoo::fetch_history")]
    async fn fetch_history(&self, query: &HistoryQuery) -> Result<PriceSeries> {
        let request = self.history_request(query)?;
        debug!(url = %request.url(), "requesting history");

        let resp = self
            .client
            .execute(request)
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if !status.is_success() => {
                anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}: {e}");
            }
            Err(e) => return Err(e).context("failed to parse chart response"),
        };

        let series = envelope.into_series(&query.symbol)?;
        debug!(%status, count = series.len(), "history fetched");
        Ok(series)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// -------------------------------------------------------------------------
// Wire format
// -------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    /// Absent when the window holds no bars.
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    /// Exchange offset from UTC in seconds, e.g. 19800 for NSE.
    #[serde(default)]
    gmtoffset: Option<i32>,
    #[serde(default)]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartEnvelope {
    fn into_series(self, symbol: &str) -> Result<PriceSeries> {
        if let Some(err) = self.chart.error {
            warn!(symbol, code = %err.code, description = %err.description, "provider returned no data");
            return Ok(PriceSeries::empty());
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(PriceSeries::empty());
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        let mut skipped = 0usize;

        for (i, &ts) in result.timestamp.iter().enumerate() {
            let field = |col: &[Option<f64>]| col.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) = (
                field(&quote.open[..]),
                field(&quote.high[..]),
                field(&quote.low[..]),
                field(&quote.close[..]),
            ) else {
                skipped += 1;
                continue;
            };
            let Some(time) = DateTime::<Utc>::from_timestamp(ts, 0) else {
                skipped += 1;
                continue;
            };

            bars.push(PriceBar {
                time,
                open,
                high,
                low,
                close,
                volume: field(&quote.volume[..]),
            });
        }

        if skipped > 0 {
            debug!(symbol, skipped, "dropped incomplete bars");
        }

        let series = PriceSeries::from_unordered(bars);
        match result.meta.gmtoffset.and_then(FixedOffset::east_opt) {
            Some(offset) => {
                debug!(
                    symbol,
                    %offset,
                    timezone = result.meta.exchange_timezone_name.as_deref().unwrap_or("?"),
                    "exchange offset applied"
                );
                Ok(series.with_utc_offset(offset))
            }
            None => Ok(series),
        }
    }
}
