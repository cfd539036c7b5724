// =============================================================================
// Dashboard Pipeline — fetch → compute → assemble → summarise
// =============================================================================
//
// One explicit call per user trigger. Every stage recomputes from the freshly
// downloaded series; nothing survives between requests.
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chart::{self, ChartSpec};
use crate::indicators::{self, rsi, IndicatorRequest, IndicatorSet};
use crate::market_data::{HistoryQuery, PriceSeries, PriceSource};
use crate::types::{IndicatorKind, Interval};

/// Notice shown in place of a chart when the source returns no bars.
pub const NO_DATA_MESSAGE: &str = "No data available for the selected dates.";

// =============================================================================
// Request / response
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub symbol: String,
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub interval: Interval,
    pub indicators: IndicatorRequest,
}

impl DashboardRequest {
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.symbol.trim().is_empty() {
            return Err(DashboardError::InvalidRequest("symbol must not be empty".into()));
        }
        if self.start > self.end {
            return Err(DashboardError::InvalidRequest(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        self.indicators
            .validate()
            .map_err(|e| DashboardError::InvalidRequest(e.to_string()))
    }

    pub fn history_query(&self) -> HistoryQuery {
        HistoryQuery {
            symbol: self.symbol.trim().to_string(),
            start: self.start,
            end: self.end,
            interval: self.interval,
        }
    }
}

/// Headline value for one enabled indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub kind: IndicatorKind,
    pub label: String,
    /// Value at the final bar; `None` when still in warm-up.
    pub value: Option<f64>,
    /// `value` to two decimals, or `"N/A"`.
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub symbol: String,
    pub interval: Interval,
    pub bars: usize,
    pub chart: ChartSpec,
    pub summary: Vec<SummaryCard>,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("{}", NO_DATA_MESSAGE)]
    EmptyResult { symbol: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("price source failed: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

// =============================================================================
// Pipeline
// =============================================================================

/// Validate, download once, then build the dashboard.
pub async fn run(
    source: &dyn PriceSource,
    request: &DashboardRequest,
) -> Result<Dashboard, DashboardError> {
    request.validate()?;

    let query = request.history_query();
    let series = source.fetch_history(&query).await?;

    info!(
        symbol = %query.symbol,
        interval = %query.interval,
        start = %query.start,
        end = %query.end,
        bars = series.len(),
        "history retrieved"
    );

    build(request, &series)
}

/// Compute indicators and assemble the chart for an already-downloaded series.
pub fn build(request: &DashboardRequest, series: &PriceSeries) -> Result<Dashboard, DashboardError> {
    let symbol = request.symbol.trim().to_string();

    if series.is_empty() {
        warn!(symbol = %symbol, "empty result, skipping computation");
        return Err(DashboardError::EmptyResult { symbol });
    }

    let indicators = indicators::compute(series, &request.indicators);
    let chart = chart::assemble(&symbol, series, &indicators, request.interval);
    let summary = summarize(&request.indicators, &indicators);

    Ok(Dashboard {
        symbol,
        interval: request.interval,
        bars: series.len(),
        chart,
        summary,
    })
}

/// One card per enabled indicator, in display order.
pub fn summarize(request: &IndicatorRequest, set: &IndicatorSet) -> Vec<SummaryCard> {
    request
        .enabled()
        .into_iter()
        .filter_map(|kind| {
            let series = set.get(kind)?;
            let value = series.latest();
            let note = match kind {
                IndicatorKind::Rsi => value.map(|v| rsi::rsi_zone(v).to_string()),
                IndicatorKind::Supertrend => series.latest_direction().map(|d| d.to_string()),
                IndicatorKind::EmaShort | IndicatorKind::EmaLong => None,
            };
            Some(SummaryCard {
                kind,
                label: series.label.clone(),
                value,
                display: format_value(value),
                note,
            })
        })
        .collect()
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "N/A".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{PanelKind, Trace};
    use crate::indicators::{EmaParams, RsiParams, SupertrendParams};
    use crate::market_data::PriceBar;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Thirty consecutive daily bars for a synthetic symbol.
    fn thirty_days() -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..30)
            .map(|i| {
                let x = i as f64;
                let close = 200.0 + (x * 0.5).sin() * 8.0 + x * 0.5;
                PriceBar::new(start + Duration::days(i), close - 1.0, close + 3.0, close - 3.0, close)
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn request(indicators: IndicatorRequest) -> DashboardRequest {
        DashboardRequest {
            symbol: "SYNTH".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            interval: Interval::OneDay,
            indicators,
        }
    }

    fn all_indicators() -> IndicatorRequest {
        IndicatorRequest {
            rsi: Some(RsiParams { period: 14 }),
            ema_short: Some(EmaParams { period: 10 }),
            ema_long: Some(EmaParams { period: 20 }),
            supertrend: Some(SupertrendParams {
                atr_period: 10,
                multiplier: 3.0,
            }),
        }
    }

    struct StubSource {
        series: PriceSeries,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(series: PriceSeries) -> Self {
            Self {
                series,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceSource for StubSource {
        async fn fetch_history(&self, _query: &HistoryQuery) -> anyhow::Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.series.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PriceSource for FailingSource {
        async fn fetch_history(&self, _query: &HistoryQuery) -> anyhow::Result<PriceSeries> {
            anyhow::bail!("connection reset")
        }
    }

    // ---- build -----------------------------------------------------------

    #[test]
    fn thirty_bar_scenario_with_everything_enabled() {
        let series = thirty_days();
        let dash = build(&request(all_indicators()), &series).unwrap();

        assert_eq!(dash.bars, 30);
        assert_eq!(dash.chart.panels.len(), 2);
        assert_eq!(dash.chart.title, "Candlestick chart for SYNTH");

        let set = indicators::compute(&series, &all_indicators());
        let defined_from = |kind| {
            set.get(kind)
                .unwrap()
                .points
                .iter()
                .position(|p| p.value.is_some())
                .unwrap()
        };
        // 1-based bar numbers: RSI 15..30, EMA-10 10..30, EMA-20 20..30.
        assert_eq!(defined_from(IndicatorKind::Rsi) + 1, 15);
        assert_eq!(defined_from(IndicatorKind::EmaShort) + 1, 10);
        assert_eq!(defined_from(IndicatorKind::EmaLong) + 1, 20);

        // The plotted lines carry exactly the defined values.
        let plotted = |kind: IndicatorKind| {
            dash.chart
                .panels
                .iter()
                .flat_map(|p| p.traces.iter())
                .find_map(|t| match t {
                    Trace::Line { indicator, values, .. } if *indicator == kind => {
                        Some(values.iter().filter(|v| v.is_some()).count())
                    }
                    _ => None,
                })
                .unwrap_or_else(|| panic!("{kind} not plotted"))
        };
        assert_eq!(plotted(IndicatorKind::Rsi), 16);
        assert_eq!(plotted(IndicatorKind::EmaShort), 21);
        assert_eq!(plotted(IndicatorKind::EmaLong), 11);
        assert_eq!(plotted(IndicatorKind::Supertrend), 20);
        assert_eq!(set.get(IndicatorKind::Rsi).unwrap().defined_count(), 16);
        assert_eq!(set.get(IndicatorKind::EmaShort).unwrap().defined_count(), 21);
        assert_eq!(set.get(IndicatorKind::EmaLong).unwrap().defined_count(), 11);

        assert_eq!(dash.summary.len(), 4);
        let price_range = 150.0..=260.0;
        for card in &dash.summary {
            let v = card.value.unwrap_or_else(|| panic!("{} undefined", card.label));
            match card.kind {
                IndicatorKind::Rsi => assert!((0.0..=100.0).contains(&v)),
                _ => assert!(price_range.contains(&v), "{} = {v}", card.label),
            }
            assert_eq!(card.display, format!("{v:.2}"));
        }

        let rsi_card = &dash.summary[0];
        assert_eq!(rsi_card.kind, IndicatorKind::Rsi);
        assert!(rsi_card.note.is_some());
        let st_card = &dash.summary[3];
        assert!(matches!(st_card.note.as_deref(), Some("Uptrend") | Some("Downtrend")));
    }

    #[test]
    fn all_toggles_off_gives_bare_chart_and_no_summary() {
        let dash = build(&request(IndicatorRequest::default()), &thirty_days()).unwrap();
        assert_eq!(dash.chart.panels.len(), 1);
        assert_eq!(dash.chart.panels[0].kind, PanelKind::Price);
        assert_eq!(dash.chart.panels[0].traces.len(), 1);
        assert!(dash.summary.is_empty());
    }

    #[test]
    fn empty_series_signals_empty_result() {
        let err = build(&request(all_indicators()), &PriceSeries::empty()).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResult { ref symbol } if symbol == "SYNTH"));
        assert_eq!(err.to_string(), NO_DATA_MESSAGE);
    }

    #[test]
    fn warmup_longer_than_series_shows_na() {
        let indicators = IndicatorRequest {
            ema_long: Some(EmaParams { period: 50 }),
            ..Default::default()
        };
        let dash = build(&request(indicators), &thirty_days()).unwrap();
        assert_eq!(dash.summary.len(), 1);
        assert_eq!(dash.summary[0].value, None);
        assert_eq!(dash.summary[0].display, "N/A");
    }

    #[test]
    fn format_two_decimals() {
        assert_eq!(format_value(Some(12.3456)), "12.35");
        assert_eq!(format_value(Some(70.0)), "70.00");
        assert_eq!(format_value(None), "N/A");
    }

    // ---- validate --------------------------------------------------------

    #[test]
    fn rejects_reversed_dates_and_blank_symbol() {
        let mut req = request(IndicatorRequest::default());
        req.start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(req.validate(), Err(DashboardError::InvalidRequest(_))));

        let mut req = request(IndicatorRequest::default());
        req.symbol = "   ".into();
        assert!(matches!(req.validate(), Err(DashboardError::InvalidRequest(_))));
    }

    #[test]
    fn same_start_and_end_is_valid() {
        let mut req = request(IndicatorRequest::default());
        req.end = req.start;
        assert!(req.validate().is_ok());
    }

    // ---- run -------------------------------------------------------------

    #[tokio::test]
    async fn run_fetches_exactly_once() {
        let source = StubSource::new(thirty_days());
        let dash = run(&source, &request(all_indicators())).await.unwrap();
        assert_eq!(dash.bars, 30);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_source() {
        let source = StubSource::new(thirty_days());
        let mut req = request(all_indicators());
        req.indicators.rsi = Some(RsiParams { period: 0 });
        assert!(matches!(
            run(&source, &req).await,
            Err(DashboardError::InvalidRequest(_))
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_download_is_empty_result() {
        let source = StubSource::new(PriceSeries::empty());
        assert!(matches!(
            run(&source, &request(all_indicators())).await,
            Err(DashboardError::EmptyResult { .. })
        ));
    }

    #[tokio::test]
    async fn source_failure_is_upstream_error() {
        let err = run(&FailingSource, &request(all_indicators())).await.unwrap_err();
        assert!(matches!(err, DashboardError::Upstream(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
