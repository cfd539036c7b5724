// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The chart endpoint is the explicit
// trigger: each call downloads once, computes the enabled indicators and
// returns a ready-to-render chart description.
//
// CORS is configured permissively so a browser shell on another origin can
// call the API.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::app_state::{AppState, IndicatorToggles};
use crate::dashboard::{self, Dashboard, DashboardError, DashboardRequest, NO_DATA_MESSAGE};
use crate::types::Interval;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_in_flight = state.config.max_in_flight.max(1);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/intervals", get(intervals))
        // ── Chart: at most `max_in_flight` requests processed at once ───
        .route(
            "/api/v1/chart",
            get(chart).layer(ConcurrencyLimitLayer::new(max_in_flight)),
        )
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Intervals
// =============================================================================

#[derive(Serialize)]
struct IntervalsResponse {
    intervals: Vec<&'static str>,
    default: Interval,
}

async fn intervals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(IntervalsResponse {
        intervals: Interval::ALL.iter().map(|i| i.as_str()).collect(),
        default: state.config.default_interval,
    })
}

// =============================================================================
// Chart
// =============================================================================

/// Query string of `GET /api/v1/chart`. Anything omitted falls back to the
/// runtime config; indicators are off unless switched on.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub symbol: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,

    #[serde(default)]
    pub rsi: bool,
    pub rsi_period: Option<usize>,
    #[serde(default)]
    pub ema_short: bool,
    pub ema_short_period: Option<usize>,
    #[serde(default)]
    pub ema_long: bool,
    pub ema_long_period: Option<usize>,
    #[serde(default)]
    pub supertrend: bool,
    pub atr_period: Option<usize>,
    pub multiplier: Option<f64>,
}

impl ChartQuery {
    /// Resolve defaults. `today` is the end date when none is given.
    pub fn into_request(self, state: &AppState, today: NaiveDate) -> DashboardRequest {
        let config = &state.config;

        let symbol = self
            .symbol
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.default_symbol.clone());

        let indicators = state.indicator_request(IndicatorToggles {
            rsi: self.rsi,
            rsi_period: self.rsi_period,
            ema_short: self.ema_short,
            ema_short_period: self.ema_short_period,
            ema_long: self.ema_long,
            ema_long_period: self.ema_long_period,
            supertrend: self.supertrend,
            atr_period: self.atr_period,
            multiplier: self.multiplier,
        });

        DashboardRequest {
            symbol,
            start: self.start.unwrap_or_else(|| state.default_start()),
            end: self.end.unwrap_or(today),
            interval: self.interval.unwrap_or(config.default_interval),
            indicators,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ChartResponse {
    Chart(Dashboard),
    NoData { symbol: String, message: &'static str },
}

async fn chart(State(state): State<Arc<AppState>>, Query(query): Query<ChartQuery>) -> Response {
    let request = query.into_request(&state, Utc::now().date_naive());

    info!(
        symbol = %request.symbol,
        interval = %request.interval,
        start = %request.start,
        end = %request.end,
        indicators = request.indicators.enabled().len(),
        "chart requested"
    );

    match dashboard::run(state.source.as_ref(), &request).await {
        Ok(dash) => Json(ChartResponse::Chart(dash)).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            // Not a failure: the shell shows the notice instead of a chart.
            DashboardError::EmptyResult { symbol } => Json(ChartResponse::NoData {
                symbol,
                message: NO_DATA_MESSAGE,
            })
            .into_response(),
            DashboardError::InvalidRequest(reason) => {
                warn!(%reason, "chart request rejected");
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": reason })),
                )
                    .into_response()
            }
            DashboardError::Upstream(e) => {
                error!(error = %format!("{e:#}"), "price source failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({ "error": format!("price source failed: {e}") })),
                )
                    .into_response()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{HistoryQuery, PriceBar, PriceSeries, PriceSource};
    use crate::runtime_config::RuntimeConfig;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Serves a fixed series and remembers the last query it saw.
    struct StubSource {
        series: PriceSeries,
        last_query: Mutex<Option<HistoryQuery>>,
    }

    #[async_trait]
    impl PriceSource for StubSource {
        async fn fetch_history(&self, query: &HistoryQuery) -> anyhow::Result<PriceSeries> {
            *self.last_query.lock().unwrap() = Some(query.clone());
            Ok(self.series.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl PriceSource for DownSource {
        async fn fetch_history(&self, _query: &HistoryQuery) -> anyhow::Result<PriceSeries> {
            anyhow::bail!("connection refused")
        }
    }

    fn daily_series(n: i64) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.2;
                PriceBar::new(start + Duration::days(i), close - 0.5, close + 2.0, close - 2.0, close)
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn stub(series: PriceSeries) -> Arc<StubSource> {
        Arc::new(StubSource {
            series,
            last_query: Mutex::new(None),
        })
    }

    fn app_with(source: Arc<dyn PriceSource>) -> Router {
        router(Arc::new(AppState::new(RuntimeConfig::default(), source)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn state_with_defaults() -> AppState {
        AppState::new(RuntimeConfig::default(), stub(PriceSeries::empty()))
    }

    // ---- query resolution ----

    #[test]
    fn empty_query_uses_config_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let req = ChartQuery::default().into_request(&state_with_defaults(), today);
        assert_eq!(req.symbol, "RELIANCE.NS");
        assert_eq!(req.start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(req.end, today);
        assert_eq!(req.interval, Interval::OneDay);
        assert!(req.indicators.enabled().is_empty());
    }

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        let query = ChartQuery {
            symbol: Some("  aapl ".into()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(query.into_request(&state_with_defaults(), today).symbol, "AAPL");
    }

    #[test]
    fn blank_symbol_falls_back_to_default() {
        let query = ChartQuery {
            symbol: Some("   ".into()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            query.into_request(&state_with_defaults(), today).symbol,
            "RELIANCE.NS"
        );
    }

    // ---- endpoints ----

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app_with(stub(PriceSeries::empty())), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn intervals_lists_every_code() {
        let (status, body) =
            get_json(app_with(stub(PriceSeries::empty())), "/api/v1/intervals").await;
        assert_eq!(status, StatusCode::OK);
        let codes = body["intervals"].as_array().unwrap();
        assert_eq!(codes.len(), Interval::ALL.len());
        assert!(codes.iter().any(|c| c == "1wk"));
        assert_eq!(body["default"], "1d");
    }

    #[tokio::test]
    async fn chart_with_rsi_and_emas_has_two_panels() {
        let source = stub(daily_series(40));
        let app = app_with(source.clone());
        let (status, body) = get_json(
            app,
            "/api/v1/chart?symbol=synth&start=2024-01-01&end=2024-02-15&interval=1d&rsi=true&ema_short=true&ema_long=true",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "chart");
        assert_eq!(body["symbol"], "SYNTH");
        assert_eq!(body["bars"], 40);
        assert_eq!(body["chart"]["panels"].as_array().unwrap().len(), 2);
        assert_eq!(body["summary"].as_array().unwrap().len(), 3);

        let seen = source.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(seen.symbol, "SYNTH");
        assert_eq!(seen.end, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
    }

    #[tokio::test]
    async fn chart_with_no_indicators_is_price_only() {
        let (status, body) = get_json(
            app_with(stub(daily_series(15))),
            "/api/v1/chart?symbol=SYNTH&start=2024-01-01&end=2024-01-20",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let panels = body["chart"]["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0]["traces"].as_array().unwrap().len(), 1);
        assert!(body["summary"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_download_reports_no_data() {
        let (status, body) = get_json(
            app_with(stub(PriceSeries::empty())),
            "/api/v1/chart?symbol=NOPE&start=2024-01-01&end=2024-01-10&rsi=true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
        assert_eq!(body["message"], NO_DATA_MESSAGE);
        assert_eq!(body["symbol"], "NOPE");
    }

    #[tokio::test]
    async fn reversed_dates_are_a_bad_request() {
        let (status, body) = get_json(
            app_with(stub(daily_series(10))),
            "/api/v1/chart?symbol=SYNTH&start=2024-03-01&end=2024-01-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("after end date"));
    }

    #[tokio::test]
    async fn zero_period_is_a_bad_request() {
        let (status, _) = get_json(
            app_with(stub(daily_series(10))),
            "/api/v1/chart?symbol=SYNTH&start=2024-01-01&end=2024-02-01&rsi=true&rsi_period=0",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn source_failure_is_bad_gateway() {
        let (status, body) = get_json(
            app_with(Arc::new(DownSource)),
            "/api/v1/chart?symbol=SYNTH&start=2024-01-01&end=2024-02-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }
}
