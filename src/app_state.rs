// =============================================================================
// Application State — shared, read-only handles for the HTTP layer
// =============================================================================
//
// Holds configuration and the price source. There is no mutable state:
// every chart request recomputes from a fresh download.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::indicators::{EmaParams, IndicatorRequest, RsiParams, SupertrendParams};
use crate::market_data::PriceSource;
use crate::runtime_config::RuntimeConfig;

pub struct AppState {
    pub config: RuntimeConfig,
    pub source: Arc<dyn PriceSource>,
}

impl AppState {
    pub fn new(config: RuntimeConfig, source: Arc<dyn PriceSource>) -> Self {
        Self { config, source }
    }

    pub fn default_start(&self) -> NaiveDate {
        self.config.default_start
    }

    /// Build an [`IndicatorRequest`] from toggles, filling missing parameters
    /// from the configured defaults.
    pub fn indicator_request(&self, toggles: IndicatorToggles) -> IndicatorRequest {
        let d = &self.config.indicators;
        IndicatorRequest {
            rsi: toggles.rsi.then(|| RsiParams {
                period: toggles.rsi_period.unwrap_or(d.rsi_period),
            }),
            ema_short: toggles.ema_short.then(|| EmaParams {
                period: toggles.ema_short_period.unwrap_or(d.ema_short_period),
            }),
            ema_long: toggles.ema_long.then(|| EmaParams {
                period: toggles.ema_long_period.unwrap_or(d.ema_long_period),
            }),
            supertrend: toggles.supertrend.then(|| SupertrendParams {
                atr_period: toggles.atr_period.unwrap_or(d.atr_period),
                multiplier: toggles.multiplier.unwrap_or(d.supertrend_multiplier),
            }),
        }
    }
}

/// Raw on/off switches and optional parameter overrides as the shell sends them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorToggles {
    pub rsi: bool,
    pub rsi_period: Option<usize>,
    pub ema_short: bool,
    pub ema_short_period: Option<usize>,
    pub ema_long: bool,
    pub ema_long_period: Option<usize>,
    pub supertrend: bool,
    pub atr_period: Option<usize>,
    pub multiplier: Option<f64>,
}
