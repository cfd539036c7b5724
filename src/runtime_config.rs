// =============================================================================
// Runtime Configuration — service settings and dashboard defaults
// =============================================================================
//
// Loaded once at startup from a JSON file. All fields carry
// `#[serde(default)]` so that a partial (or empty) file still deserialises,
// and a missing file falls back to `RuntimeConfig::default()` in `main`.
//
// Environment variables override the file for deployment-specific values.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Interval;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    1
}

fn default_symbol() -> String {
    "RELIANCE.NS".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

fn default_rsi_period() -> usize {
    14
}

fn default_ema_short_period() -> usize {
    10
}

fn default_ema_long_period() -> usize {
    20
}

fn default_atr_period() -> usize {
    10
}

fn default_supertrend_multiplier() -> f64 {
    3.0
}

// =============================================================================
// IndicatorDefaults
// =============================================================================

/// Parameters used when a request enables an indicator without giving its
/// parameters explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefaults {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_ema_short_period")]
    pub ema_short_period: usize,

    #[serde(default = "default_ema_long_period")]
    pub ema_long_period: usize,

    /// ATR look-back for Supertrend.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// ATR multiplier for the Supertrend bands.
    #[serde(default = "default_supertrend_multiplier")]
    pub supertrend_multiplier: f64,
}

impl Default for IndicatorDefaults {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            ema_short_period: default_ema_short_period(),
            ema_long_period: default_ema_long_period(),
            atr_period: default_atr_period(),
            supertrend_multiplier: default_supertrend_multiplier(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Service -------------------------------------------------------------

    /// Address the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the Yahoo Finance chart API.
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    /// Timeout for the single history download per request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Chart requests processed concurrently; 1 runs them strictly one at a
    /// time.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    // --- Dashboard defaults --------------------------------------------------

    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default = "default_start_date")]
    pub default_start: NaiveDate,

    #[serde(default)]
    pub default_interval: Interval,

    #[serde(default)]
    pub indicators: IndicatorDefaults,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            yahoo_base_url: default_yahoo_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_in_flight: default_max_in_flight(),
            default_symbol: default_symbol(),
            default_start: default_start_date(),
            default_interval: Interval::default(),
            indicators: IndicatorDefaults::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            default_symbol = %config.default_symbol,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `DASHBOARD_BIND_ADDR` and `YAHOO_BASE_URL` if set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("DASHBOARD_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("YAHOO_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.yahoo_base_url = url.trim().to_string();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
