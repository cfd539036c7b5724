// =============================================================================
// Indicator Engine
// =============================================================================
//
// Pure, side-effect-free computation of the indicators a dashboard request
// asks for. Every output series is aligned one-to-one with the source price
// series; warm-up samples carry `value: None` instead of a NaN sentinel.
//
// Indicators degrade independently: an indicator that cannot be computed
// (too few bars, bad parameters) yields an all-undefined series and the rest
// of the request is unaffected.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod supertrend;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::market_data::PriceSeries;
use crate::types::{Direction, IndicatorKind};

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsiParams {
    pub period: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaParams {
    pub period: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendParams {
    pub atr_period: usize,
    pub multiplier: f64,
}

/// The set of enabled indicators and their parameters. Disabled indicators
/// are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    #[serde(default)]
    pub rsi: Option<RsiParams>,
    #[serde(default)]
    pub ema_short: Option<EmaParams>,
    #[serde(default)]
    pub ema_long: Option<EmaParams>,
    #[serde(default)]
    pub supertrend: Option<SupertrendParams>,
}

impl IndicatorRequest {
    pub fn is_enabled(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Rsi => self.rsi.is_some(),
            IndicatorKind::EmaShort => self.ema_short.is_some(),
            IndicatorKind::EmaLong => self.ema_long.is_some(),
            IndicatorKind::Supertrend => self.supertrend.is_some(),
        }
    }

    /// Enabled indicators in display order.
    pub fn enabled(&self) -> Vec<IndicatorKind> {
        IndicatorKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }

    /// Display label including parameters, e.g. `"EMA (20)"`.
    pub fn label(&self, kind: IndicatorKind) -> Option<String> {
        match kind {
            IndicatorKind::Rsi => self.rsi.map(|p| format!("RSI ({})", p.period)),
            IndicatorKind::EmaShort => self.ema_short.map(|p| format!("EMA ({})", p.period)),
            IndicatorKind::EmaLong => self.ema_long.map(|p| format!("EMA ({})", p.period)),
            IndicatorKind::Supertrend => self
                .supertrend
                .map(|p| format!("Supertrend ({}, {})", p.atr_period, p.multiplier)),
        }
    }

    /// Minimum number of bars before the indicator produces its first value.
    /// Saturates, so an oversized look-back can never be satisfied.
    pub fn required_bars(&self, kind: IndicatorKind) -> Option<usize> {
        match kind {
            IndicatorKind::Rsi => self.rsi.map(|p| p.period.saturating_add(1)),
            IndicatorKind::EmaShort => self.ema_short.map(|p| p.period),
            IndicatorKind::EmaLong => self.ema_long.map(|p| p.period),
            IndicatorKind::Supertrend => self
                .supertrend
                .map(|p| p.atr_period.saturating_add(1)),
        }
    }

    /// Reject zero periods and non-positive multipliers.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        if let Some(p) = self.rsi {
            non_zero(IndicatorKind::Rsi, p.period)?;
        }
        if let Some(p) = self.ema_short {
            non_zero(IndicatorKind::EmaShort, p.period)?;
        }
        if let Some(p) = self.ema_long {
            non_zero(IndicatorKind::EmaLong, p.period)?;
        }
        if let Some(p) = self.supertrend {
            non_zero(IndicatorKind::Supertrend, p.atr_period)?;
            positive_multiplier(p.multiplier)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator} needs at least {required} bars, only {available} available")]
    InsufficientData {
        indicator: IndicatorKind,
        required: usize,
        available: usize,
    },
    #[error("{indicator}: {reason}")]
    InvalidParameter {
        indicator: IndicatorKind,
        reason: String,
    },
    #[error("{0} was not requested")]
    NotRequested(IndicatorKind),
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub time: DateTime<Utc>,
    pub value: Option<f64>,
    /// Only populated for Supertrend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// One indicator's values, aligned by timestamp with the source series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub label: String,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    fn from_values(
        kind: IndicatorKind,
        label: String,
        series: &PriceSeries,
        values: Vec<Option<f64>>,
    ) -> Self {
        let points = series
            .bars()
            .iter()
            .zip(values)
            .map(|(bar, value)| IndicatorPoint {
                time: bar.time,
                value,
                direction: None,
            })
            .collect();
        Self { kind, label, points }
    }

    fn undefined(kind: IndicatorKind, label: String, series: &PriceSeries) -> Self {
        Self::from_values(kind, label, series, vec![None; series.len()])
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// Value at the final timestamp; `None` if that sample is undefined.
    pub fn latest(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.value)
    }

    pub fn latest_direction(&self) -> Option<Direction> {
        self.points.last().and_then(|p| p.direction)
    }
}

/// Computed indicators keyed by kind, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: BTreeMap<IndicatorKind, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn get(&self, kind: IndicatorKind) -> Option<&IndicatorSeries> {
        self.series.get(&kind)
    }

    pub fn contains(&self, kind: IndicatorKind) -> bool {
        self.series.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorSeries> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn latest(&self, kind: IndicatorKind) -> Option<f64> {
        self.get(kind).and_then(IndicatorSeries::latest)
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Compute every indicator enabled in `request` over `series`.
///
/// Indicators that fail are logged and represented by an all-undefined series.
pub fn compute(series: &PriceSeries, request: &IndicatorRequest) -> IndicatorSet {
    let mut set = IndicatorSet::default();

    for kind in request.enabled() {
        let computed = match compute_one(kind, series, request) {
            Ok(s) => s,
            Err(e) => {
                warn!(indicator = %kind, error = %e, "indicator left undefined");
                let label = request.label(kind).unwrap_or_else(|| kind.to_string());
                IndicatorSeries::undefined(kind, label, series)
            }
        };
        debug!(
            indicator = %kind,
            defined = computed.defined_count(),
            total = computed.points.len(),
            "indicator computed"
        );
        set.series.insert(kind, computed);
    }

    set
}

/// Compute a single indicator, surfacing why it could not be produced.
pub fn compute_one(
    kind: IndicatorKind,
    series: &PriceSeries,
    request: &IndicatorRequest,
) -> Result<IndicatorSeries, IndicatorError> {
    let label = request.label(kind).ok_or(IndicatorError::NotRequested(kind))?;
    let required = request
        .required_bars(kind)
        .ok_or(IndicatorError::NotRequested(kind))?;

    if series.len() < required {
        return Err(IndicatorError::InsufficientData {
            indicator: kind,
            required,
            available: series.len(),
        });
    }

    match kind {
        IndicatorKind::Rsi => {
            let p = request.rsi.ok_or(IndicatorError::NotRequested(kind))?;
            non_zero(kind, p.period)?;
            let values = rsi::calculate_rsi(&series.closes(), p.period);
            Ok(IndicatorSeries::from_values(kind, label, series, values))
        }
        IndicatorKind::EmaShort | IndicatorKind::EmaLong => {
            let params = if kind == IndicatorKind::EmaShort {
                request.ema_short
            } else {
                request.ema_long
            };
            let p = params.ok_or(IndicatorError::NotRequested(kind))?;
            non_zero(kind, p.period)?;
            let values = ema::calculate_ema(&series.closes(), p.period);
            Ok(IndicatorSeries::from_values(kind, label, series, values))
        }
        IndicatorKind::Supertrend => {
            let p = request.supertrend.ok_or(IndicatorError::NotRequested(kind))?;
            non_zero(kind, p.atr_period)?;
            positive_multiplier(p.multiplier)?;

            let st = supertrend::calculate_supertrend(series.bars(), p.atr_period, p.multiplier);
            let points = series
                .bars()
                .iter()
                .zip(st)
                .map(|(bar, sample)| IndicatorPoint {
                    time: bar.time,
                    value: sample.map(|s| s.line),
                    direction: sample.map(|s| s.direction),
                })
                .collect();
            Ok(IndicatorSeries { kind, label, points })
        }
    }
}

fn non_zero(indicator: IndicatorKind, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter {
            indicator,
            reason: "period must be a positive integer".to_string(),
        });
    }
    Ok(())
}

fn positive_multiplier(multiplier: f64) -> Result<(), IndicatorError> {
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(IndicatorError::InvalidParameter {
            indicator: IndicatorKind::Supertrend,
            reason: format!("multiplier must be a positive number, got {multiplier}"),
        });
    }
    Ok(())
}
