// =============================================================================
// Chart Assembler
// =============================================================================
//
// Turns a price series and its computed indicators into a renderer-agnostic
// chart description:
//
//   Panel 1 (price)      — candlesticks + EMA short / EMA long / Supertrend
//   Panel 2 (oscillator) — RSI on a fixed [0, 100] scale, only when requested
//
// Both panels share one categorical x-axis. No range slider is emitted.
// =============================================================================

pub mod axis;
pub mod theme;

use serde::Serialize;
use tracing::debug;

use crate::indicators::{IndicatorSeries, IndicatorSet};
use crate::market_data::PriceSeries;
use crate::types::{IndicatorKind, Interval};

pub use axis::{CategoryAxis, TickLabel, ValueAxis, MAX_TICK_LABELS};
pub use theme::Theme;

/// Height share of the price panel when an oscillator panel is present.
const PRICE_PANEL_SHARE: f64 = 0.7;

const RSI_GUIDES: [f64; 2] = [crate::indicators::rsi::OVERSOLD, crate::indicators::rsi::OVERBOUGHT];

// =============================================================================
// Chart description
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Price,
    Oscillator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    Candlestick {
        name: String,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        increasing_color: &'static str,
        decreasing_color: &'static str,
    },
    Line {
        name: String,
        indicator: IndicatorKind,
        color: &'static str,
        /// One entry per category; `null` where the indicator is undefined.
        values: Vec<Option<f64>>,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Self::Candlestick { name, .. } | Self::Line { name, .. } => name,
        }
    }

    pub fn indicator(&self) -> Option<IndicatorKind> {
        match self {
            Self::Line { indicator, .. } => Some(*indicator),
            Self::Candlestick { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub kind: PanelKind,
    /// Fraction of the total plot height.
    pub height: f64,
    pub y_axis: ValueAxis,
    pub traces: Vec<Trace>,
    /// Horizontal reference lines (e.g. RSI 30/70).
    pub guides: Vec<f64>,
    pub range_slider: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub theme: Theme,
    pub x_axis: CategoryAxis,
    pub panels: Vec<Panel>,
}

impl ChartSpec {
    pub fn panel(&self, kind: PanelKind) -> Option<&Panel> {
        self.panels.iter().find(|p| p.kind == kind)
    }

    pub fn has_oscillator_panel(&self) -> bool {
        self.panel(PanelKind::Oscillator).is_some()
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Build the chart for `symbol` from `series` and whatever is in `indicators`.
pub fn assemble(
    symbol: &str,
    series: &PriceSeries,
    indicators: &IndicatorSet,
    interval: Interval,
) -> ChartSpec {
    let theme = Theme::dark();

    let mut price_traces = vec![Trace::Candlestick {
        name: symbol.to_string(),
        open: series.opens(),
        high: series.highs(),
        low: series.lows(),
        close: series.closes(),
        increasing_color: theme.candle_up,
        decreasing_color: theme.candle_down,
    }];
    price_traces.extend(
        indicators
            .iter()
            .filter(|s| !s.kind.is_oscillator())
            .map(|s| line_trace(s, &theme)),
    );

    let oscillator = indicators.get(IndicatorKind::Rsi).map(|rsi| Panel {
        kind: PanelKind::Oscillator,
        height: 1.0 - PRICE_PANEL_SHARE,
        y_axis: ValueAxis::fixed("RSI", 0.0, 100.0),
        traces: vec![line_trace(rsi, &theme)],
        guides: RSI_GUIDES.to_vec(),
        range_slider: false,
    });

    let price = Panel {
        kind: PanelKind::Price,
        height: if oscillator.is_some() {
            PRICE_PANEL_SHARE
        } else {
            1.0
        },
        y_axis: ValueAxis::auto("Price"),
        traces: price_traces,
        guides: Vec::new(),
        range_slider: false,
    };

    let mut panels = vec![price];
    panels.extend(oscillator);

    debug!(
        symbol,
        bars = series.len(),
        panels = panels.len(),
        overlays = panels[0].traces.len() - 1,
        "chart assembled"
    );

    let x_axis = CategoryAxis::from_times("Date", &series.times(), series.utc_offset(), interval);

    ChartSpec {
        title: format!("Candlestick chart for {symbol}"),
        theme,
        x_axis,
        panels,
    }
}

fn line_trace(series: &IndicatorSeries, theme: &Theme) -> Trace {
    Trace::Line {
        name: series.label.clone(),
        indicator: series.kind,
        color: theme.indicator_color(series.kind),
        values: series.values(),
    }
}
