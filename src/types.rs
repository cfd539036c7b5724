// =============================================================================
// Shared types used across the candle dashboard
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sampling interval accepted by the dashboard and forwarded verbatim to the
/// price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    /// Every supported interval, in the order the shell presents them.
    pub const ALL: [Interval; 7] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::SixtyMinutes,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
    ];

    /// Wire code understood by the price source (`"1d"`, `"60m"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::SixtyMinutes => "60m",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
        }
    }

    /// Whether bars of this interval fall inside a single trading day.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Self::OneMinute | Self::FiveMinutes | Self::FifteenMinutes | Self::SixtyMinutes
        )
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::OneDay
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unsupported interval '{s}'"))
    }
}

/// The four indicators the dashboard knows how to compute.
///
/// Ordering matters: it is the order overlays are drawn and summary cards are
/// listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    EmaShort,
    EmaLong,
    Supertrend,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [Self::Rsi, Self::EmaShort, Self::EmaLong, Self::Supertrend];

    /// Oscillators are drawn in their own panel; everything else overlays price.
    pub fn is_oscillator(&self) -> bool {
        matches!(self, Self::Rsi)
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsi => write!(f, "RSI"),
            Self::EmaShort => write!(f, "EMA Short"),
            Self::EmaLong => write!(f, "EMA Long"),
            Self::Supertrend => write!(f, "Supertrend"),
        }
    }
}

/// Supertrend direction flag. Serialises as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "Uptrend"),
            Self::Down => write!(f, "Downtrend"),
        }
    }
}

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}
