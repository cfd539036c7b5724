use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLC bar for one sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceBar {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Midpoint of the bar's range, `(high + low) / 2`.
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bar {index} at {time} is not after the previous bar at {previous}")]
    OutOfOrder {
        index: usize,
        time: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// PriceSeries -- ordered, gap-preserving bar sequence
// ---------------------------------------------------------------------------

/// Bars ordered by strictly increasing timestamp.
///
/// Gaps between bars (weekends, holidays, overnight sessions) are kept as-is;
/// nothing is interpolated. Bar times are UTC; `utc_offset` is the listing
/// exchange's offset, used when the times are shown to a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
    #[serde(skip)]
    utc_offset: Option<FixedOffset>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].time <= pair[0].time {
                return Err(SeriesError::OutOfOrder {
                    index: index + 1,
                    time: pair[1].time,
                    previous: pair[0].time,
                });
            }
        }
        Ok(Self {
            bars,
            utc_offset: None,
        })
    }

    /// Sort by time and keep the last bar seen for any repeated timestamp.
    ///
    /// Upstream feeds occasionally repeat the in-progress bar at the tail.
    pub fn from_unordered(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.time);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            bars: deduped,
            utc_offset: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    /// Exchange offset from UTC; UTC itself when the source gave none.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset.unwrap_or_else(|| Utc.fix())
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.time).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }
}
