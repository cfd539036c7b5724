// =============================================================================
// Axes — categorical time axis and bounded value axes
// =============================================================================
//
// The x-axis is a sequence of observed timestamps rather than a continuous
// time scale, so weekends, holidays and overnight sessions take no space.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::types::Interval;

/// Upper bound on labelled ticks along the x-axis.
pub const MAX_TICK_LABELS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickLabel {
    /// Position in `CategoryAxis::categories`.
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAxis {
    pub title: String,
    pub categories: Vec<String>,
    pub ticks: Vec<TickLabel>,
}

impl CategoryAxis {
    /// Labels are rendered in `offset`, the listing exchange's local time.
    pub fn from_times(
        title: impl Into<String>,
        times: &[DateTime<Utc>],
        offset: FixedOffset,
        interval: Interval,
    ) -> Self {
        let categories: Vec<String> = times
            .iter()
            .map(|t| format_time(*t, offset, interval))
            .collect();
        let ticks = tick_indices(categories.len(), MAX_TICK_LABELS)
            .into_iter()
            .map(|index| TickLabel {
                index,
                label: categories[index].clone(),
            })
            .collect();
        Self {
            title: title.into(),
            categories,
            ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxis {
    pub title: String,
    /// Fixed `[min, max]`; `None` lets the renderer autoscale.
    pub range: Option<[f64; 2]>,
}

impl ValueAxis {
    pub fn auto(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            range: None,
        }
    }

    pub fn fixed(title: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            title: title.into(),
            range: Some([min, max]),
        }
    }
}

/// Category label for a bar timestamp, in exchange time. Intraday intervals
/// keep the clock time.
pub fn format_time(t: DateTime<Utc>, offset: FixedOffset, interval: Interval) -> String {
    let local = t.with_timezone(&offset);
    if interval.is_intraday() {
        local.format("%Y-%m-%d %H:%M").to_string()
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

/// Pick at most `max` evenly spaced indices out of `0..len`, always including
/// the first and the last.
pub fn tick_indices(len: usize, max: usize) -> Vec<usize> {
    if len == 0 || max == 0 {
        return Vec::new();
    }
    if len <= max {
        return (0..len).collect();
    }
    if max == 1 {
        return vec![0];
    }

    let span = (len - 1) as f64;
    let steps = (max - 1) as f64;
    let mut out: Vec<usize> = (0..max)
        .map(|i| ((i as f64) * span / steps).round() as usize)
        .collect();
    out.dedup();
    out
}
