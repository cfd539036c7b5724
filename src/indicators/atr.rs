// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// The first bar has no previous close and therefore no TR; the first ATR value
// lands on bar `period`.
// =============================================================================

use crate::market_data::PriceBar;

/// True Range of `bar` against the previous close.
///
/// `f64::max` swallows NaN, so non-finite inputs are caught up front.
fn bar_true_range(prev_close: f64, bar: &PriceBar) -> f64 {
    let (high, low) = (bar.high, bar.low);
    if !(high.is_finite() && low.is_finite() && prev_close.is_finite()) {
        return f64::NAN;
    }

    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();

    hl.max(hc).max(lc)
}

/// Compute ATR over `bars`, aligned with `bars`.
///
/// # Returns
/// A vector the same length as `bars`. Elements before index `period` are
/// `None`. Every element is `None` when:
/// - `period` is zero.
/// - There are no more bars than `period`.
/// - The seed is non-finite.
///
/// A non-finite value later in the series ends it; the rest stays `None`.
pub fn calculate_atr(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if period == 0 || bars.len() <= period {
        return result;
    }

    // --- Step 1: True Range (bar 0 has none) ---------------------------------
    let tr: Vec<f64> = bars
        .windows(2)
        .map(|pair| bar_true_range(pair[0].close, &pair[1]))
        .collect();

    // --- Step 2: Seed ATR with SMA of first `period` TR values ---------------
    let seed: f64 = tr[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return result;
    }
    result[period] = Some(seed);

    // --- Step 3: Wilder's smoothing for remaining TR values ------------------
    // tr[j] belongs to bar j + 1.
    let period_f = period as f64;
    let mut atr = seed;
    for (j, &value) in tr.iter().enumerate().skip(period) {
        atr = (atr * (period_f - 1.0) + value) / period_f;
        if !atr.is_finite() {
            break;
        }
        result[j + 1] = Some(atr);
    }

    result
}
