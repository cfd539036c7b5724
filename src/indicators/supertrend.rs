// =============================================================================
// Supertrend — ATR-banded trailing stop
// =============================================================================
//
// Basic bands around the bar midpoint:
//   basic_upper = (H + L) / 2 + multiplier * ATR
//   basic_lower = (H + L) / 2 - multiplier * ATR
//
// Final bands only trail towards price:
//   upper_t = basic_upper_t  if basic_upper_t < upper_{t-1} or close_{t-1} > upper_{t-1}
//             upper_{t-1}    otherwise
//   lower_t = basic_lower_t  if basic_lower_t > lower_{t-1} or close_{t-1} < lower_{t-1}
//             lower_{t-1}    otherwise
//
// Direction:
//   Up   -> Down when close_t < lower_t
//   Down -> Up   when close_t > upper_t
// The first defined bar starts Up unless it already closes below the lower band.
//
// The plotted line is the lower band while Up and the upper band while Down.
// =============================================================================

use super::atr::calculate_atr;
use crate::market_data::PriceBar;
use crate::types::Direction;

/// One defined Supertrend sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendPoint {
    pub line: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bands {
    upper: f64,
    lower: f64,
}

/// Compute Supertrend over `bars`, aligned with `bars`.
///
/// Elements are `None` until ATR is defined (the first `atr_period` bars), and
/// everywhere when the multiplier is not a positive finite number.
pub fn calculate_supertrend(
    bars: &[PriceBar],
    atr_period: usize,
    multiplier: f64,
) -> Vec<Option<SupertrendPoint>> {
    let mut result = vec![None; bars.len()];
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return result;
    }

    let atr = calculate_atr(bars, atr_period);
    let bands = final_bands(bars, &atr, multiplier);

    let mut prev_direction: Option<Direction> = None;
    for (i, band) in bands.iter().enumerate() {
        let Some(b) = band else {
            prev_direction = None;
            continue;
        };
        let close = bars[i].close;

        let direction = match prev_direction {
            Some(Direction::Down) if close > b.upper => Direction::Up,
            Some(Direction::Down) => Direction::Down,
            _ if close < b.lower => Direction::Down,
            _ => Direction::Up,
        };
        let line = match direction {
            Direction::Up => b.lower,
            Direction::Down => b.upper,
        };

        result[i] = Some(SupertrendPoint { line, direction });
        prev_direction = Some(direction);
    }

    result
}

fn final_bands(bars: &[PriceBar], atr: &[Option<f64>], multiplier: f64) -> Vec<Option<Bands>> {
    let mut out = vec![None; bars.len()];
    let mut prev: Option<Bands> = None;

    for (i, atr_value) in atr.iter().enumerate() {
        let Some(a) = atr_value else {
            prev = None;
            continue;
        };
        let hl2 = bars[i].hl2();
        let basic_upper = hl2 + multiplier * a;
        let basic_lower = hl2 - multiplier * a;

        let bands = match prev {
            Some(p) => {
                // `prev` is only set when bar i - 1 was defined.
                let prev_close = bars[i - 1].close;
                Bands {
                    upper: if basic_upper < p.upper || prev_close > p.upper {
                        basic_upper
                    } else {
                        p.upper
                    },
                    lower: if basic_lower > p.lower || prev_close < p.lower {
                        basic_lower
                    } else {
                        p.lower
                    },
                }
            }
            None => Bands {
                upper: basic_upper,
                lower: basic_lower,
            },
        };

        out[i] = Some(bands);
        prev = Some(bands);
    }

    out
}
