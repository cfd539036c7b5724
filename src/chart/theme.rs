// =============================================================================
// Chart Theme — colours for candles, overlays and the oscillator panel
// =============================================================================

use serde::Serialize;

use crate::types::IndicatorKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Theme {
    pub name: &'static str,
    pub background: &'static str,
    pub grid: &'static str,
    pub text: &'static str,
    pub candle_up: &'static str,
    pub candle_down: &'static str,
    pub guide: &'static str,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            background: "#111111",
            grid: "#283040",
            text: "#f2f5fa",
            candle_up: "#26a69a",
            candle_down: "#ef5350",
            guide: "#7f7f7f",
        }
    }

    /// Fixed line colour per indicator so overlays stay distinguishable no
    /// matter how many are enabled.
    pub fn indicator_color(&self, kind: IndicatorKind) -> &'static str {
        match kind {
            IndicatorKind::Rsi => "#ab63fa",
            IndicatorKind::EmaShort => "#ffa15a",
            IndicatorKind::EmaLong => "#19d3f3",
            IndicatorKind::Supertrend => "#fecb52",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
