pub mod price_series;
pub mod source;

// Re-export for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use price_series::{PriceBar, PriceSeries, SeriesError};
pub use source::{HistoryQuery, PriceSource};
