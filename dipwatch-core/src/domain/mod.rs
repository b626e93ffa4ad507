//! Domain types for the signal pipeline.

pub mod price;
pub mod table;

pub use price::{PricePoint, PriceSeries};
pub use table::{IndicatorRow, SignalRow, SignalTable};
