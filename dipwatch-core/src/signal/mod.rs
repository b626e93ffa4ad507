//! Buy-signal evaluation.

pub mod evaluator;
pub mod params;

pub use evaluator::{evaluate, evaluate_row};
pub use params::StrategyParams;
