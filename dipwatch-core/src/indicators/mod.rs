//! Indicator trait, precomputed values container and concrete indicators.
//!
//! Indicators are pure functions: close history in, numeric series out,
//! one value per input point. Warm-up positions hold `f64::NAN`; the engine
//! turns NaN into `None` when it assembles [`IndicatorRow`]s.
//!
//! Multi-series indicators (Bollinger, drawdown) are exposed as separate
//! named instances per output, keeping the single-series trait unchanged.
//!
//! [`IndicatorRow`]: crate::domain::IndicatorRow

pub mod bollinger;
pub mod drawdown;
pub mod engine;
pub mod rsi;

pub use bollinger::{Bollinger, BollingerBand};
pub use drawdown::{Drawdown, DrawdownOutput};
pub use engine::compute;
pub use rsi::Rsi;

use std::collections::HashMap;

/// A single-series indicator over daily closes.
///
/// # Look-ahead guard
/// The value at index t may only depend on `closes[..=t]`.
pub trait Indicator: Send + Sync {
    /// Series name used as the key in [`IndicatorValues`] (e.g. "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading values that are warm-up NaN.
    fn lookback(&self) -> usize;

    /// Compute the full series. The output has the same length as `closes`.
    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}

/// Container for named indicator series, built once per run.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at a specific index; `None` when the series or index is absent.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
