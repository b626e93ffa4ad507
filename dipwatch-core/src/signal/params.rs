//! Strategy thresholds and indicator windows.

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Fixed parameters of the oversold-dip strategy.
///
/// The defaults are the strategy. Overrides are accepted from the settings
/// file's `[strategy]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    pub rsi_period: usize,
    /// RSI must be strictly below this value.
    pub rsi_threshold: f64,
    pub bb_period: usize,
    /// Band width in population standard deviations.
    pub bb_k: f64,
    /// Drawdown from the all-time high must be strictly below this percentage.
    pub drawdown_threshold_pct: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_threshold: 30.0,
            bb_period: 20,
            bb_k: 2.0,
            drawdown_threshold_pct: -20.0,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.rsi_period < 1 {
            return Err(SignalError::InvalidStrategy(
                "rsi_period must be >= 1".into(),
            ));
        }
        if self.bb_period < 1 {
            return Err(SignalError::InvalidStrategy("bb_period must be >= 1".into()));
        }
        if !(self.bb_k.is_finite() && self.bb_k > 0.0) {
            return Err(SignalError::InvalidStrategy(format!(
                "bb_k must be a positive number, got {}",
                self.bb_k
            )));
        }
        if !(0.0..=100.0).contains(&self.rsi_threshold) {
            return Err(SignalError::InvalidStrategy(format!(
                "rsi_threshold must be within 0..=100, got {}",
                self.rsi_threshold
            )));
        }
        if !(self.drawdown_threshold_pct.is_finite() && self.drawdown_threshold_pct <= 0.0) {
            return Err(SignalError::InvalidStrategy(format!(
                "drawdown_threshold_pct must be <= 0, got {}",
                self.drawdown_threshold_pct
            )));
        }
        Ok(())
    }

    /// Index of the first row that can possibly carry a buy signal.
    pub fn warmup(&self) -> usize {
        self.rsi_period.max(self.bb_period.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_strategy() {
        let p = StrategyParams::default();
        assert_eq!(p.rsi_period, 14);
        assert_eq!(p.bb_period, 20);
        assert_eq!(p.bb_k, 2.0);
        assert_eq!(p.rsi_threshold, 30.0);
        assert_eq!(p.drawdown_threshold_pct, -20.0);
        assert!(p.validate().is_ok());
        assert_eq!(p.warmup(), 19);
    }

    #[test]
    fn rejects_zero_period() {
        let p = StrategyParams {
            bb_period: 0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_positive_drawdown_threshold() {
        let p = StrategyParams {
            drawdown_threshold_pct: 5.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let p: StrategyParams = serde_json::from_str(r#"{"rsi_threshold": 25.0}"#).unwrap();
        assert_eq!(p.rsi_threshold, 25.0);
        assert_eq!(p.bb_period, 20);
    }
}
