//! Drawdown from the running all-time high.
//!
//! Two outputs (separate Indicator instances):
//! - Peak: running maximum of close, never resets
//! - Percent: (close - peak) / peak * 100, always <= 0
//!
//! No warm-up. A peak of zero yields NaN for the percent output.

use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawdownOutput {
    Peak,
    Percent,
}

#[derive(Debug, Clone)]
pub struct Drawdown {
    output: DrawdownOutput,
}

impl Drawdown {
    pub fn peak() -> Self {
        Self {
            output: DrawdownOutput::Peak,
        }
    }

    pub fn percent() -> Self {
        Self {
            output: DrawdownOutput::Percent,
        }
    }
}

impl Indicator for Drawdown {
    fn name(&self) -> &str {
        match self.output {
            DrawdownOutput::Peak => "all_time_high",
            DrawdownOutput::Percent => "drawdown_pct",
        }
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let mut peak = f64::NEG_INFINITY;
        closes
            .iter()
            .map(|&close| {
                peak = peak.max(close);
                match self.output {
                    DrawdownOutput::Peak => peak,
                    DrawdownOutput::Percent => {
                        let pct = (close - peak) / peak * 100.0;
                        if pct.is_finite() {
                            pct
                        } else {
                            f64::NAN
                        }
                    }
                }
            })
            .collect()
    }
}
