//! Indicator engine: runs every indicator the strategy needs over the close
//! series and assembles one [`IndicatorRow`] per price point.

use tracing::debug;

use super::{Bollinger, Drawdown, Indicator, IndicatorValues, Rsi};
use crate::domain::{IndicatorRow, PriceSeries};
use crate::error::SignalError;
use crate::signal::StrategyParams;

/// The six series behind an [`IndicatorRow`], built from strategy parameters.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi: Rsi,
    pub bb_lower: Bollinger,
    pub bb_mid: Bollinger,
    pub bb_upper: Bollinger,
    pub all_time_high: Drawdown,
    pub drawdown_pct: Drawdown,
}

impl IndicatorSet {
    pub fn from_params(params: &StrategyParams) -> Self {
        Self {
            rsi: Rsi::new(params.rsi_period),
            bb_lower: Bollinger::lower(params.bb_period, params.bb_k),
            bb_mid: Bollinger::middle(params.bb_period, params.bb_k),
            bb_upper: Bollinger::upper(params.bb_period, params.bb_k),
            all_time_high: Drawdown::peak(),
            drawdown_pct: Drawdown::percent(),
        }
    }

    pub fn all(&self) -> [&dyn Indicator; 6] {
        [
            &self.rsi,
            &self.bb_lower,
            &self.bb_mid,
            &self.bb_upper,
            &self.all_time_high,
            &self.drawdown_pct,
        ]
    }
}

/// Compute the indicator rows for a normalized series.
pub fn compute(
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<Vec<IndicatorRow>, SignalError> {
    params.validate()?;
    let set = IndicatorSet::from_params(params);
    let closes = series.closes();
    let values = precompute(&set.all(), &closes)?;

    debug!(
        points = closes.len(),
        rsi_warmup = set.rsi.lookback(),
        bollinger_warmup = set.bb_lower.lookback(),
        "indicators computed"
    );

    assemble(series, &set, &values)
}

/// Run each indicator once over `closes` and collect the named outputs.
pub fn precompute(
    indicators: &[&dyn Indicator],
    closes: &[f64],
) -> Result<IndicatorValues, SignalError> {
    let mut values = IndicatorValues::new();
    for indicator in indicators {
        if let Some(i) = closes.iter().position(|c| !c.is_finite()) {
            return Err(SignalError::IndicatorComputation {
                indicator: indicator.name().to_string(),
                reason: format!("non-finite close at index {i}"),
            });
        }

        let output = indicator.compute(closes);
        if output.len() != closes.len() {
            return Err(SignalError::IndicatorComputation {
                indicator: indicator.name().to_string(),
                reason: format!(
                    "produced {} values for {} closes",
                    output.len(),
                    closes.len()
                ),
            });
        }
        values.insert(indicator.name(), output);
    }
    Ok(values)
}

pub(crate) fn assemble(
    series: &PriceSeries,
    set: &IndicatorSet,
    values: &IndicatorValues,
) -> Result<Vec<IndicatorRow>, SignalError> {
    let missing: Vec<String> = set
        .all()
        .iter()
        .map(|ind| ind.name())
        .filter(|name| !values.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(SignalError::MissingIndicatorColumns { missing });
    }

    let value = |name: &str, i: usize| values.get(name, i).filter(|v| v.is_finite());

    let rows = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| IndicatorRow {
            date: point.date,
            close: point.close,
            rsi14: value(set.rsi.name(), i),
            bb_lower: value(set.bb_lower.name(), i),
            bb_mid: value(set.bb_mid.name(), i),
            bb_upper: value(set.bb_upper.name(), i),
            all_time_high: value(set.all_time_high.name(), i).unwrap_or(point.close),
            drawdown_pct: value(set.drawdown_pct.name(), i),
        })
        .collect();

    Ok(rows)
}
