//! Signal evaluator: the three-way conjunction over indicator rows.
//!
//! buy = rsi < rsi_threshold AND close < bb_lower AND drawdown < drawdown_threshold
//!
//! A missing operand makes its comparison false, so warm-up rows never fire.

use tracing::debug;

use super::StrategyParams;
use crate::domain::{IndicatorRow, SignalRow};

/// Strict `value < bound`, false when either side is missing.
fn strictly_below(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (Some(v), Some(b)) => v < b,
        _ => false,
    }
}

pub fn evaluate_row(row: &IndicatorRow, params: &StrategyParams) -> bool {
    let oversold = strictly_below(row.rsi14, Some(params.rsi_threshold));
    let below_band = strictly_below(Some(row.close), row.bb_lower);
    let deep_drawdown = strictly_below(row.drawdown_pct, Some(params.drawdown_threshold_pct));
    oversold && below_band && deep_drawdown
}

/// Evaluate every row; same cardinality and order as the input.
pub fn evaluate(rows: Vec<IndicatorRow>, params: &StrategyParams) -> Vec<SignalRow> {
    let signals: Vec<SignalRow> = rows
        .into_iter()
        .map(|row| {
            let buy = evaluate_row(&row, params);
            SignalRow::from_indicators(row, buy)
        })
        .collect();

    debug!(
        rows = signals.len(),
        buy_signals = signals.iter().filter(|r| r.buy_signal).count(),
        "signals evaluated"
    );
    signals
}
