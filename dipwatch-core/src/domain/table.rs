//! Indicator rows, signal rows and the signal table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of indicator output. `None` marks warm-up rows or non-finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub rsi14: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_upper: Option<f64>,
    pub all_time_high: f64,
    pub drawdown_pct: Option<f64>,
}

/// An indicator row plus the evaluated buy signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub rsi14: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_upper: Option<f64>,
    pub all_time_high: f64,
    pub drawdown_pct: Option<f64>,
    pub buy_signal: bool,
}

impl SignalRow {
    pub fn from_indicators(row: IndicatorRow, buy_signal: bool) -> Self {
        Self {
            date: row.date,
            close: row.close,
            rsi14: row.rsi14,
            bb_lower: row.bb_lower,
            bb_mid: row.bb_mid,
            bb_upper: row.bb_upper,
            all_time_high: row.all_time_high,
            drawdown_pct: row.drawdown_pct,
            buy_signal,
        }
    }
}

/// The complete, immutable result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    ticker: String,
    rows: Vec<SignalRow>,
}

impl SignalTable {
    pub fn new(ticker: impl Into<String>, rows: Vec<SignalRow>) -> Self {
        Self {
            ticker: ticker.into(),
            rows,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The as-of-today row.
    pub fn latest(&self) -> Option<&SignalRow> {
        self.rows.last()
    }

    pub fn buy_rows(&self) -> impl Iterator<Item = &SignalRow> {
        self.rows.iter().filter(|r| r.buy_signal)
    }

    pub fn buy_count(&self) -> usize {
        self.buy_rows().count()
    }

    /// BLAKE3 digest over every field of every row, in order.
    ///
    /// Two runs over identical input produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_bytes());
        for row in &self.rows {
            hasher.update(row.date.to_string().as_bytes());
            hasher.update(&row.close.to_le_bytes());
            for value in [row.rsi14, row.bb_lower, row.bb_mid, row.bb_upper] {
                hash_optional(&mut hasher, value);
            }
            hasher.update(&row.all_time_high.to_le_bytes());
            hash_optional(&mut hasher, row.drawdown_pct);
            hasher.update(&[row.buy_signal as u8]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_optional(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, close: f64, buy: bool) -> SignalRow {
        SignalRow {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close,
            rsi14: None,
            bb_lower: None,
            bb_mid: None,
            bb_upper: None,
            all_time_high: close,
            drawdown_pct: Some(0.0),
            buy_signal: buy,
        }
    }

    #[test]
    fn latest_is_last_row() {
        let table = SignalTable::new("VWRL.AS", vec![row(1, 10.0, false), row(2, 11.0, true)]);
        assert_eq!(table.latest().unwrap().close, 11.0);
        assert_eq!(table.buy_count(), 1);
    }

    #[test]
    fn empty_table_has_no_latest() {
        let table = SignalTable::new("VWRL.AS", vec![]);
        assert!(table.latest().is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn fingerprint_distinguishes_null_from_zero() {
        let mut a = row(1, 10.0, false);
        let mut b = a.clone();
        a.rsi14 = None;
        b.rsi14 = Some(0.0);
        let ta = SignalTable::new("X", vec![a]);
        let tb = SignalTable::new("X", vec![b]);
        assert_ne!(ta.fingerprint(), tb.fingerprint());
    }

    #[test]
    fn fingerprint_is_stable() {
        let table = SignalTable::new("X", vec![row(1, 10.0, false), row(2, 9.0, true)]);
        assert_eq!(table.fingerprint(), table.clone().fingerprint());
    }
}
