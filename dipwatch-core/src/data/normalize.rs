//! Series normalizer: raw supplier table → canonical [`PriceSeries`].
//!
//! Steps:
//! 1. Resolve column labels to canonical fields (see `columns`)
//! 2. Read dates (polars Date, Datetime, or ISO strings) and numeric fields as f64
//! 3. Drop rows with a null date or an unusable close
//! 4. Sort ascending by date; on duplicate dates the last row wins

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, warn};

use super::columns::{ColumnMap, Field};
use crate::domain::{PricePoint, PriceSeries};
use crate::error::SignalError;

/// Normalizer with an optional ticker hint for qualified column labels.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    ticker: Option<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_ticker(ticker: impl Into<String>) -> Self {
        Self {
            ticker: Some(ticker.into()),
        }
    }

    pub fn normalize(&self, raw: &DataFrame) -> Result<PriceSeries, SignalError> {
        let labels: Vec<String> = raw
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = raw.height();

        if rows == 0 {
            return Err(SignalError::unavailable("raw table is empty", &labels, rows));
        }

        let map = ColumnMap::resolve(&labels, self.ticker.as_deref());
        let close_col = map.get(Field::Close).ok_or_else(|| {
            SignalError::unavailable("no column resolves to 'close'", &labels, rows)
        })?;
        let date_col = map.get(Field::Date).ok_or_else(|| {
            SignalError::unavailable("no column resolves to 'date'", &labels, rows)
        })?;

        debug!(close = close_col, date = date_col, rows, "resolved raw columns");

        let dates = read_dates(raw, date_col, &labels)?;
        let close = read_f64(raw, Some(close_col), &labels)?;
        let open = read_f64(raw, map.get(Field::Open), &labels)?;
        let high = read_f64(raw, map.get(Field::High), &labels)?;
        let low = read_f64(raw, map.get(Field::Low), &labels)?;
        let volume = read_f64(raw, map.get(Field::Volume), &labels)?;

        let mut null_dates = 0usize;
        let mut points = Vec::with_capacity(rows);
        for i in 0..rows {
            let Some(date) = dates[i] else {
                null_dates += 1;
                continue;
            };
            points.push(PricePoint {
                date,
                open: open[i].unwrap_or(f64::NAN),
                high: high[i].unwrap_or(f64::NAN),
                low: low[i].unwrap_or(f64::NAN),
                close: close[i].unwrap_or(f64::NAN),
                volume: volume[i].unwrap_or(f64::NAN),
            });
        }
        if points.is_empty() {
            return Err(SignalError::unavailable("no row has a usable date", &labels, rows));
        }
        if null_dates > 0 {
            warn!(null_dates, "dropped rows without a usable date");
        }

        PriceSeries::canonicalize(points, &labels)
    }
}

/// Normalize without a ticker hint.
pub fn normalize(raw: &DataFrame) -> Result<PriceSeries, SignalError> {
    Normalizer::new().normalize(raw)
}

fn column<'a>(
    raw: &'a DataFrame,
    name: &str,
    labels: &[String],
) -> Result<&'a Column, SignalError> {
    raw.column(name).map_err(|e| {
        SignalError::unavailable(format!("column '{name}': {e}"), labels, raw.height())
    })
}

/// Read a numeric column as f64; an absent optional column reads as all-null.
fn read_f64(
    raw: &DataFrame,
    name: Option<&str>,
    labels: &[String],
) -> Result<Vec<Option<f64>>, SignalError> {
    let Some(name) = name else {
        return Ok(vec![None; raw.height()]);
    };
    let col = column(raw, name, labels)?;
    let casted = col.cast(&DataType::Float64).map_err(|e| {
        SignalError::unavailable(
            format!("column '{name}' is not numeric: {e}"),
            labels,
            raw.height(),
        )
    })?;
    let ca = casted.f64().map_err(|e| {
        SignalError::unavailable(format!("column '{name}': {e}"), labels, raw.height())
    })?;
    Ok(ca.into_iter().collect())
}

fn read_dates(
    raw: &DataFrame,
    name: &str,
    labels: &[String],
) -> Result<Vec<Option<NaiveDate>>, SignalError> {
    let col = column(raw, name, labels)?;
    let n = raw.height();

    if let DataType::String = col.dtype() {
        let ca = col.str().map_err(|e| {
            SignalError::unavailable(format!("column '{name}': {e}"), labels, n)
        })?;
        return Ok(ca.into_iter().map(|v| v.and_then(parse_date)).collect());
    }

    let casted = match col.dtype() {
        DataType::Date => col.clone(),
        _ => col.cast(&DataType::Date).map_err(|e| {
            SignalError::unavailable(
                format!("column '{name}' is not a date: {e}"),
                labels,
                n,
            )
        })?,
    };
    let ca = casted.date().map_err(|e| {
        SignalError::unavailable(format!("column '{name}': {e}"), labels, n)
    })?;

    let epoch = unix_epoch();
    Ok((0..n)
        .map(|i| {
            ca.get(i)
                .map(|days| epoch + chrono::Duration::days(days as i64))
        })
        .collect())
}

/// Parse `YYYY-MM-DD`, ignoring any time-of-day suffix.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(crate) fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}
