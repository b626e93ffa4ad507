//! Price points and the canonical close-price series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SignalError;

/// Daily OHLCV point for one ticker.
///
/// Only `close` feeds the indicators; the other fields are carried through
/// untouched (NaN when the supplier did not provide them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Point with only a close; the remaining fields are NaN.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close,
            volume: f64::NAN,
        }
    }

    /// A point is usable when its close is a finite number.
    pub fn has_usable_close(&self) -> bool {
        self.close.is_finite()
    }
}

/// Non-empty, strictly date-ascending series of points with finite closes.
///
/// The only ways to build one are [`PriceSeries::from_points`] and the
/// normalizer, both of which enforce the invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

const CANONICAL_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

impl PriceSeries {
    /// Canonicalize arbitrary points: drop unusable closes, sort by date,
    /// keep the last entry for a duplicated date.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, SignalError> {
        let columns: Vec<String> = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
        Self::canonicalize(points, &columns)
    }

    pub(crate) fn canonicalize(
        points: Vec<PricePoint>,
        columns: &[String],
    ) -> Result<Self, SignalError> {
        let input_rows = points.len();
        if input_rows == 0 {
            return Err(SignalError::unavailable(
                "raw table is empty",
                columns,
                input_rows,
            ));
        }

        let mut usable: Vec<PricePoint> =
            points.into_iter().filter(|p| p.has_usable_close()).collect();
        let dropped = input_rows - usable.len();
        if usable.is_empty() {
            return Err(SignalError::unavailable(
                "every close value is null",
                columns,
                input_rows,
            ));
        }

        // Stable sort keeps input order among equal dates, so the last one wins below.
        usable.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(usable.len());
        for point in usable {
            match deduped.last_mut() {
                Some(prev) if prev.date == point.date => *prev = point,
                _ => deduped.push(point),
            }
        }
        let duplicates = input_rows - dropped - deduped.len();

        debug!(
            input_rows,
            dropped_null_close = dropped,
            duplicates_removed = duplicates,
            points = deduped.len(),
            "canonicalized price series"
        );

        Ok(Self { points: deduped })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn sorts_unordered_points() {
        let series = PriceSeries::from_points(vec![
            PricePoint::from_close(d(3), 103.0),
            PricePoint::from_close(d(1), 101.0),
            PricePoint::from_close(d(2), 102.0),
        ])
        .unwrap();

        assert_eq!(series.closes(), vec![101.0, 102.0, 103.0]);
        assert_eq!(series.first_date(), d(1));
        assert_eq!(series.last_date(), d(3));
    }

    #[test]
    fn duplicate_date_keeps_last_entry() {
        let series = PriceSeries::from_points(vec![
            PricePoint::from_close(d(2), 50.0),
            PricePoint::from_close(d(1), 10.0),
            PricePoint::from_close(d(2), 55.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[1].close, 55.0);
    }

    #[test]
    fn drops_null_closes() {
        let series = PriceSeries::from_points(vec![
            PricePoint::from_close(d(1), 10.0),
            PricePoint::from_close(d(2), f64::NAN),
            PricePoint::from_close(d(3), 12.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.points().iter().all(|p| p.close.is_finite()));
    }

    #[test]
    fn empty_input_is_unavailable() {
        let err = PriceSeries::from_points(vec![]).unwrap_err();
        assert!(matches!(err, SignalError::DataUnavailable { rows: 0, .. }));
    }

    #[test]
    fn all_null_closes_is_unavailable() {
        let err = PriceSeries::from_points(vec![
            PricePoint::from_close(d(1), f64::NAN),
            PricePoint::from_close(d(2), f64::NAN),
        ])
        .unwrap_err();
        match err {
            SignalError::DataUnavailable { reason, rows, .. } => {
                assert!(reason.contains("every close"));
                assert_eq!(rows, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
