//! Data supplier trait, fetch parameters and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV
//! files, synthetic series) so we can swap implementations and mock for
//! tests. Providers return the raw table; normalization happens downstream.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalize::unix_epoch;

/// Structured error types for supplier operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("unsupported interval '{0}': only daily bars are supported")]
    UnsupportedInterval(String),

    #[error("invalid fetch period '{0}': expected 'max', '<n>y' or '<n>d'")]
    InvalidPeriod(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("table construction failed: {0}")]
    Frame(#[from] PolarsError),
}

/// How much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FetchPeriod {
    /// Everything the supplier has. Gives the most meaningful all-time high.
    #[default]
    Max,
    Years(u32),
    Days(u32),
}

impl FetchPeriod {
    /// First date covered by the period, or `None` for `Max`.
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match *self {
            FetchPeriod::Max => None,
            FetchPeriod::Years(n) => today.checked_sub_months(Months::new(n * 12)),
            FetchPeriod::Days(n) => today.checked_sub_signed(chrono::Duration::days(n as i64)),
        }
    }
}

impl fmt::Display for FetchPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPeriod::Max => f.write_str("max"),
            FetchPeriod::Years(n) => write!(f, "{n}y"),
            FetchPeriod::Days(n) => write!(f, "{n}d"),
        }
    }
}

impl FromStr for FetchPeriod {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "max" {
            return Ok(FetchPeriod::Max);
        }
        let invalid = || ProviderError::InvalidPeriod(s.clone());
        let Some(unit) = s.chars().last() else {
            return Err(invalid());
        };
        let count = &s[..s.len() - unit.len_utf8()];
        let n: u32 = count.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        match unit {
            'y' => Ok(FetchPeriod::Years(n)),
            'd' => Ok(FetchPeriod::Days(n)),
            _ => Err(invalid()),
        }
    }
}

/// Bar interval. The pipeline is defined on daily bars only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        "1d"
    }
}

impl FromStr for Interval {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "daily" | "day" => Ok(Interval::Daily),
            other => Err(ProviderError::UnsupportedInterval(other.to_string())),
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvFile,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::CsvFile => "csv_file",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// Result of a successful fetch for a single ticker.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub ticker: String,
    pub frame: DataFrame,
    pub source: DataSource,
}

/// Trait for data suppliers.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the raw daily OHLCV table for a ticker. One attempt, no retry.
    fn fetch(
        &self,
        ticker: &str,
        period: FetchPeriod,
        interval: Interval,
    ) -> Result<FetchResult, ProviderError>;
}

/// Column vectors of a raw OHLCV table, before labels are attached.
#[derive(Debug, Clone, Default)]
pub struct RawColumns {
    pub dates: Vec<NaiveDate>,
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub adj_close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

impl RawColumns {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Build a DataFrame. With a qualifier, price columns are labelled
    /// `{Field}_{qualifier}`, the way multi-ticker downloads flatten them.
    pub fn into_frame(self, qualifier: Option<&str>) -> Result<DataFrame, ProviderError> {
        let label = |field: &str| match qualifier {
            Some(q) => format!("{field}_{q}"),
            None => field.to_string(),
        };
        let epoch = unix_epoch();
        let days: Vec<i32> = self
            .dates
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();

        let frame = DataFrame::new(vec![
            Column::new("Date".into(), days).cast(&DataType::Date)?,
            Column::new(label("Open").into(), self.open),
            Column::new(label("High").into(), self.high),
            Column::new(label("Low").into(), self.low),
            Column::new(label("Close").into(), self.close),
            Column::new(label("Adj Close").into(), self.adj_close),
            Column::new(label("Volume").into(), self.volume),
        ])?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses() {
        assert_eq!("max".parse::<FetchPeriod>().unwrap(), FetchPeriod::Max);
        assert_eq!("5y".parse::<FetchPeriod>().unwrap(), FetchPeriod::Years(5));
        assert_eq!("30D".parse::<FetchPeriod>().unwrap(), FetchPeriod::Days(30));
        assert!("0y".parse::<FetchPeriod>().is_err());
        assert!("5w".parse::<FetchPeriod>().is_err());
        assert!("".parse::<FetchPeriod>().is_err());
    }

    #[test]
    fn period_start_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(FetchPeriod::Max.start_date(today), None);
        assert_eq!(
            FetchPeriod::Years(1).start_date(today),
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(
            FetchPeriod::Days(15).start_date(today),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn period_display_round_trips() {
        for p in [FetchPeriod::Max, FetchPeriod::Years(3), FetchPeriod::Days(90)] {
            assert_eq!(p.to_string().parse::<FetchPeriod>().unwrap(), p);
        }
    }

    #[test]
    fn only_daily_interval() {
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::Daily);
        assert!(matches!(
            "1h".parse::<Interval>(),
            Err(ProviderError::UnsupportedInterval(_))
        ));
    }

    #[test]
    fn qualified_frame_labels() {
        let cols = RawColumns {
            dates: vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            open: vec![Some(1.0)],
            high: vec![Some(2.0)],
            low: vec![Some(0.5)],
            close: vec![Some(1.5)],
            adj_close: vec![None],
            volume: vec![Some(100.0)],
        };
        let frame = cols.into_frame(Some("VWRL.AS")).unwrap();
        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert!(names.contains(&"Close_VWRL.AS".to_string()));
        assert!(names.contains(&"Adj Close_VWRL.AS".to_string()));
        assert_eq!(frame.height(), 1);
    }
}
