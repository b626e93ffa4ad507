//! CSV file provider: `{dir}/{TICKER}.csv` with any header shape the
//! normalizer can resolve.
//!
//! The file is the whole history; the requested period is not applied.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use super::provider::{DataProvider, DataSource, FetchPeriod, FetchResult, Interval, ProviderError};

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    /// Read a CSV file into a raw table. Columns whose every non-empty cell
    /// parses as a number become f64 columns, everything else stays text.
    pub fn read_frame(path: &Path) -> Result<DataFrame, ProviderError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
        let folded = fold_header_rows(&mut headers, &records);
        if folded > 0 {
            debug!(folded, headers = ?headers, "folded multi-row header");
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in &records[folded..] {
            for (i, column) in cells.iter_mut().enumerate() {
                let cell = record.get(i).filter(|c| !is_null_cell(c)).map(str::to_string);
                column.push(cell);
            }
        }

        let columns: Vec<Column> = headers
            .iter()
            .zip(cells)
            .map(|(name, values)| to_column(name, values))
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// Newer yfinance exports write the column MultiIndex as extra header rows:
/// `Price,Close,...` then `Ticker,VWRL.AS,...` then `Date,,,...`. Fold them
/// into qualified labels (`Close_VWRL.AS`) and name the index column from
/// the `Date` row. Returns the number of rows consumed.
fn fold_header_rows(headers: &mut [String], records: &[csv::StringRecord]) -> usize {
    let mut consumed = 0;
    for record in records.iter().take(2) {
        let Some(first) = record.get(0) else {
            break;
        };
        if first.eq_ignore_ascii_case("ticker") {
            for (label, ticker) in headers.iter_mut().zip(record.iter()).skip(1) {
                if !ticker.is_empty() {
                    *label = format!("{label}_{ticker}");
                }
            }
        } else if (first.eq_ignore_ascii_case("date") || first.eq_ignore_ascii_case("datetime"))
            && record.iter().skip(1).all(str::is_empty)
        {
            if let Some(index) = headers.first_mut() {
                *index = first.to_string();
            }
        } else {
            break;
        }
        consumed += 1;
    }
    consumed
}

fn is_null_cell(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("null") || cell.eq_ignore_ascii_case("nan")
}

fn to_column(name: &str, values: Vec<Option<String>>) -> Column {
    let numeric: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().map(Some),
        })
        .collect();

    match numeric {
        Some(nums) if values.iter().any(Option::is_some) => Column::new(name.into(), nums),
        _ => Column::new(name.into(), values),
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_file"
    }

    fn fetch(
        &self,
        ticker: &str,
        period: FetchPeriod,
        _interval: Interval,
    ) -> Result<FetchResult, ProviderError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(ProviderError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        debug!(path = %path.display(), %period, "reading csv history; period not applied");

        let frame = Self::read_frame(&path)?;
        info!(ticker, rows = frame.height(), "loaded csv history");

        Ok(FetchResult {
            ticker: ticker.to_string(),
            frame,
            source: DataSource::CsvFile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize;

    #[test]
    fn reads_yfinance_style_export() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("VWRL.AS.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-03,101,103,100,102.5,102.0,1200\n\
             2024-01-02,100,102,99,101,100.5,1000\n\
             2024-01-04,,,,null,,\n",
        )
        .unwrap();

        let provider = CsvProvider::new(dir.path());
        let fetched = provider
            .fetch("VWRL.AS", FetchPeriod::Max, Interval::Daily)
            .unwrap();
        assert_eq!(fetched.source, DataSource::CsvFile);
        assert_eq!(fetched.frame.height(), 3);

        let series = normalize(&fetched.frame).unwrap();
        assert_eq!(series.closes(), vec![101.0, 102.5]);
    }

    #[test]
    fn reads_multi_row_yfinance_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("VWRL.AS.csv"),
            "Price,Close,High,Low,Open,Volume\n\
             Ticker,VWRL.AS,VWRL.AS,VWRL.AS,VWRL.AS,VWRL.AS\n\
             Date,,,,,\n\
             2024-01-03,102.5,103,100,101,1200\n\
             2024-01-02,101,102,99,100,1000\n",
        )
        .unwrap();

        let fetched = CsvProvider::new(dir.path())
            .fetch("VWRL.AS", FetchPeriod::Max, Interval::Daily)
            .unwrap();
        let names: Vec<String> = fetched
            .frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Date",
                "Close_VWRL.AS",
                "High_VWRL.AS",
                "Low_VWRL.AS",
                "Open_VWRL.AS",
                "Volume_VWRL.AS"
            ]
        );
        assert_eq!(fetched.frame.height(), 2);

        let series = crate::data::Normalizer::for_ticker("VWRL.AS")
            .normalize(&fetched.frame)
            .unwrap();
        assert_eq!(series.closes(), vec![101.0, 102.5]);
    }

    #[test]
    fn plain_header_is_left_alone() {
        let mut headers = vec!["Date".to_string(), "Close".to_string()];
        let records = vec![csv::StringRecord::from(vec!["2024-01-02", "101"])];
        assert_eq!(fold_header_rows(&mut headers, &records), 0);
        assert_eq!(headers, vec!["Date", "Close"]);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvProvider::new(dir.path())
            .fetch("NOPE", FetchPeriod::Max, Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound { .. }));
    }

    #[test]
    fn text_columns_stay_text() {
        let col = to_column("Date", vec![Some("2024-01-02".into()), None]);
        assert_eq!(col.dtype(), &DataType::String);
        let col = to_column("Close", vec![Some("1.5".into()), None]);
        assert_eq!(col.dtype(), &DataType::Float64);
    }
}
