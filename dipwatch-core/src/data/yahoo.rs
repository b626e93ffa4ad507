//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API and returns them as a
//! ticker-qualified raw table (`Close_VWRL.AS`, ...). One request per fetch;
//! a failure aborts the run upstream.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV provider is the fallback when Yahoo is unavailable.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use super::provider::{
    DataProvider, DataSource, FetchPeriod, FetchResult, Interval, ProviderError, RawColumns,
};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "dataGranularity")]
    data_granularity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// `period1` for a full-history request: 1900-01-01T00:00:00Z. Yahoo may
/// coarsen `range=max` to weekly or monthly bars, an explicit window keeps
/// them daily.
const MAX_HISTORY_START_TS: i64 = -2_208_988_800;

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| ProviderError::NetworkUnreachable(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    /// Build the chart API URL for a symbol and period.
    fn chart_url(symbol: &str, period: FetchPeriod, today: NaiveDate) -> String {
        let start_ts = period
            .start_date(today)
            .and_then(|start| start.and_hms_opt(0, 0, 0))
            .map_or(MAX_HISTORY_START_TS, |dt| dt.and_utc().timestamp());
        let end_ts = today
            .and_hms_opt(23, 59, 59)
            .map_or(0, |dt| dt.and_utc().timestamp());
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={}\
             &includeAdjustedClose=true",
            Interval::Daily.as_str()
        )
    }

    /// Parse the chart API response into raw columns.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<RawColumns, ProviderError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    ProviderError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    ProviderError::ResponseFormatChanged(format!(
                        "{}: {}",
                        err.code, err.description
                    ))
                }
            } else {
                ProviderError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("result array is empty".into()))?;

        if let Some(granularity) = data.meta.as_ref().and_then(|m| m.data_granularity.as_deref()) {
            if granularity != Interval::Daily.as_str() {
                return Err(ProviderError::ResponseFormatChanged(format!(
                    "expected daily bars, got granularity '{granularity}'"
                )));
            }
        }

        let timestamps = data
            .timestamp
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut cols = RawColumns::default();
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Rows with no data at all are holidays / non-trading days.
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            cols.dates.push(date);
            cols.open.push(open);
            cols.high.push(high);
            cols.low.push(low);
            cols.close.push(close);
            cols.volume.push(volume.map(|v| v as f64));
            cols.adj_close
                .push(adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()));
        }

        if cols.is_empty() {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(cols)
    }

    fn request(&self, url: &str, symbol: &str) -> Result<ChartResponse, ProviderError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::AuthenticationRequired(format!(
                "Yahoo Finance answered HTTP {status}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::NetworkUnreachable(format!(
                "HTTP {status} for {symbol}"
            )));
        }

        resp.json().map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {e}"
            ))
        })
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        ticker: &str,
        period: FetchPeriod,
        _interval: Interval,
    ) -> Result<FetchResult, ProviderError> {
        let url = Self::chart_url(ticker, period, chrono::Utc::now().date_naive());
        debug!(%url, "requesting chart");

        let chart = self.request(&url, ticker)?;
        let cols = Self::parse_response(ticker, chart)?;
        info!(ticker, rows = cols.len(), %period, "fetched from Yahoo Finance");

        Ok(FetchResult {
            ticker: ticker.to_string(),
            frame: cols.into_frame(Some(ticker))?,
            source: DataSource::YahooFinance,
        })
    }
}
