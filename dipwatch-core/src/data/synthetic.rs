//! Synthetic data provider for offline development and demos.
//!
//! Produces a deterministic random walk from a starting price of 100.0,
//! seeded from the ticker name. Results built on it are tagged synthetic.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::provider::{
    DataProvider, DataSource, FetchPeriod, FetchResult, Interval, ProviderError, RawColumns,
};

/// History length used for `FetchPeriod::Max`.
const MAX_YEARS: u32 = 10;

pub struct SyntheticProvider {
    end: NaiveDate,
}

impl SyntheticProvider {
    /// Series ending on `end` (inclusive).
    pub fn new(end: NaiveDate) -> Self {
        Self { end }
    }

    pub fn generate(ticker: &str, start: NaiveDate, end: NaiveDate) -> RawColumns {
        let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut cols = RawColumns::default();
        let mut price = 100.0_f64;
        let mut current = start;

        while current <= end {
            let weekday = current.weekday();
            if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            cols.dates.push(current);
            cols.open.push(Some(open));
            cols.high.push(Some(high));
            cols.low.push(Some(low));
            cols.close.push(Some(close));
            cols.adj_close.push(Some(close));
            cols.volume.push(Some(volume));

            price = close;
            current += chrono::Duration::days(1);
        }

        cols
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        ticker: &str,
        period: FetchPeriod,
        _interval: Interval,
    ) -> Result<FetchResult, ProviderError> {
        let start = period
            .start_date(self.end)
            .or_else(|| FetchPeriod::Years(MAX_YEARS).start_date(self.end))
            .ok_or_else(|| ProviderError::InvalidPeriod(period.to_string()))?;

        warn!(ticker, "generating synthetic data; results are tagged as synthetic");
        let cols = Self::generate(ticker, start, self.end);

        Ok(FetchResult {
            ticker: ticker.to_string(),
            frame: cols.into_frame(None)?,
            source: DataSource::Synthetic,
        })
    }
}
