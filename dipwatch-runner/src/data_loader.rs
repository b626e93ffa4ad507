//! Price loading for the runner.
//!
//! Resolves the configured supplier and fetches one ticker's daily history.
//! Fallback policy:
//! 1. Fetch from the configured supplier
//! 2. If that fails and synthetic fallback is enabled, generate a synthetic
//!    series (tagged) and warn
//! 3. Otherwise fail with the supplier's error
//!
//! Synthetic data is a developer-only mode. Reports built on it say so.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use dipwatch_core::data::{
    CsvProvider, DataProvider, DataSource, FetchPeriod, FetchResult, Interval, ProviderError,
    SyntheticProvider, YahooProvider,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot fetch '{ticker}' from {provider}: {source}")]
    FetchFailed {
        ticker: String,
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("cannot build data provider: {0}")]
    Provider(#[from] ProviderError),
}

impl LoadError {
    /// The underlying supplier error.
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            LoadError::FetchFailed { source, .. } => source,
            LoadError::Provider(e) => e,
        }
    }
}

/// Which supplier a run reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    Yahoo,
    Csv(PathBuf),
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub period: FetchPeriod,
    /// Generate a synthetic series when the supplier fails.
    pub synthetic_fallback: bool,
    /// Last day of synthetic series.
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub fetched: FetchResult,
    pub has_synthetic: bool,
}

pub fn build_provider(
    choice: &SourceChoice,
    today: NaiveDate,
) -> Result<Box<dyn DataProvider>, LoadError> {
    Ok(match choice {
        SourceChoice::Yahoo => Box::new(YahooProvider::new()?),
        SourceChoice::Csv(dir) => Box::new(CsvProvider::new(dir.clone())),
        SourceChoice::Synthetic => Box::new(SyntheticProvider::new(today)),
    })
}

/// Fetch daily prices for `ticker`, applying the synthetic fallback policy.
pub fn load_prices(
    ticker: &str,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    match provider.fetch(ticker, opts.period, Interval::Daily) {
        Ok(fetched) => {
            info!(
                ticker,
                provider = provider.name(),
                rows = fetched.frame.height(),
                "prices fetched"
            );
            let has_synthetic = fetched.source == DataSource::Synthetic;
            Ok(LoadedData {
                fetched,
                has_synthetic,
            })
        }
        Err(source) if opts.synthetic_fallback => {
            warn!(
                ticker,
                provider = provider.name(),
                error = %source,
                "fetch failed; generating synthetic data, results will be tagged as synthetic"
            );
            let fetched = SyntheticProvider::new(opts.today).fetch(
                ticker,
                opts.period,
                Interval::Daily,
            )?;
            Ok(LoadedData {
                fetched,
                has_synthetic: true,
            })
        }
        Err(source) => Err(LoadError::FetchFailed {
            ticker: ticker.to_string(),
            provider: provider.name().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl DataProvider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn fetch(
            &self,
            _ticker: &str,
            _period: FetchPeriod,
            _interval: Interval,
        ) -> Result<FetchResult, ProviderError> {
            Err(ProviderError::NetworkUnreachable("no route to host".into()))
        }
    }

    fn opts(synthetic_fallback: bool) -> LoadOptions {
        LoadOptions {
            period: FetchPeriod::Years(1),
            synthetic_fallback,
            today: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        }
    }

    #[test]
    fn failure_without_fallback_names_provider() {
        let err = load_prices("VWRL.AS", &Offline, &opts(false)).unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert!(matches!(
            err.provider_error(),
            ProviderError::NetworkUnreachable(_)
        ));
    }

    #[test]
    fn failure_with_fallback_is_tagged_synthetic() {
        let loaded = load_prices("VWRL.AS", &Offline, &opts(true)).unwrap();
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.fetched.source, DataSource::Synthetic);
        assert!(loaded.fetched.frame.height() > 200);
    }

    #[test]
    fn csv_choice_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("VWRL.AS.csv"),
            "Date,Close\n2024-01-02,100.0\n2024-01-03,101.5\n",
        )
        .unwrap();

        let provider = build_provider(&SourceChoice::Csv(dir.path().into()), opts(false).today)
            .unwrap();
        let loaded = load_prices("VWRL.AS", provider.as_ref(), &opts(false)).unwrap();
        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.fetched.source, DataSource::CsvFile);
        assert_eq!(loaded.fetched.frame.height(), 2);
    }

    #[test]
    fn missing_csv_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = build_provider(&SourceChoice::Csv(dir.path().into()), opts(false).today)
            .unwrap();
        assert!(load_prices("NOPE", provider.as_ref(), &opts(false)).is_err());
    }
}
