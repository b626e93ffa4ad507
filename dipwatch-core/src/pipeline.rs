//! The evaluation pipeline: normalize → indicators → signals.
//!
//! Each run recomputes the full table from the raw input. Nothing is kept
//! between runs, so two runs over the same input produce the same table.

use polars::prelude::DataFrame;
use tracing::info;

use crate::data::Normalizer;
use crate::domain::{PriceSeries, SignalTable};
use crate::error::SignalError;
use crate::indicators;
use crate::signal::{self, StrategyParams};

#[derive(Debug, Clone)]
pub struct SignalPipeline {
    ticker: String,
    params: StrategyParams,
}

impl SignalPipeline {
    pub fn new(ticker: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            ticker: ticker.into(),
            params,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run the full pipeline over a raw supplier table.
    ///
    /// Any error aborts the run; no partial table is returned.
    pub fn run(&self, raw: &DataFrame) -> Result<SignalTable, SignalError> {
        let series = Normalizer::for_ticker(&self.ticker).normalize(raw)?;
        self.run_series(&series)
    }

    /// Run from an already-normalized series.
    pub fn run_series(&self, series: &PriceSeries) -> Result<SignalTable, SignalError> {
        let rows = indicators::compute(series, &self.params)?;
        let signals = signal::evaluate(rows, &self.params);
        let table = SignalTable::new(self.ticker.clone(), signals);

        info!(
            ticker = %self.ticker,
            rows = table.len(),
            first = %series.first_date(),
            last = %series.last_date(),
            buy_signals = table.buy_count(),
            "signal table computed"
        );
        Ok(table)
    }
}
