//! Dipwatch Core: the daily buy-signal pipeline.
//!
//! - Domain types (price points, the canonical series, indicator and signal rows)
//! - Data suppliers (Yahoo Finance, CSV files, synthetic) and the series normalizer
//! - Indicators: RSI, Bollinger Bands, drawdown from the all-time high
//! - Signal evaluator: three-way conjunction with explicit null handling
//! - Notification gate: once-per-run decision and message composition

pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod notify;
pub mod pipeline;
pub mod signal;

pub use domain::{IndicatorRow, PricePoint, PriceSeries, SignalRow, SignalTable};
pub use error::SignalError;
pub use notify::{decide, NotificationEvent, NotifyMode, Recipients};
pub use pipeline::SignalPipeline;
pub use signal::StrategyParams;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the pipeline types can cross thread boundaries,
    /// so a scheduler may run evaluations on worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<SignalTable>();
        require_sync::<SignalTable>();
        require_send::<SignalPipeline>();
        require_sync::<SignalPipeline>();
        require_send::<NotificationEvent>();
        require_sync::<NotificationEvent>();
        require_send::<indicators::IndicatorValues>();
        require_sync::<indicators::IndicatorValues>();
    }

    /// Architecture contract: the gate sees only the finished table.
    #[test]
    fn gate_takes_only_the_signal_table() {
        fn _check(table: &SignalTable, r: &Recipients) -> Option<NotificationEvent> {
            decide(table, NotifyMode::Live, r)
        }
    }
}
