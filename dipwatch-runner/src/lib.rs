//! Dipwatch Runner: settings, price loading, alert dispatch, reporting.
//!
//! This crate builds on `dipwatch-core` to provide:
//! - Settings from a secrets file, the environment and defaults
//! - Price loading with an opt-in synthetic fallback
//! - Evaluation and notification runs
//! - Alert ledger (one live alert per ticker and signal date)
//! - Mail transports (log, outbox, in-memory)
//! - Summary, buy listing, text chart, CSV/JSON export
//! - Logging setup for the binary

pub mod chart;
pub mod data_loader;
pub mod dispatch;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod runner;
pub mod settings;
pub mod transport;

pub use chart::{render_chart, ChartOptions};
pub use data_loader::{build_provider, load_prices, LoadError, LoadOptions, LoadedData, SourceChoice};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use ledger::{AlertLedger, AlertRecord, Claim, LedgerError};
pub use logging::init_logging;
pub use runner::{
    run_evaluation, run_notification, select_transport, sender, Evaluation, NotifyReport, RunError,
};
pub use settings::{Secret, Settings, SettingsError};
pub use transport::{
    DeliveryError, LogTransport, MailMessage, MailTransport, OutboxTransport, RecordingTransport,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_types_are_send_sync() {
        assert_send::<Evaluation>();
        assert_sync::<Evaluation>();
        assert_send::<Settings>();
        assert_sync::<Settings>();
        assert_send::<AlertLedger>();
        assert_sync::<AlertLedger>();
    }

    #[test]
    fn transports_are_send_sync() {
        assert_send::<OutboxTransport>();
        assert_sync::<OutboxTransport>();
        assert_send::<RecordingTransport>();
        assert_sync::<RecordingTransport>();
    }
}
