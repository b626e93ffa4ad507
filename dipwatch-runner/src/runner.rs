//! Run orchestration: load → pipeline → gate → dispatch.
//!
//! Two entry points:
//! - `run_evaluation()`: fetches prices and builds the signal table. Used by
//!   every CLI command.
//! - `run_notification()`: applies the gate to a finished evaluation and
//!   hands any event to a dispatcher. Used by `notify`.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use dipwatch_core::data::{DataProvider, DataSource};
use dipwatch_core::{
    decide, NotificationEvent, NotifyMode, SignalError, SignalPipeline, SignalTable,
    StrategyParams,
};

use crate::data_loader::{load_prices, LoadError, LoadOptions};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::settings::Settings;
use crate::transport::{LogTransport, MailTransport, OutboxTransport};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("notify mode '{0}' requires DEBUG_MODE")]
    ModeNotAllowed(NotifyMode),
}

/// A finished evaluation for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub ticker: String,
    pub source: DataSource,
    pub has_synthetic: bool,
    pub fingerprint: String,
    pub table: SignalTable,
}

/// Fetch prices and compute the signal table. Any error aborts before a
/// table exists.
pub fn run_evaluation(
    ticker: &str,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
    params: &StrategyParams,
) -> Result<Evaluation, RunError> {
    let loaded = load_prices(ticker, provider, opts)?;
    let table = SignalPipeline::new(ticker, params.clone()).run(&loaded.fetched.frame)?;
    let fingerprint = table.fingerprint();

    info!(
        ticker,
        source = %loaded.fetched.source,
        synthetic = loaded.has_synthetic,
        fingerprint = %fingerprint,
        "evaluation complete"
    );

    Ok(Evaluation {
        ticker: ticker.to_string(),
        source: loaded.fetched.source,
        has_synthetic: loaded.has_synthetic,
        fingerprint,
        table,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct NotifyReport {
    pub mode: NotifyMode,
    pub event: Option<NotificationEvent>,
    pub outcome: Option<DispatchOutcome>,
}

/// Gate the latest row and dispatch. Delivery problems end up in the
/// outcome; only a disallowed mode is an error.
pub fn run_notification(
    evaluation: &Evaluation,
    mode: NotifyMode,
    settings: &Settings,
    dispatcher: &Dispatcher<'_>,
) -> Result<NotifyReport, RunError> {
    if !settings.allows(mode) {
        return Err(RunError::ModeNotAllowed(mode));
    }

    let event = decide(&evaluation.table, mode, &settings.recipients);
    let outcome = event.as_ref().map(|e| dispatcher.dispatch(e));
    Ok(NotifyReport {
        mode,
        event,
        outcome,
    })
}

/// Log transport on dry runs or without credentials, outbox otherwise.
pub fn select_transport(
    settings: &Settings,
    dry_run: bool,
    outbox_dir: &Path,
) -> Box<dyn MailTransport> {
    if dry_run || !settings.mail_ready() {
        if !dry_run {
            info!("ALERT_EMAIL/EMAIL_PASSWORD not set; alerts will be logged only");
        }
        Box::new(LogTransport)
    } else {
        Box::new(OutboxTransport::new(outbox_dir))
    }
}

/// Sender address for outgoing messages.
pub fn sender(settings: &Settings) -> String {
    settings
        .alert_email
        .clone()
        .unwrap_or_else(|| "dipwatch@localhost".to_string())
}
