//! Once-per-run notification decision against the latest signal row.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Recipients;
use crate::domain::SignalTable;

/// How the gate treats the latest signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Fire only when the latest row's buy signal is true.
    Live,
    /// Always fire, tagged as a test.
    Test,
    /// Always fire, tagged live; for connectivity checks.
    Forced,
}

impl NotifyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyMode::Live => "live",
            NotifyMode::Test => "test",
            NotifyMode::Forced => "forced",
        }
    }
}

impl fmt::Display for NotifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(NotifyMode::Live),
            "test" => Ok(NotifyMode::Test),
            "forced" => Ok(NotifyMode::Forced),
            other => Err(format!(
                "unknown notify mode '{other}'. Valid: live, test, forced"
            )),
        }
    }
}

/// A composed notification, ready for a mail transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
    pub recipients: Recipients,
    pub test_flag: bool,
    pub mode: NotifyMode,
}

impl NotificationEvent {
    pub fn subject(&self) -> String {
        if self.test_flag {
            format!("[TEST] Buy Signal Alert: {}", self.ticker)
        } else {
            format!("Buy Signal Alert: {}", self.ticker)
        }
    }

    pub fn body(&self) -> String {
        let line = format!(
            "Buy signal for {} on {} at price {:.2}",
            self.ticker, self.date, self.price
        );
        if self.test_flag {
            format!("This is a test notification; the signal was not evaluated.\n\n{line}\n")
        } else {
            format!("{line}\n")
        }
    }
}

/// Decide whether this run notifies. Performs no I/O.
///
/// Returns `None` for an empty table, or in live mode when the latest row
/// did not fire.
pub fn decide(
    table: &SignalTable,
    mode: NotifyMode,
    recipients: &Recipients,
) -> Option<NotificationEvent> {
    let latest = table.latest()?;

    let fire = match mode {
        NotifyMode::Live => latest.buy_signal,
        NotifyMode::Test | NotifyMode::Forced => true,
    };
    if !fire {
        debug!(ticker = table.ticker(), date = %latest.date, "no buy signal on latest row");
        return None;
    }

    info!(
        ticker = table.ticker(),
        date = %latest.date,
        close = latest.close,
        %mode,
        "notification composed"
    );

    Some(NotificationEvent {
        ticker: table.ticker().to_string(),
        date: latest.date,
        price: latest.close,
        recipients: recipients.clone(),
        test_flag: mode == NotifyMode::Test,
        mode,
    })
}
