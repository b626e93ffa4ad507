//! Notification dispatch: ledger claim, send, and failure containment.
//!
//! Nothing here returns an error. Every path ends in a `DispatchOutcome`
//! and a failed send is logged as a warning.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use dipwatch_core::{NotificationEvent, NotifyMode};

use crate::ledger::{AlertLedger, AlertRecord, Claim};
use crate::transport::{MailMessage, MailTransport};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The transport accepted the message.
    Sent { transport: String, recipients: usize },
    /// A previous live run already alerted for this date.
    AlreadySent { date: NaiveDate },
    /// The transport failed; the run itself still succeeds.
    Failed { reason: String },
    /// Nothing could be sent.
    Skipped { reason: String },
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Sent {
                transport,
                recipients,
            } => write!(f, "sent to {recipients} recipient(s) via {transport}"),
            DispatchOutcome::AlreadySent { date } => {
                write!(f, "already alerted for {date}, not sent again")
            }
            DispatchOutcome::Failed { reason } => write!(f, "delivery failed: {reason}"),
            DispatchOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

pub struct Dispatcher<'a> {
    transport: &'a dyn MailTransport,
    ledger: Option<&'a AlertLedger>,
    from: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(transport: &'a dyn MailTransport, from: impl Into<String>) -> Self {
        Self {
            transport,
            ledger: None,
            from: from.into(),
        }
    }

    /// Live events claim (ticker, date) in this ledger before sending.
    pub fn with_ledger(mut self, ledger: &'a AlertLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn dispatch(&self, event: &NotificationEvent) -> DispatchOutcome {
        if event.recipients.is_empty() {
            warn!(ticker = %event.ticker, "no recipients configured; alert not sent");
            return DispatchOutcome::Skipped {
                reason: "no recipients configured".into(),
            };
        }

        let claimed = match (event.mode, self.ledger) {
            (NotifyMode::Live, Some(ledger)) => match ledger.claim(&record(event)) {
                Ok(Claim::Claimed) => Some(ledger),
                Ok(Claim::AlreadyClaimed) => {
                    info!(ticker = %event.ticker, date = %event.date, "alert already sent for this date");
                    return DispatchOutcome::AlreadySent { date: event.date };
                }
                Err(e) => {
                    warn!(error = %e, "alert ledger unavailable; sending without a claim");
                    None
                }
            },
            _ => None,
        };

        let message = MailMessage::from_event(self.from.clone(), event);
        match self.transport.send(&message) {
            Ok(()) => {
                info!(
                    ticker = %event.ticker,
                    date = %event.date,
                    mode = %event.mode,
                    transport = self.transport.name(),
                    recipients = message.recipients.len(),
                    "alert sent"
                );
                DispatchOutcome::Sent {
                    transport: self.transport.name().to_string(),
                    recipients: message.recipients.len(),
                }
            }
            Err(e) => {
                warn!(
                    ticker = %event.ticker,
                    transport = self.transport.name(),
                    error = %e,
                    "alert delivery failed"
                );
                if let Some(ledger) = claimed {
                    if let Err(release) = ledger.release(&event.ticker, event.date) {
                        warn!(error = %release, "could not release alert claim");
                    }
                }
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn record(event: &NotificationEvent) -> AlertRecord {
    AlertRecord {
        ticker: event.ticker.clone(),
        date: event.date,
        price: event.price,
        recipients: event.recipients.len(),
        claimed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use dipwatch_core::Recipients;

    fn event(mode: NotifyMode, recipients: &str) -> NotificationEvent {
        NotificationEvent {
            ticker: "VWRL.AS".into(),
            date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            price: 88.0,
            recipients: Recipients::parse(recipients),
            test_flag: mode == NotifyMode::Test,
            mode,
        }
    }

    #[test]
    fn live_alert_sends_once_per_date() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AlertLedger::new(dir.path());
        let transport = RecordingTransport::new();
        let dispatcher = Dispatcher::new(&transport, "bot@example.com").with_ledger(&ledger);
        let e = event(NotifyMode::Live, "a@x.com");

        assert!(matches!(dispatcher.dispatch(&e), DispatchOutcome::Sent { recipients: 1, .. }));
        assert_eq!(
            dispatcher.dispatch(&e),
            DispatchOutcome::AlreadySent { date: e.date }
        );
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0].from, "bot@example.com");
    }

    #[test]
    fn failed_send_releases_claim() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AlertLedger::new(dir.path());
        let e = event(NotifyMode::Live, "a@x.com");

        let broken = RecordingTransport::failing();
        let outcome = Dispatcher::new(&broken, "bot@example.com")
            .with_ledger(&ledger)
            .dispatch(&e);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(!ledger.contains(&e.ticker, e.date));

        let working = RecordingTransport::new();
        let outcome = Dispatcher::new(&working, "bot@example.com")
            .with_ledger(&ledger)
            .dispatch(&e);
        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
        assert!(ledger.contains(&e.ticker, e.date));
    }

    #[test]
    fn operator_modes_bypass_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AlertLedger::new(dir.path());
        let transport = RecordingTransport::new();
        let dispatcher = Dispatcher::new(&transport, "bot@example.com").with_ledger(&ledger);

        for mode in [NotifyMode::Test, NotifyMode::Forced, NotifyMode::Test] {
            assert!(matches!(
                dispatcher.dispatch(&event(mode, "a@x.com")),
                DispatchOutcome::Sent { .. }
            ));
        }
        assert_eq!(transport.sent().len(), 3);
        assert!(ledger.list(None).unwrap().is_empty());
    }

    #[test]
    fn no_recipients_is_skipped() {
        let transport = RecordingTransport::new();
        let outcome = Dispatcher::new(&transport, "bot@example.com")
            .dispatch(&event(NotifyMode::Live, " , "));
        assert!(matches!(outcome, DispatchOutcome::Skipped { .. }));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn unusable_ledger_still_delivers() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("ledger");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let ledger = AlertLedger::new(&blocker);
        let transport = RecordingTransport::new();

        let outcome = Dispatcher::new(&transport, "bot@example.com")
            .with_ledger(&ledger)
            .dispatch(&event(NotifyMode::Live, "a@x.com"));
        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn outcome_display() {
        let o = DispatchOutcome::Sent {
            transport: "outbox".into(),
            recipients: 2,
        };
        assert_eq!(o.to_string(), "sent to 2 recipient(s) via outbox");
    }
}
