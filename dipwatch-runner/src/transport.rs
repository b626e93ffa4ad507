//! Mail transports.
//!
//! - `LogTransport`: emits the message through `tracing`; nothing leaves the process
//! - `OutboxTransport`: one `.eml` file per message, written tmp-then-rename
//! - `RecordingTransport`: keeps messages in memory, optionally failing every send

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use dipwatch_core::NotificationEvent;

pub const DEFAULT_OUTBOX_DIR: &str = ".dipwatch/outbox";

/// Delivery failure. Never fatal to a run.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("message has no recipients")]
    NoRecipients,

    #[error("outbox write failed at {path}: {source}")]
    Outbox {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transport rejected message: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn from_event(from: impl Into<String>, event: &NotificationEvent) -> Self {
        Self {
            from: from.into(),
            recipients: event.recipients.as_slice().to_vec(),
            subject: event.subject(),
            body: event.body(),
        }
    }

    /// Render as an RFC 5322 message with CRLF line endings.
    pub fn to_rfc5322(&self, date: DateTime<Utc>) -> String {
        let mut out = String::new();
        let mut header = |name: &str, value: &str| {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(&strip_breaks(value));
            out.push_str("\r\n");
        };
        header("From", &self.from);
        header("To", &self.recipients.join(", "));
        header("Subject", &self.subject);
        header("Date", &date.to_rfc2822());
        header("MIME-Version", "1.0");
        header("Content-Type", "text/plain; charset=utf-8");
        header("Content-Transfer-Encoding", "8bit");
        out.push_str("\r\n");
        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// Header values must not carry line breaks.
fn strip_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

pub trait MailTransport: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, message: &MailMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Default)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        if message.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        info!(
            from = %message.from,
            to = %message.recipients.join(", "),
            subject = %message.subject,
            body = %message.body.trim_end(),
            "mail not sent (log transport)"
        );
        Ok(())
    }
}

#[derive(Debug)]
pub struct OutboxTransport {
    dir: PathBuf,
    seq: AtomicU64,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(&self, now: DateTime<Utc>) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{seq:04}.eml",
            now.format("%Y%m%dT%H%M%S%.6fZ"),
            std::process::id()
        )
    }
}

impl MailTransport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        if message.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        let outbox_err = |path: &Path, source: std::io::Error| DeliveryError::Outbox {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|e| outbox_err(&self.dir, e))?;
        let now = Utc::now();
        let name = self.file_name(now);
        let path = self.dir.join(&name);
        // Write to a dot-file first so pickup never sees a partial message.
        let tmp = self.dir.join(format!(".{name}.tmp"));

        fs::write(&tmp, message.to_rfc5322(now)).map_err(|e| outbox_err(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(outbox_err(&path, e));
        }
        debug!(path = %path.display(), "message written to outbox");
        Ok(())
    }
}

/// In-memory transport. Keeps every accepted message; a failing instance
/// rejects every send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MailTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Rejected("recording transport set to fail".into()));
        }
        if message.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        let mut guard = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dipwatch_core::{NotifyMode, Recipients};

    fn event(test_flag: bool) -> NotificationEvent {
        NotificationEvent {
            ticker: "VWRL.AS".into(),
            date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            price: 98.5,
            recipients: Recipients::parse("a@x.com, b@y.org"),
            test_flag,
            mode: if test_flag { NotifyMode::Test } else { NotifyMode::Live },
        }
    }

    fn message() -> MailMessage {
        MailMessage::from_event("bot@example.com", &event(false))
    }

    #[test]
    fn message_carries_event_text() {
        let m = message();
        assert_eq!(m.recipients, ["a@x.com", "b@y.org"]);
        assert_eq!(m.subject, "Buy Signal Alert: VWRL.AS");
        assert!(m.body.contains("98.50"));

        let t = MailMessage::from_event("bot@example.com", &event(true));
        assert!(t.subject.starts_with("[TEST] "));
    }

    #[test]
    fn rfc5322_layout() {
        let date = DateTime::<Utc>::from_timestamp(1_722_844_800, 0).unwrap();
        let text = message().to_rfc5322(date);

        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("From: bot@example.com\r\n"));
        assert!(head.contains("To: a@x.com, b@y.org\r\n"));
        assert!(head.contains("Subject: Buy Signal Alert: VWRL.AS\r\n"));
        assert!(head.contains("Aug 2024 08:00:00 +0000\r\n"));
        assert!(body.starts_with("Buy signal for VWRL.AS on 2024-08-05"));
        assert!(body.ends_with("\r\n"));
    }

    #[test]
    fn header_injection_is_flattened() {
        let mut m = message();
        m.subject = "hi\r\nBcc: evil@x.com".into();
        let text = m.to_rfc5322(Utc::now());
        assert!(!text.contains("\r\nBcc:"));
    }

    #[test]
    fn log_transport_needs_recipients() {
        assert!(LogTransport.send(&message()).is_ok());
        let mut m = message();
        m.recipients.clear();
        assert!(matches!(LogTransport.send(&m), Err(DeliveryError::NoRecipients)));
    }

    #[test]
    fn outbox_writes_one_file_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path().join("outbox"));

        outbox.send(&message()).unwrap();
        outbox.send(&message()).unwrap();

        let mut files: Vec<PathBuf> = fs::read_dir(outbox.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        for f in &files {
            assert_eq!(f.extension().unwrap(), "eml");
            let text = fs::read_to_string(f).unwrap();
            assert!(text.contains("Subject: Buy Signal Alert: VWRL.AS"));
        }
    }

    #[test]
    fn outbox_fails_on_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let outbox = OutboxTransport::new(&blocker);
        assert!(matches!(outbox.send(&message()), Err(DeliveryError::Outbox { .. })));
    }

    #[test]
    fn recording_transport_records_or_fails() {
        let ok = RecordingTransport::new();
        ok.send(&message()).unwrap();
        assert_eq!(ok.sent(), vec![message()]);

        let bad = RecordingTransport::failing();
        assert!(matches!(bad.send(&message()), Err(DeliveryError::Rejected(_))));
        assert!(bad.sent().is_empty());
    }
}
