//! Alert ledger: at most one live alert per (ticker, signal date).
//!
//! Layout: `{root}/{ticker}/{date}.json`, with the ticker percent-encoded
//! into a directory name (`^GSPC` → `%5EGSPC`). A claim creates the record file
//! with create-new semantics, so of two concurrent claimers exactly one
//! wins. Releasing a claim deletes the file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_LEDGER_DIR: &str = ".dipwatch/ledger";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode alert record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LedgerError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One delivered (or in-flight) live alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
    pub recipients: usize,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// This caller owns the alert and must deliver or release it.
    Claimed,
    /// Another run already claimed this (ticker, date).
    AlreadyClaimed,
}

#[derive(Debug, Clone)]
pub struct AlertLedger {
    root: PathBuf,
}

impl AlertLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.root.join(ticker_dir_name(ticker))
    }

    pub fn record_path(&self, ticker: &str, date: NaiveDate) -> PathBuf {
        self.ticker_dir(ticker).join(format!("{date}.json"))
    }

    /// Atomically claim the alert for `record.ticker` on `record.date`.
    pub fn claim(&self, record: &AlertRecord) -> Result<Claim, LedgerError> {
        let dir = self.ticker_dir(&record.ticker);
        fs::create_dir_all(&dir).map_err(|e| LedgerError::io(&dir, e))?;

        let path = self.record_path(&record.ticker, record.date);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(ticker = %record.ticker, date = %record.date, "alert already claimed");
                return Ok(Claim::AlreadyClaimed);
            }
            Err(e) => return Err(LedgerError::io(&path, e)),
        };

        let written = serde_json::to_vec_pretty(record)
            .map_err(LedgerError::from)
            .and_then(|bytes| file.write_all(&bytes).map_err(|e| LedgerError::io(&path, e)));
        if let Err(e) = written {
            // A half-written claim would block every later run for this date.
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        Ok(Claim::Claimed)
    }

    /// Drop a claim. Releasing an absent claim is a no-op.
    pub fn release(&self, ticker: &str, date: NaiveDate) -> Result<(), LedgerError> {
        let path = self.record_path(ticker, date);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::io(&path, e)),
        }
    }

    pub fn contains(&self, ticker: &str, date: NaiveDate) -> bool {
        self.record_path(ticker, date).is_file()
    }

    /// Recorded alerts sorted by (ticker, date), optionally for one ticker.
    ///
    /// Unreadable records are skipped with a warning.
    pub fn list(&self, ticker: Option<&str>) -> Result<Vec<AlertRecord>, LedgerError> {
        let mut records = Vec::new();
        for path in self.record_files(ticker)? {
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<AlertRecord>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(record) if ticker.is_some_and(|t| t != record.ticker) => {
                    warn!(
                        path = %path.display(),
                        ticker = %record.ticker,
                        "skipping alert record filed under another ticker"
                    );
                }
                Ok(record) => records.push(record),
                Err(reason) => warn!(path = %path.display(), %reason, "skipping unreadable alert record"),
            }
        }
        records.sort_by(|a, b| (&a.ticker, a.date).cmp(&(&b.ticker, b.date)));
        Ok(records)
    }

    /// Delete recorded alerts, optionally for one ticker. Returns the count removed.
    pub fn clear(&self, ticker: Option<&str>) -> Result<usize, LedgerError> {
        let files = self.record_files(ticker)?;
        for path in &files {
            fs::remove_file(path).map_err(|e| LedgerError::io(path, e))?;
        }
        Ok(files.len())
    }

    fn record_files(&self, ticker: Option<&str>) -> Result<Vec<PathBuf>, LedgerError> {
        let dirs = match ticker {
            Some(t) => vec![self.ticker_dir(t)],
            None => match fs::read_dir(&self.root) {
                Ok(entries) => entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|p| p.is_dir())
                    .collect(),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(LedgerError::io(&self.root, e)),
            },
        };

        let mut files = Vec::new();
        for dir in dirs {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(LedgerError::io(&dir, e)),
            };
            files.extend(
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "json")),
            );
        }
        files.sort();
        Ok(files)
    }
}

/// Map a ticker to a directory name, one-to-one: bytes outside
/// `[A-Za-z0-9.-]` are percent-encoded (`_` and `%` included). Dot-only
/// names have their dots encoded so they never walk upward, and the empty
/// ticker becomes a bare `_`, which no other ticker can produce.
fn ticker_dir_name(ticker: &str) -> String {
    if ticker.is_empty() {
        return "_".to_string();
    }
    let dot_only = ticker.bytes().all(|b| b == b'.');
    let mut name = String::with_capacity(ticker.len());
    for b in ticker.bytes() {
        if (b.is_ascii_alphanumeric() || b == b'-' || b == b'.') && !dot_only {
            name.push(b as char);
        } else {
            name.push_str(&format!("%{b:02X}"));
        }
    }
    name
}
