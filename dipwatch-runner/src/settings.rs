//! Run settings: secrets file, process environment, defaults.
//!
//! Each option resolves independently in precedence order:
//! 1. secrets file (TOML, default `.dipwatch/secrets.toml`)
//! 2. process environment (the CLI seeds it from `.env` first)
//! 3. built-in default
//!
//! `Settings` is built once at start-up and passed down. Nothing below the
//! CLI reads the environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use dipwatch_core::{NotifyMode, Recipients, SignalError, StrategyParams};

pub const DEFAULT_TICKER: &str = "VWRL.AS";
pub const DEFAULT_SECRETS_PATH: &str = ".dipwatch/secrets.toml";

/// Errors raised while building settings. Always fatal at start-up.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read secrets file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid secrets file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid boolean for {key}: '{value}' (expected 1/0, true/false, yes/no, on/off)")]
    InvalidFlag { key: &'static str, value: String },

    #[error("invalid strategy overrides: {0}")]
    Strategy(#[from] SignalError),
}

/// A value that may be written as a TOML string or a native type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ListValue {
    List(Vec<String>),
    Text(String),
}

/// On-disk shape of the secrets file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretsFile {
    #[serde(rename = "ALERT_EMAIL", alias = "alert_email")]
    alert_email: Option<String>,
    #[serde(rename = "EMAIL_PASSWORD", alias = "email_password")]
    email_password: Option<String>,
    #[serde(rename = "RECIPIENT_EMAILS", alias = "recipient_emails")]
    recipient_emails: Option<ListValue>,
    #[serde(rename = "RECIPIENT_EMAIL", alias = "recipient_email")]
    recipient_email: Option<String>,
    #[serde(rename = "DEBUG_MODE", alias = "debug_mode")]
    debug_mode: Option<FlagValue>,
    #[serde(rename = "TICKER", alias = "ticker")]
    ticker: Option<String>,
    strategy: Option<StrategyParams>,
}

impl SecretsFile {
    pub fn parse(text: &str, path: &Path) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the file; a missing file is an empty secrets set.
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no secrets file");
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Password wrapper whose `Debug` and `Display` never show the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub alert_email: Option<String>,
    pub email_password: Option<Secret>,
    pub recipients: Recipients,
    pub debug_mode: bool,
    pub ticker: String,
    pub strategy: StrategyParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_email: None,
            email_password: None,
            recipients: Recipients::default(),
            debug_mode: false,
            ticker: DEFAULT_TICKER.to_string(),
            strategy: StrategyParams::default(),
        }
    }
}

impl Settings {
    /// Load from a secrets file and an environment lookup.
    pub fn load<F>(secrets_path: &Path, env: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = SecretsFile::read(secrets_path)?;
        Self::resolve(secrets, env)
    }

    /// Merge a parsed secrets file over an environment lookup over defaults.
    pub fn resolve<F>(secrets: SecretsFile, env: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| env(key).and_then(non_empty);

        let alert_email = secrets
            .alert_email
            .and_then(non_empty)
            .or_else(|| env_value("ALERT_EMAIL"));
        let email_password = secrets
            .email_password
            .and_then(non_empty)
            .or_else(|| env_value("EMAIL_PASSWORD"))
            .map(Secret);

        let file_recipients = secrets
            .recipient_emails
            .map(|value| match value {
                ListValue::List(list) => list.into_iter().collect(),
                ListValue::Text(text) => Recipients::parse(&text),
            })
            .filter(|r: &Recipients| !r.is_empty())
            .or_else(|| {
                secrets
                    .recipient_email
                    .map(|single| Recipients::parse(&single))
                    .filter(|r| !r.is_empty())
            });
        let recipients = match file_recipients {
            Some(r) => r,
            None => env_value("RECIPIENT_EMAILS")
                .or_else(|| env_value("RECIPIENT_EMAIL"))
                .map(|text| Recipients::parse(&text))
                .unwrap_or_default(),
        };

        let file_flag = match secrets.debug_mode {
            Some(FlagValue::Bool(b)) => Some(b),
            Some(FlagValue::Int(n)) => Some(n != 0),
            Some(FlagValue::Text(text)) => match non_empty(text) {
                Some(text) => Some(parse_flag("DEBUG_MODE", &text)?),
                None => None,
            },
            None => None,
        };
        let debug_mode = match file_flag {
            Some(flag) => flag,
            None => match env_value("DEBUG_MODE") {
                Some(text) => parse_flag("DEBUG_MODE", &text)?,
                None => false,
            },
        };

        let ticker = secrets
            .ticker
            .and_then(non_empty)
            .or_else(|| env_value("TICKER"))
            .unwrap_or_else(|| DEFAULT_TICKER.to_string());

        let strategy = secrets.strategy.unwrap_or_default();
        strategy.validate()?;

        Ok(Self {
            alert_email,
            email_password,
            recipients,
            debug_mode,
            ticker,
            strategy,
        })
    }

    /// Sender address and password are both present.
    pub fn mail_ready(&self) -> bool {
        self.alert_email.is_some() && self.email_password.is_some()
    }

    /// `test` and `forced` runs are operator controls, available only in debug mode.
    pub fn allows(&self, mode: NotifyMode) -> bool {
        mode == NotifyMode::Live || self.debug_mode
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a boolean flag: 1/0, true/false, yes/no, on/off (case-insensitive).
pub fn parse_flag(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
