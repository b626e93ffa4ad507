//! Settings precedence: secrets file > environment > defaults.

use std::collections::HashMap;

use dipwatch_runner::{Settings, SettingsError};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_then_env_then_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.toml");
    std::fs::write(
        &path,
        r#"
ALERT_EMAIL = "file@example.com"
RECIPIENT_EMAILS = "a@x.com,b@y.org"

[strategy]
drawdown_threshold_pct = -15.0
"#,
    )
    .unwrap();

    let s = Settings::load(
        &path,
        env(&[
            ("ALERT_EMAIL", "env@example.com"),
            ("EMAIL_PASSWORD", "pw"),
            ("DEBUG_MODE", "yes"),
            ("RECIPIENT_EMAILS", "env@x.com"),
        ]),
    )
    .unwrap();

    assert_eq!(s.alert_email.as_deref(), Some("file@example.com"));
    assert_eq!(s.recipients.as_slice(), ["a@x.com", "b@y.org"]);
    assert!(s.debug_mode);
    assert!(s.mail_ready());
    assert_eq!(s.ticker, "VWRL.AS");
    assert_eq!(s.strategy.drawdown_threshold_pct, -15.0);
    assert_eq!(s.strategy.rsi_threshold, 30.0);
}

#[test]
fn malformed_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.toml");
    std::fs::write(&path, "ALERT_EMAIL = ").unwrap();

    let err = Settings::load(&path, env(&[])).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }));
}

#[test]
fn bad_debug_flag_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::load(&dir.path().join("none.toml"), env(&[("DEBUG_MODE", "sometimes")]))
        .unwrap_err();
    assert!(err.to_string().contains("DEBUG_MODE"));
}
