//! Logging initialization.
//!
//! - Default: human-readable lines on stderr, colored
//! - `--log-json`: structured JSON lines for log collectors
//!
//! `RUST_LOG` wins when set; otherwise the level is `info`, or `debug`
//! when DEBUG_MODE is on. Output goes to stderr so reports on stdout stay
//! clean for piping.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. A second call is an error, not a panic.
pub fn init_logging(json: bool, debug: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_default_level() {
        assert_eq!(default_level(false), "info");
        assert_eq!(default_level(true), "debug");
    }

    #[test]
    fn second_init_fails_softly() {
        let _ = init_logging(false, false);
        assert!(init_logging(true, false).is_err());
    }
}
