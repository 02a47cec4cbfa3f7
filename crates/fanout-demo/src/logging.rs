#![forbid(unsafe_code)]

//! Tracing subscriber setup for the demo binary.

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::cli::{LogFormat, Opts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    InvalidFilter { directive: String, reason: String },
    /// A global subscriber was already installed.
    AlreadyInstalled(String),
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter { directive, reason } => {
                write!(f, "invalid log filter {directive:?}: {reason}")
            }
            Self::AlreadyInstalled(reason) => {
                write!(f, "tracing subscriber already installed: {reason}")
            }
        }
    }
}

impl std::error::Error for LoggingError {}

/// Build the event filter. A non-empty `rust_log` wins over `fallback`.
pub fn build_filter(rust_log: Option<&str>, fallback: &str) -> Result<EnvFilter, LoggingError> {
    let directive = match rust_log {
        Some(value) if !value.trim().is_empty() => value,
        _ => fallback,
    };
    EnvFilter::try_new(directive).map_err(|err| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        reason: err.to_string(),
    })
}

/// Install the global subscriber for `opts`. Logs go to stderr so scenario
/// output on stdout stays clean.
pub fn init_tracing(opts: &Opts) -> Result<(), LoggingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), &opts.log_level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match opts.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::AlreadyInstalled(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn fallback_used_without_rust_log() {
        let filter = build_filter(None, "debug").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn rust_log_wins() {
        let filter = build_filter(Some("fanout_core=trace"), "info").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn blank_rust_log_falls_back() {
        let filter = build_filter(Some("   "), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn bad_directive_is_reported() {
        let err = build_filter(None, "fanout_core=loud").unwrap_err();
        assert!(matches!(
            err,
            LoggingError::InvalidFilter { ref directive, .. } if directive == "fanout_core=loud"
        ));
        assert!(err.to_string().starts_with("invalid log filter"));
    }
}
