//! Tracing subscriber setup shared by both binaries
//!
//! Logs go to stderr so they never interleave with the operator report
//! printed on stdout.

use std::env;
use std::io;

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Selects the log line format
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parses a `LOG_FORMAT` value. Anything other than `json` is text.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }

    /// Reads the format from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(env::var(LOG_FORMAT_VAR).ok().as_deref())
    }
}

/// Installs the global subscriber. Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = fmt().with_env_filter(filter).with_writer(io::stderr);

    let result = match LogFormat::from_env() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {e}");
    }
}
