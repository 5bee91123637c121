//! Shared configuration and logging for the S3 setup tools

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Bucket credentials and the variables they are read from
pub mod config;

/// Locations of the env file and its template
pub mod env_file;

/// Tracing subscriber setup
pub mod logging;

/// Operator-facing console output
pub mod report;

pub use config::{
    ConfigError, ConfigResult, ProcessEnv, RequiredVar, S3Config, VarSource, DEFAULT_REGION,
};
pub use env_file::{EnvFiles, FileVars};
pub use report::{Outcome, Reporter};
