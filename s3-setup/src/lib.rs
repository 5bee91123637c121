//! Creates the env file and verifies S3 access on first run

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Env file seeding, validation and the setup run
pub mod bootstrap;

/// Child process running the connectivity check
pub mod launcher;

pub use bootstrap::{
    ensure_config_file, print_setup_instructions, validate_configuration, Bootstrap, SetupOutcome,
};
pub use launcher::{CheckLauncher, CheckStatus, LaunchError, ProcessLauncher};
