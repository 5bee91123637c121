//! Connectivity check for an S3 bucket configured through an env file

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Ordered bucket checks
pub mod pipeline;

/// Storage capability interface and the AWS implementation
pub mod storage;

pub use pipeline::{Check, CheckResult, ConnectivityCheck, ConnectivityReport, Failure};
pub use s3_common::report::{Outcome, Reporter};
