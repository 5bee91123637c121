//! Console report for the operator

use std::fmt;
use std::io::{self, Stdout, Write};

use tracing::warn;

use crate::config::{RequiredVar, DEFAULT_REGION, ENDPOINT_URL_VAR};

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The check succeeded
    Pass,
    /// The check found something worth noting but does not fail the run
    Warn,
    /// The check failed
    Fail,
}

impl Outcome {
    /// Status marker printed in front of the line
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Warn => "⚠️ ",
            Self::Fail => "❌",
        }
    }
}

/// Writes status lines as the checks progress
///
/// Write failures are logged and otherwise ignored, a closed stdout must not
/// change the outcome of the run.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl Reporter<Stdout> {
    /// Reporter printing to stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    /// Reporter writing to `out`
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the reporter, returning the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Title followed by an underline of `=`
    pub fn heading(&mut self, title: &str, width: usize) {
        self.text(title);
        self.line(format_args!("{}", "=".repeat(width)));
    }

    /// A step that is about to run
    pub fn progress(&mut self, message: impl fmt::Display) {
        self.line(format_args!("🔄 {message}"));
    }

    /// A result line
    pub fn status(&mut self, outcome: Outcome, message: impl fmt::Display) {
        self.line(format_args!("{} {message}", outcome.icon()));
    }

    /// An informational line with its own marker
    pub fn note(&mut self, icon: &str, message: impl fmt::Display) {
        self.line(format_args!("{icon} {message}"));
    }

    /// An indented continuation of the previous line
    pub fn detail(&mut self, message: impl fmt::Display) {
        self.line(format_args!("   {message}"));
    }

    /// A plain line
    pub fn text(&mut self, message: impl fmt::Display) {
        self.line(format_args!("{message}"));
    }

    /// An empty line
    pub fn blank(&mut self) {
        self.line(format_args!(""));
    }

    /// Lists missing variables, one per line
    pub fn missing_vars(&mut self, missing: &[RequiredVar]) {
        self.status(Outcome::Fail, "Missing required environment variables:");
        for var in missing {
            self.detail(format_args!("- {var}"));
        }
    }

    /// Steps for getting a bucket and credentials into the env file
    pub fn configuration_help(&mut self) {
        self.blank();
        self.note("📋", "Configuration Help:");
        self.text("1. Create an S3 bucket in the AWS Console");
        self.text("2. Create an IAM user with S3 permissions");
        self.text("3. Update your .env file with:");
        self.detail(format_args!(
            "{}=your-access-key",
            RequiredVar::AccessKeyId
        ));
        self.detail(format_args!(
            "{}=your-secret-key",
            RequiredVar::SecretAccessKey
        ));
        self.detail(format_args!("{}={DEFAULT_REGION}", RequiredVar::Region));
        self.detail(format_args!("{}=your-bucket-name", RequiredVar::BucketName));
        self.detail(format_args!(
            "# optional, for S3-compatible services: {ENDPOINT_URL_VAR}=http://localhost:4566"
        ));
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{args}") {
            warn!("Failed to write report line: {e}");
        }
    }
}
