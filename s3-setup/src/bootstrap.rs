use std::fs;
use std::io::Write;

use s3_common::{
    config::{missing_vars, OPTIONAL_VARS},
    EnvFiles, FileVars, Outcome, Reporter, RequiredVar, VarSource,
};
use tracing::{error, info};

use crate::launcher::{CheckLauncher, LaunchError};

/// How a bootstrap run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The env file is missing or lacks required variables
    Incomplete,
    /// The connectivity check ran and passed
    Verified,
    /// The connectivity check ran and exited non-zero
    CheckFailed(Option<i32>),
    /// The connectivity check exceeded its timeout
    TimedOut,
    /// The connectivity check could not be run
    LaunchFailed(String),
}

/// Makes sure the env file exists, seeding it from the template when needed.
/// An existing env file is never modified.
///
/// Returns `false` when the file is absent and could not be created.
pub fn ensure_config_file<W: Write>(files: &EnvFiles, reporter: &mut Reporter<W>) -> bool {
    let config = files.config_path.display();
    let template = files.template_path.display();

    if files.config_path.exists() {
        reporter.status(Outcome::Pass, format_args!("{config} file already exists"));
        return true;
    }

    if !files.template_path.exists() {
        reporter.status(Outcome::Fail, format_args!("{template} file not found"));
        return false;
    }

    match fs::copy(&files.template_path, &files.config_path) {
        Ok(_) => {
            info!("Created {config} from {template}");
            reporter.status(
                Outcome::Pass,
                format_args!("Created {config} file from {template}"),
            );
            reporter.note(
                "📝",
                format_args!("Please edit {config} file with your AWS credentials"),
            );
            true
        }
        Err(e) => {
            error!("Failed to copy {template} to {config}: {e}");
            reporter.status(
                Outcome::Fail,
                format_args!("Could not create {config} from {template}: {e}"),
            );
            false
        }
    }
}

/// Checks that every required variable has a non-empty value in `source`.
/// Missing names are reported in declaration order. Optional variables are
/// listed as set or unset and never affect the result.
pub fn validate_configuration<S, W>(source: &S, reporter: &mut Reporter<W>) -> bool
where
    S: VarSource + ?Sized,
    W: Write,
{
    let missing = missing_vars(source, RequiredVar::all());

    if missing.is_empty() {
        reporter.status(Outcome::Pass, "All required environment variables are set");
    } else {
        reporter.missing_vars(&missing);
    }

    reporter.blank();
    reporter.note("📋", "Optional Variables:");
    for (name, description) in OPTIONAL_VARS {
        match source.non_empty(name) {
            Some(value) => reporter.status(Outcome::Pass, format_args!("{name}: {value}")),
            None => reporter.note("⚪", format_args!("{name}: Not set ({description})")),
        }
    }

    if missing.is_empty() {
        return true;
    }

    reporter.blank();
    reporter.note("📝", "Please update your .env file with these values");
    false
}

/// Prints the steps for provisioning a bucket and credentials
pub fn print_setup_instructions<W: Write>(reporter: &mut Reporter<W>) {
    reporter.blank();
    reporter.note("📋", "AWS S3 Setup Instructions:");
    reporter.text("1. Go to the AWS Console: https://console.aws.amazon.com/s3/");
    reporter.text("2. Create a new S3 bucket:");
    reporter.detail("- Choose a unique bucket name");
    reporter.detail("- Select your preferred region");
    reporter.detail("- Keep default settings or enable versioning if needed");
    reporter.text("3. Create an IAM user for S3 access:");
    reporter.detail("- Go to IAM > Users > Create user");
    reporter.detail("- Attach a policy with S3 permissions for your bucket");
    reporter.detail("- Create an access key for the user");
    reporter.text("4. Update your .env file with:");
    for var in RequiredVar::all() {
        reporter.detail(format_args!("{var}=..."));
    }
    reporter.text("5. Run the connectivity check to verify the setup");
}

/// One-shot setup: seed the env file, validate it, then run the
/// connectivity check
#[derive(Debug)]
pub struct Bootstrap<L> {
    files: EnvFiles,
    launcher: L,
    inherit_process_env: bool,
}

impl<L: CheckLauncher> Bootstrap<L> {
    /// Bootstrap that validates `files` layered under the process environment
    #[must_use]
    pub const fn new(files: EnvFiles, launcher: L) -> Self {
        Self {
            files,
            launcher,
            inherit_process_env: true,
        }
    }

    /// Whether process variables count towards validation
    #[must_use]
    pub const fn with_process_env(mut self, inherit: bool) -> Self {
        self.inherit_process_env = inherit;
        self
    }

    /// Launcher used for the connectivity check
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs the whole setup. Safe to repeat: an existing env file is left as
    /// it is.
    pub async fn run<W: Write + Send>(&self, reporter: &mut Reporter<W>) -> SetupOutcome {
        reporter.heading("🚀 AWS S3 Quick Setup", 30);

        ensure_config_file(&self.files, reporter);

        let vars = match FileVars::load(&self.files.config_path, self.inherit_process_env) {
            Ok(vars) => vars,
            Err(e) => {
                error!("{e}");
                reporter.status(Outcome::Fail, &e);
                FileVars::empty(self.inherit_process_env)
            }
        };

        if !validate_configuration(&vars, reporter) {
            print_setup_instructions(reporter);
            reporter.blank();
            reporter.note(
                "🔧",
                format_args!(
                    "After configuring {}, run: {}",
                    self.files.config_path.display(),
                    self.launcher.command_line()
                ),
            );
            return SetupOutcome::Incomplete;
        }

        reporter.blank();
        reporter.status(
            Outcome::Pass,
            "Environment configured! Testing S3 connection...",
        );
        reporter.blank();

        let outcome = match self.launcher.launch().await {
            Ok(status) if status.success() => {
                reporter.blank();
                reporter.note("🎉", "S3 setup complete and working!");
                SetupOutcome::Verified
            }
            Ok(status) => {
                reporter.blank();
                reporter.status(
                    Outcome::Warn,
                    "S3 test failed. Check the error messages above.",
                );
                SetupOutcome::CheckFailed(status.code)
            }
            Err(e @ LaunchError::TimedOut { .. }) => {
                reporter.status(Outcome::Warn, format_args!("S3 test stopped: {e}"));
                SetupOutcome::TimedOut
            }
            Err(e) => {
                reporter.status(Outcome::Warn, format_args!("Could not run S3 test: {e}"));
                SetupOutcome::LaunchFailed(e.to_string())
            }
        };

        if outcome != SetupOutcome::Verified {
            reporter.detail(format_args!(
                "Run it manually with: {}",
                self.launcher.command_line()
            ));
        }

        outcome
    }
}
