//! Runs the connectivity check as a child process

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use s3_common::{env_file::ENV_FILE_VAR, EnvFiles, ProcessEnv, VarSource};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// File name of the connectivity check binary
pub const CHECK_BIN_NAME: &str = "s3-check";
/// Overrides the connectivity check executable
pub const CHECK_BIN_VAR: &str = "S3_CHECK_BIN";
/// Overrides how long the connectivity check may run
pub const CHECK_TIMEOUT_VAR: &str = "S3_CHECK_TIMEOUT_SECS";
/// Default limit for a connectivity check run
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 120;

/// Result type for launching the connectivity check
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Errors that can occur while running the connectivity check
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Waiting for the process failed
    #[error("Failed waiting for {program}: {source}")]
    Wait {
        /// Program that was launched
        program: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The process ran past its timeout and was killed
    #[error("{program} did not finish within {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Program that was launched
        program: String,
        /// Limit that was exceeded
        timeout: Duration,
    },
}

/// How the connectivity check exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckStatus {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl CheckStatus {
    /// Whether the check exited with code 0
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for CheckStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Starts the connectivity check and waits for it to finish
#[async_trait::async_trait]
pub trait CheckLauncher: Send + Sync {
    /// Runs the check to completion
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if the check cannot be started, cannot be
    /// waited on, or runs past its timeout
    async fn launch(&self) -> LaunchResult<CheckStatus>;

    /// Command line an operator can run by hand
    fn command_line(&self) -> String;
}

/// Launches the check binary as a child process with inherited stdio
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    timeout: Duration,
}

impl ProcessLauncher {
    /// Launcher for `program` with the default timeout
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
        }
    }

    /// Launcher for the sibling `s3-check` binary that reads `files`
    #[must_use]
    pub fn for_env_files(files: &EnvFiles) -> Self {
        Self::from_source(&ProcessEnv, files)
    }

    /// Resolves program and timeout from `source`
    #[must_use]
    pub fn from_source<S: VarSource + ?Sized>(source: &S, files: &EnvFiles) -> Self {
        Self::new(resolve_check_program(source))
            .with_timeout(check_timeout(source))
            .with_env(ENV_FILE_VAR, files.config_path.as_os_str())
    }

    /// Appends an argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable for the child
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Replaces the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program that will be started
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Limit for one run
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait::async_trait]
impl CheckLauncher for ProcessLauncher {
    async fn launch(&self) -> LaunchResult<CheckStatus> {
        let program = self.program_name();
        info!(
            "Starting {program} with a {}s timeout",
            self.timeout.as_secs()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                error!("Failed to start {program}: {source}");
                LaunchError::Spawn {
                    program: program.clone(),
                    source,
                }
            })?;

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;

        match waited {
            Ok(Ok(status)) => {
                debug!("{program} exited with {status}");
                Ok(CheckStatus::from(status))
            }
            Ok(Err(source)) => Err(LaunchError::Wait { program, source }),
            Err(_) => {
                warn!("{program} exceeded its timeout, killing it");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill {program}: {e}");
                }
                Err(LaunchError::TimedOut {
                    program,
                    timeout: self.timeout,
                })
            }
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program_name())
            .chain(
                self.args
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Path of the connectivity check binary: `S3_CHECK_BIN` if set, otherwise
/// `s3-check` next to the running executable
pub fn resolve_check_program<S: VarSource + ?Sized>(source: &S) -> PathBuf {
    if let Some(program) = source.non_empty(CHECK_BIN_VAR) {
        return PathBuf::from(program);
    }

    let file_name = format!("{CHECK_BIN_NAME}{}", env::consts::EXE_SUFFIX);
    match env::current_exe() {
        Ok(exe) => exe.with_file_name(file_name),
        Err(e) => {
            warn!("Could not locate the running executable: {e}");
            PathBuf::from(file_name)
        }
    }
}

/// Timeout from `S3_CHECK_TIMEOUT_SECS`, ignoring zero and unparsable values
pub fn check_timeout<S: VarSource + ?Sized>(source: &S) -> Duration {
    let secs = source
        .var(CHECK_TIMEOUT_VAR)
        .and_then(|val| val.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_CHECK_TIMEOUT_SECS);

    Duration::from_secs(secs)
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs)]
pub mod mock {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::{CheckLauncher, CheckStatus, LaunchError, LaunchResult};

    /// What the mock does when launched
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockBehavior {
        Exit(Option<i32>),
        SpawnFails,
        TimesOut,
    }

    #[derive(Debug)]
    pub struct MockLauncher {
        behavior: MockBehavior,
        launches: AtomicUsize,
    }

    impl MockLauncher {
        #[must_use]
        pub const fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                launches: AtomicUsize::new(0),
            }
        }

        #[must_use]
        pub fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CheckLauncher for MockLauncher {
        async fn launch(&self) -> LaunchResult<CheckStatus> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                MockBehavior::Exit(code) => Ok(CheckStatus { code }),
                MockBehavior::SpawnFails => Err(LaunchError::Spawn {
                    program: "s3-check".to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
                }),
                MockBehavior::TimesOut => Err(LaunchError::TimedOut {
                    program: "s3-check".to_string(),
                    timeout: Duration::from_secs(120),
                }),
            }
        }

        fn command_line(&self) -> String {
            "s3-check".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_check_timeout() {
        assert_eq!(
            check_timeout(&vars(&[])),
            Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS)
        );
        assert_eq!(
            check_timeout(&vars(&[(CHECK_TIMEOUT_VAR, "30")])),
            Duration::from_secs(30)
        );
        assert_eq!(
            check_timeout(&vars(&[(CHECK_TIMEOUT_VAR, "0")])),
            Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS)
        );
        assert_eq!(
            check_timeout(&vars(&[(CHECK_TIMEOUT_VAR, "soon")])),
            Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_resolve_check_program() {
        let program = resolve_check_program(&vars(&[(CHECK_BIN_VAR, "/opt/bin/s3-check")]));
        assert_eq!(program, PathBuf::from("/opt/bin/s3-check"));

        let program = resolve_check_program(&vars(&[]));
        assert_eq!(
            program.file_name().and_then(|name| name.to_str()),
            Some(format!("{CHECK_BIN_NAME}{}", env::consts::EXE_SUFFIX).as_str())
        );
    }

    #[test]
    fn test_from_source_forwards_env_file() {
        let files = EnvFiles::new("/srv/app/.env", "/srv/app/.env.example");
        let launcher = ProcessLauncher::from_source(
            &vars(&[(CHECK_BIN_VAR, "check"), (CHECK_TIMEOUT_VAR, "5")]),
            &files,
        );

        assert_eq!(launcher.program(), Path::new("check"));
        assert_eq!(launcher.timeout(), Duration::from_secs(5));
        assert_eq!(
            launcher.envs,
            vec![(OsString::from(ENV_FILE_VAR), OsString::from("/srv/app/.env"))]
        );
    }

    #[test]
    fn test_command_line() {
        let launcher = ProcessLauncher::new("s3-check").with_arg("--verbose");
        assert_eq!(launcher.command_line(), "s3-check --verbose");
    }

    #[test]
    fn test_check_status() {
        assert!(CheckStatus { code: Some(0) }.success());
        assert!(!CheckStatus { code: Some(1) }.success());
        assert!(!CheckStatus { code: None }.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_reports_exit_codes() {
        let status = ProcessLauncher::new("true").launch().await.unwrap();
        assert!(status.success());

        let status = ProcessLauncher::new("false").launch().await.unwrap();
        assert_eq!(status, CheckStatus { code: Some(1) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_passes_env_to_child() {
        let status = ProcessLauncher::new("sh")
            .with_arg("-c")
            .with_arg("test \"$S3_ENV_FILE\" = /tmp/custom.env")
            .with_env(ENV_FILE_VAR, "/tmp/custom.env")
            .launch()
            .await
            .unwrap();

        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_times_out() {
        let result = ProcessLauncher::new("sleep")
            .with_arg("5")
            .with_timeout(Duration::from_millis(100))
            .launch()
            .await;

        assert!(matches!(result, Err(LaunchError::TimedOut { .. })));
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let result = ProcessLauncher::new("/nonexistent/s3-check-missing")
            .launch()
            .await;

        assert!(matches!(result, Err(LaunchError::Spawn { .. })));
    }
}
