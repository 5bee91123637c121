//! Env file locations and loading

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{ConfigError, ConfigResult, ProcessEnv, S3Config, VarSource};

/// Default env file, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";
/// Default template the env file is seeded from
pub const DEFAULT_ENV_TEMPLATE: &str = ".env.example";
/// Overrides the env file location
pub const ENV_FILE_VAR: &str = "S3_ENV_FILE";
/// Overrides the template location
pub const ENV_TEMPLATE_VAR: &str = "S3_ENV_TEMPLATE";

/// Paths of the env file and the template it is created from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFiles {
    /// Env file holding the operator's credentials
    pub config_path: PathBuf,
    /// Template copied into place when the env file is missing
    pub template_path: PathBuf,
}

impl EnvFiles {
    /// Creates a pair of explicit paths
    #[must_use]
    pub fn new(config_path: impl Into<PathBuf>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            template_path: template_path.into(),
        }
    }

    /// Default file names inside `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_ENV_FILE), dir.join(DEFAULT_ENV_TEMPLATE))
    }

    /// Resolves the paths from `S3_ENV_FILE` and `S3_ENV_TEMPLATE`, falling
    /// back to the defaults in the working directory
    #[must_use]
    pub fn from_source<S: VarSource + ?Sized>(source: &S) -> Self {
        Self::new(
            source
                .non_empty(ENV_FILE_VAR)
                .unwrap_or_else(|| DEFAULT_ENV_FILE.to_string()),
            source
                .non_empty(ENV_TEMPLATE_VAR)
                .unwrap_or_else(|| DEFAULT_ENV_TEMPLATE.to_string()),
        )
    }

    /// Resolves the paths from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    /// Loads the env file into the process environment. Variables that are
    /// already set are left untouched.
    ///
    /// Returns whether the file was found and loaded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file exists but cannot be read
    /// or contains a malformed line. Lines before the malformed one may
    /// already have been applied.
    pub fn load_into_process(&self) -> ConfigResult<bool> {
        match dotenvy::from_path(&self.config_path) {
            Ok(()) => {
                debug!("Loaded env file {}", self.config_path.display());
                Ok(true)
            }
            Err(e) if e.not_found() => {
                debug!("Env file {} does not exist", self.config_path.display());
                Ok(false)
            }
            Err(source) => Err(ConfigError::EnvFile {
                path: self.config_path.clone(),
                source,
            }),
        }
    }

    /// Loads the env file into the process environment, then reads the
    /// configuration from it
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` for an unreadable or malformed env file
    /// and `ConfigError::MissingVars` when required variables are unset
    pub fn load_config(&self) -> ConfigResult<S3Config> {
        self.load_into_process()?;
        S3Config::from_env()
    }
}

/// Variables read from an env file, optionally layered under the process
/// environment
#[derive(Debug, Clone, Default)]
pub struct FileVars {
    values: HashMap<String, String>,
    inherit_process: bool,
}

impl FileVars {
    /// No file values, optionally backed by the process environment
    #[must_use]
    pub fn empty(inherit_process: bool) -> Self {
        Self {
            values: HashMap::new(),
            inherit_process,
        }
    }

    /// Parses the env file at `path`. A missing file yields no values.
    ///
    /// When `inherit_process` is set, process variables take precedence over
    /// the file, matching how `dotenvy` loads files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file exists but cannot be read
    /// or contains a malformed line
    pub fn load(path: &Path, inherit_process: bool) -> ConfigResult<Self> {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                debug!("Env file {} does not exist", path.display());
                return Ok(Self::empty(inherit_process));
            }
            Err(source) => {
                return Err(ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let values = iter
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Read {} variables from {}", values.len(), path.display());

        Ok(Self {
            values,
            inherit_process,
        })
    }
}

impl VarSource for FileVars {
    fn var(&self, key: &str) -> Option<String> {
        if self.inherit_process {
            if let Some(value) = ProcessEnv.var(key) {
                return Some(value);
            }
        }
        self.values.get(key).cloned()
    }
}
