//! S3 configuration loaded from environment variables

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// Region assumed when `AWS_REGION` is unset, and the region S3 reports as an
/// empty location constraint
pub const DEFAULT_REGION: &str = "us-east-1";

/// Optional override for S3-compatible endpoints (`LocalStack`, `MinIO`)
pub const ENDPOINT_URL_VAR: &str = "AWS_ENDPOINT_URL";

/// Variables that are reported when set but never required, with a short
/// description of each
pub const OPTIONAL_VARS: [(&str, &str); 1] = [(
    ENDPOINT_URL_VAR,
    "S3-compatible endpoint such as LocalStack or MinIO",
)];

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required variables are absent or empty
    #[error("Missing required environment variables: {}", join_vars(.0))]
    MissingVars(Vec<RequiredVar>),

    /// The env file exists but could not be read or parsed
    #[error("Failed to read env file {}: {source}", .path.display())]
    EnvFile {
        /// Path of the env file
        path: PathBuf,
        /// Underlying parse or I/O error
        #[source]
        source: dotenvy::Error,
    },
}

fn join_vars(vars: &[RequiredVar]) -> String {
    vars.iter()
        .map(|var| var.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables the tools need to reach the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum RequiredVar {
    /// Access key id of the IAM user
    #[strum(serialize = "AWS_ACCESS_KEY_ID")]
    AccessKeyId,
    /// Secret access key of the IAM user
    #[strum(serialize = "AWS_SECRET_ACCESS_KEY")]
    SecretAccessKey,
    /// Region the client signs requests for
    #[strum(serialize = "AWS_REGION")]
    Region,
    /// Bucket under test
    #[strum(serialize = "S3_BUCKET_NAME")]
    BucketName,
}

impl RequiredVar {
    /// Environment variable name
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Variables that must be set before the connectivity check can build a
    /// client. The region falls back to [`DEFAULT_REGION`].
    #[must_use]
    pub const fn connectivity() -> [Self; 3] {
        [Self::AccessKeyId, Self::SecretAccessKey, Self::BucketName]
    }

    /// Every variable the setup script asks the operator for
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Lookup of configuration values by variable name
pub trait VarSource {
    /// Raw value of `key`, if set
    fn var(&self, key: &str) -> Option<String>;

    /// Value of `key`, treating an empty string as unset
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.is_empty())
    }
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Returns the variables in `required` that `source` has absent or empty,
/// in the order given
pub fn missing_vars<S, I>(source: &S, required: I) -> Vec<RequiredVar>
where
    S: VarSource + ?Sized,
    I: IntoIterator<Item = RequiredVar>,
{
    required
        .into_iter()
        .filter(|var| source.non_empty(var.name()).is_none())
        .collect()
}

/// Credentials and target bucket for the connectivity check
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region the client is configured for
    pub region: String,
    /// Bucket under test
    pub bucket_name: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
}

impl S3Config {
    /// Loads the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVars` if the access key, secret or bucket
    /// name is absent or empty
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    /// Loads the configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVars` listing every required variable
    /// that is absent or empty
    pub fn from_source<S: VarSource + ?Sized>(source: &S) -> ConfigResult<Self> {
        let missing = missing_vars(source, RequiredVar::connectivity());
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let required = |var: RequiredVar| source.non_empty(var.name()).unwrap_or_default();

        Ok(Self {
            access_key_id: required(RequiredVar::AccessKeyId),
            secret_access_key: required(RequiredVar::SecretAccessKey),
            region: source
                .non_empty(RequiredVar::Region.name())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket_name: required(RequiredVar::BucketName),
            endpoint_url: source.non_empty(ENDPOINT_URL_VAR),
        })
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key_id", &mask(&self.access_key_id))
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Keeps the first four characters of a key id and masks the rest
#[must_use]
pub fn mask(value: &str) -> String {
    const VISIBLE: usize = 4;

    let len = value.chars().count();
    if len <= VISIBLE {
        return "*".repeat(len);
    }

    value
        .chars()
        .take(VISIBLE)
        .chain(std::iter::repeat_n('*', len - VISIBLE))
        .collect()
}
