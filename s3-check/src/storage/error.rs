//! Error types for storage capability calls

use std::error::Error as StdError;

use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Result type for storage capability calls
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by the storage capability interface
///
/// Provider error codes are mapped onto variants once, at the SDK boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The access key id is unknown to the provider
    #[error("InvalidAccessKeyId: {0}")]
    InvalidAccessKeyId(String),

    /// The request signature did not match, usually a wrong secret
    #[error("SignatureDoesNotMatch: {0}")]
    SignatureDoesNotMatch(String),

    /// The credentials lack permission for the operation
    #[error("AccessDenied: {0}")]
    AccessDenied(String),

    /// The bucket does not exist
    #[error("NoSuchBucket: {0}")]
    NoSuchBucket(String),

    /// Any other provider error code
    #[error("{code}: {message}")]
    Service {
        /// Provider error code, or the HTTP status when none was sent
        code: String,
        /// Provider error message
        message: String,
    },

    /// No credentials could be resolved for the request
    #[error("No credentials found: {0}")]
    NoCredentials(String),

    /// Transport, timeout or other failure outside the provider's error model
    #[error("{0}")]
    Unexpected(String),
}

impl StorageError {
    /// Maps a provider error code to its variant
    #[must_use]
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId(message),
            "SignatureDoesNotMatch" => Self::SignatureDoesNotMatch(message),
            "AccessDenied" => Self::AccessDenied(message),
            "NoSuchBucket" => Self::NoSuchBucket(message),
            _ => Self::Service {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Provider error code, if the error came back from the service
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::InvalidAccessKeyId(_) => Some("InvalidAccessKeyId"),
            Self::SignatureDoesNotMatch(_) => Some("SignatureDoesNotMatch"),
            Self::AccessDenied(_) => Some("AccessDenied"),
            Self::NoSuchBucket(_) => Some("NoSuchBucket"),
            Self::Service { code, .. } => Some(code),
            Self::NoCredentials(_) | Self::Unexpected(_) => None,
        }
    }
}

impl<E> From<SdkError<E>> for StorageError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    fn from(error: SdkError<E>) -> Self {
        if caused_by_credentials(&error) {
            return Self::NoCredentials(DisplayErrorContext(&error).to_string());
        }

        match &error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let message = err.message().unwrap_or_default();
                match err.code() {
                    Some(code) => Self::from_code(code, message),
                    None => Self::Service {
                        code: service_err.raw().status().as_u16().to_string(),
                        message: message.to_string(),
                    },
                }
            }
            _ => Self::Unexpected(DisplayErrorContext(&error).to_string()),
        }
    }
}

/// Walks the source chain looking for a credentials provider failure
fn caused_by_credentials(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.downcast_ref::<CredentialsError>().is_some() {
            return true;
        }
        current = err.source();
    }
    false
}
