//! AWS S3 implementation of the storage capabilities

use std::sync::Arc;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use s3_common::S3Config;
use tracing::{debug, error, info};

use super::{ObjectListing, ObjectStorage, StorageError, StorageResult};

/// Provider name attached to the static credentials
const CREDENTIALS_PROVIDER_NAME: &str = "s3-setup-env";
/// Upper bound for a single capability call
const OPERATION_TIMEOUT_SECS: u64 = 30;

/// Builds the S3 client configuration from the operator's credentials
///
/// Every call is attempted exactly once. Path-style addressing is forced
/// when a custom endpoint is configured, for `LocalStack` and `MinIO`.
pub async fn s3_client_config(config: &S3Config) -> aws_sdk_s3::Config {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    let timeout_config = TimeoutConfig::builder()
        .operation_timeout(Duration::from_secs(OPERATION_TIMEOUT_SECS))
        .build();

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials)
        .retry_config(RetryConfig::disabled())
        .timeout_config(timeout_config);

    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }

    let sdk_config = loader.load().await;
    let s3_config: aws_sdk_s3::Config = (&sdk_config).into();
    let mut builder = s3_config.to_builder();

    // https://github.com/awslabs/aws-sdk-rust/discussions/874
    if config.endpoint_url.is_some() {
        builder.set_force_path_style(Some(true));
    }

    builder.build()
}

/// Storage client backed by the AWS SDK
pub struct S3ObjectStorage {
    s3_client: Arc<S3Client>,
}

impl S3ObjectStorage {
    /// Wraps a pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }

    /// Builds a client for the given configuration
    pub async fn from_config(config: &S3Config) -> Self {
        let s3_client = S3Client::from_conf(s3_client_config(config).await);

        info!(
            "Initialized S3 client for bucket {} in {}",
            config.bucket_name, config.region
        );

        Self::new(Arc::new(s3_client))
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        debug!("Listing buckets");

        let response = self
            .s3_client
            .list_buckets()
            .send()
            .await
            .map_err(|e| {
                error!("Failed to list buckets: {e}");
                StorageError::from(e)
            })?;

        let names: Vec<String> = response
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name())
            .map(str::to_string)
            .collect();

        debug!("Found {} buckets", names.len());
        Ok(names)
    }

    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<ObjectListing> {
        debug!("Listing up to {max_keys} objects in {bucket}");

        let response = self
            .s3_client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to list objects in {bucket}: {e}");
                StorageError::from(e)
            })?;

        Ok(ObjectListing {
            key_count: response.key_count().unwrap_or_default(),
            keys: response
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .map(str::to_string)
                .collect(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {bucket}/{key}", body.len());

        self.s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to upload {bucket}/{key}: {e}");
                StorageError::from(e)
            })?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        debug!("Deleting {bucket}/{key}");

        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to delete {bucket}/{key}: {e}");
                StorageError::from(e)
            })?;

        Ok(())
    }

    async fn bucket_location(&self, bucket: &str) -> StorageResult<Option<String>> {
        debug!("Fetching location of {bucket}");

        let response = self
            .s3_client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to get location of {bucket}: {e}");
                StorageError::from(e)
            })?;

        Ok(response
            .location_constraint()
            .map(|constraint| constraint.as_str().to_string())
            .filter(|location| !location.is_empty()))
    }
}
