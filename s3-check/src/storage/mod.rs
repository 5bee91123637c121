//! Object storage capability interface
mod error;
mod s3;

pub use error::{StorageError, StorageResult};
pub use s3::{s3_client_config, S3ObjectStorage};

/// Result of a bounded object listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Number of keys the provider reports for this page
    pub key_count: i32,
    /// Keys returned in this page
    pub keys: Vec<String>,
}

/// Capability calls the connectivity check issues against a bucket
///
/// # Errors
///
/// Every call returns a classified `StorageError` when the provider rejects
/// it or the request does not complete.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Lists the names of every bucket visible to the credentials
    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// Lists at most `max_keys` objects in `bucket`
    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<ObjectListing>;

    /// Uploads `body` under `key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Deletes `key`
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Returns the bucket's location constraint. `None` when the provider
    /// sends an empty constraint.
    async fn bucket_location(&self, bucket: &str) -> StorageResult<Option<String>>;
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs, clippy::missing_panics_doc)]
pub mod mock {
    use std::sync::Mutex;

    use super::{ObjectListing, ObjectStorage, StorageError, StorageResult};

    /// Capability call recorded by [`MockObjectStorage`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        ListBuckets,
        ListObjects { bucket: String, max_keys: i32 },
        PutObject {
            bucket: String,
            key: String,
            content_type: String,
        },
        DeleteObject { bucket: String, key: String },
        BucketLocation { bucket: String },
    }

    /// Scripted storage client. Every capability succeeds with a default
    /// response until overridden.
    #[derive(Debug, Default)]
    pub struct MockObjectStorage {
        buckets: Option<StorageResult<Vec<String>>>,
        listing: Option<StorageResult<ObjectListing>>,
        put: Option<StorageError>,
        delete: Option<StorageError>,
        location: Option<StorageResult<Option<String>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockObjectStorage {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_buckets<I, T>(mut self, names: I) -> Self
        where
            I: IntoIterator<Item = T>,
            T: Into<String>,
        {
            self.buckets = Some(Ok(names.into_iter().map(Into::into).collect()));
            self
        }

        #[must_use]
        pub fn with_list_buckets_error(mut self, error: StorageError) -> Self {
            self.buckets = Some(Err(error));
            self
        }

        #[must_use]
        pub fn with_listing(mut self, listing: ObjectListing) -> Self {
            self.listing = Some(Ok(listing));
            self
        }

        #[must_use]
        pub fn with_list_objects_error(mut self, error: StorageError) -> Self {
            self.listing = Some(Err(error));
            self
        }

        #[must_use]
        pub fn with_put_error(mut self, error: StorageError) -> Self {
            self.put = Some(error);
            self
        }

        #[must_use]
        pub fn with_delete_error(mut self, error: StorageError) -> Self {
            self.delete = Some(error);
            self
        }

        #[must_use]
        pub fn with_location(mut self, location: Option<&str>) -> Self {
            self.location = Some(Ok(location.map(str::to_string)));
            self
        }

        #[must_use]
        pub fn with_location_error(mut self, error: StorageError) -> Self {
            self.location = Some(Err(error));
            self
        }

        /// Capability calls received so far, in order
        ///
        /// # Panics
        ///
        /// Panics if the call log mutex is poisoned
        #[must_use]
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("call log poisoned").clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().expect("call log poisoned").push(call);
        }
    }

    #[async_trait::async_trait]
    impl ObjectStorage for MockObjectStorage {
        async fn list_buckets(&self) -> StorageResult<Vec<String>> {
            self.record(Call::ListBuckets);
            self.buckets.clone().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<ObjectListing> {
            self.record(Call::ListObjects {
                bucket: bucket.to_string(),
                max_keys,
            });
            self.listing
                .clone()
                .unwrap_or_else(|| Ok(ObjectListing::default()))
        }

        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            _body: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<()> {
            self.record(Call::PutObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
            });
            self.put.clone().map_or(Ok(()), Err)
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
            self.record(Call::DeleteObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
            self.delete.clone().map_or(Ok(()), Err)
        }

        async fn bucket_location(&self, bucket: &str) -> StorageResult<Option<String>> {
            self.record(Call::BucketLocation {
                bucket: bucket.to_string(),
            });
            self.location.clone().unwrap_or(Ok(None))
        }
    }
}
