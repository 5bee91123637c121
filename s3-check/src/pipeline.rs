//! Ordered connectivity checks against the configured bucket
//!
//! 1. credentials: list buckets, then look for the configured bucket
//! 2. listing: list at most one object in the bucket
//! 3. write/delete: upload a marker object and delete it again
//! 4. region: compare the bucket location with the configured region
//!
//! The first failure among checks 1-3 ends the run. Check 4 only warns.

use std::io::Write;

use s3_common::{Outcome, Reporter, S3Config, DEFAULT_REGION};
use strum::Display;
use tracing::{debug, info, warn};

use crate::storage::{ObjectStorage, StorageError};

/// Key of the marker object written by the write/delete check
pub const TEST_OBJECT_KEY: &str = "test-connection.txt";
/// Content type of the marker object
pub const TEST_OBJECT_CONTENT_TYPE: &str = "text/plain";
/// Body of the marker object
pub const TEST_OBJECT_BODY: &str = "This is a test file created by the S3 connection test.";
/// Page size of the listing check
const LIST_MAX_KEYS: i32 = 1;

/// The checks, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Check {
    /// Credentials are accepted and the bucket is visible
    Credentials,
    /// Objects in the bucket can be listed
    Listing,
    /// Objects can be uploaded and deleted
    WriteDelete,
    /// The bucket lives in the configured region
    Region,
}

/// Outcome of one check with the reason shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Which check produced this result
    pub check: Check,
    /// Pass, warn or fail
    pub outcome: Outcome,
    /// Human readable reason
    pub reason: String,
}

/// Why the run ended without passing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A check failed and reported its reason
    Check(Check),
    /// No credentials could be resolved at all
    NoCredentials(String),
    /// Anything the checks do not classify
    Unexpected(String),
}

/// Results of a full run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityReport {
    results: Vec<CheckResult>,
    failure: Option<Failure>,
}

impl ConnectivityReport {
    /// Whether checks 1-3 all passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Every recorded result, in order
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Why the run failed, if it did
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Results recorded for `check`
    pub fn results_for(&self, check: Check) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(move |result| result.check == check)
    }

    /// Whether any result carries a warning
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.results
            .iter()
            .any(|result| result.outcome == Outcome::Warn)
    }
}

/// Runs the checks with one shared storage client
pub struct ConnectivityCheck<'a, S: ?Sized> {
    storage: &'a S,
    config: &'a S3Config,
}

impl<'a, S: ObjectStorage + ?Sized> ConnectivityCheck<'a, S> {
    /// Creates a pipeline for `config` using `storage`
    #[must_use]
    pub const fn new(storage: &'a S, config: &'a S3Config) -> Self {
        Self { storage, config }
    }

    /// Runs every check in order and prints the outcome of each
    pub async fn run<W: Write + Send>(&self, reporter: &mut Reporter<W>) -> ConnectivityReport {
        info!("Running connectivity checks against {}", self.config.bucket_name);
        reporter.progress("Testing AWS S3 connection...");

        let mut session = Session {
            reporter,
            results: Vec::new(),
        };

        let outcome = self.run_checks(&mut session).await;

        let failure = match outcome {
            Ok(()) => {
                session.reporter.blank();
                session
                    .reporter
                    .note("🎉", "All S3 tests passed! Your bucket is ready to use.");
                None
            }
            Err(Abort::Reported(check)) => Some(Failure::Check(check)),
            Err(Abort::Storage(check, StorageError::NoCredentials(message))) => {
                session.record(check, Outcome::Fail, "No AWS credentials found".to_string());
                session.reporter.detail(
                    "Make sure your .env file has AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY",
                );
                Some(Failure::NoCredentials(message))
            }
            Err(Abort::Storage(check, other)) => {
                session.record(check, Outcome::Fail, format!("Unexpected error: {other}"));
                Some(Failure::Unexpected(other.to_string()))
            }
        };

        let Session { results, .. } = session;

        if let Some(failure) = &failure {
            warn!("Connectivity check failed: {failure:?}");
        }

        ConnectivityReport { results, failure }
    }

    async fn run_checks<W: Write + Send>(&self, session: &mut Session<'_, W>) -> Result<(), Abort> {
        self.check_credentials(session).await?;
        self.check_listing(session).await?;
        self.check_write_delete(session).await?;
        self.check_region(session).await;
        Ok(())
    }

    async fn check_credentials<W: Write + Send>(
        &self,
        session: &mut Session<'_, W>,
    ) -> Result<(), Abort> {
        let bucket = &self.config.bucket_name;
        session.reporter.progress("Validating AWS credentials...");

        let buckets = match self.storage.list_buckets().await {
            Ok(buckets) => buckets,
            Err(error) => {
                let reason = match error {
                    StorageError::InvalidAccessKeyId(_) => "Invalid AWS Access Key ID".to_string(),
                    StorageError::SignatureDoesNotMatch(_) => {
                        "Invalid AWS Secret Access Key".to_string()
                    }
                    StorageError::AccessDenied(_)
                    | StorageError::NoSuchBucket(_)
                    | StorageError::Service { .. } => {
                        format!("AWS credentials error: {}", error.code().unwrap_or_default())
                    }
                    StorageError::NoCredentials(_) | StorageError::Unexpected(_) => {
                        return Err(Abort::Storage(Check::Credentials, error))
                    }
                };
                return Err(session.fail(Check::Credentials, reason));
            }
        };

        session.reporter.status(Outcome::Pass, "AWS credentials are valid");

        if buckets.iter().any(|name| name == bucket) {
            session.pass(Check::Credentials, format!("Bucket '{bucket}' exists"));
            return Ok(());
        }

        let abort = session.fail(Check::Credentials, format!("Bucket '{bucket}' not found"));
        session.reporter.detail("Available buckets:");
        for name in &buckets {
            session.reporter.detail(format_args!("- {name}"));
        }
        Err(abort)
    }

    async fn check_listing<W: Write + Send>(&self, session: &mut Session<'_, W>) -> Result<(), Abort> {
        let bucket = &self.config.bucket_name;
        session.reporter.progress("Testing bucket permissions...");

        match self.storage.list_objects(bucket, LIST_MAX_KEYS).await {
            Ok(listing) => {
                debug!("Listing returned keys {:?}", listing.keys);
                session.pass(Check::Listing, "Can list bucket contents");
                session.reporter.note(
                    "📊",
                    format_args!("Current objects in bucket: {}", listing.key_count),
                );
                Ok(())
            }
            Err(error) => {
                let reason = match error {
                    StorageError::AccessDenied(_) => {
                        "Access denied to bucket - check IAM permissions".to_string()
                    }
                    StorageError::NoSuchBucket(_) => format!("Bucket '{bucket}' does not exist"),
                    StorageError::InvalidAccessKeyId(_)
                    | StorageError::SignatureDoesNotMatch(_)
                    | StorageError::Service { .. } => {
                        format!("Bucket access error: {}", error.code().unwrap_or_default())
                    }
                    StorageError::NoCredentials(_) | StorageError::Unexpected(_) => {
                        return Err(Abort::Storage(Check::Listing, error))
                    }
                };
                Err(session.fail(Check::Listing, reason))
            }
        }
    }

    async fn check_write_delete<W: Write + Send>(
        &self,
        session: &mut Session<'_, W>,
    ) -> Result<(), Abort> {
        let bucket = &self.config.bucket_name;
        session.reporter.progress("Testing upload permissions...");

        if let Err(error) = self
            .storage
            .put_object(
                bucket,
                TEST_OBJECT_KEY,
                TEST_OBJECT_BODY.as_bytes().to_vec(),
                TEST_OBJECT_CONTENT_TYPE,
            )
            .await
        {
            let reason = match error {
                StorageError::AccessDenied(_) => {
                    "No upload permissions - check IAM policy".to_string()
                }
                StorageError::InvalidAccessKeyId(_)
                | StorageError::SignatureDoesNotMatch(_)
                | StorageError::NoSuchBucket(_)
                | StorageError::Service { .. } => {
                    format!("Upload test error: {}", error.code().unwrap_or_default())
                }
                StorageError::NoCredentials(_) | StorageError::Unexpected(_) => {
                    return Err(Abort::Storage(Check::WriteDelete, error))
                }
            };
            return Err(session.fail(Check::WriteDelete, reason));
        }

        session.pass(Check::WriteDelete, "Can upload files to bucket");

        match self.storage.delete_object(bucket, TEST_OBJECT_KEY).await {
            Ok(()) => session.pass(Check::WriteDelete, "Can delete files from bucket"),
            Err(error) => {
                session.warn(
                    Check::WriteDelete,
                    format!("Cleanup failed, could not delete test object: {error}"),
                );
                session.reporter.detail(format_args!(
                    "Delete '{TEST_OBJECT_KEY}' from bucket '{bucket}' manually"
                ));
            }
        }

        Ok(())
    }

    async fn check_region<W: Write + Send>(&self, session: &mut Session<'_, W>) {
        let bucket = &self.config.bucket_name;
        let configured = &self.config.region;
        session.reporter.progress("Checking bucket region...");

        match self.storage.bucket_location(bucket).await {
            Ok(location) => {
                let bucket_region = location.unwrap_or_else(|| DEFAULT_REGION.to_string());
                if &bucket_region == configured {
                    session.pass(
                        Check::Region,
                        format!("Bucket region matches configuration: {bucket_region}"),
                    );
                } else {
                    session.warn(
                        Check::Region,
                        format!(
                            "Bucket region ({bucket_region}) differs from configuration ({configured})"
                        ),
                    );
                    session
                        .reporter
                        .detail("This may cause slower performance but should still work");
                }
            }
            Err(error) => {
                let detail = error.code().map_or_else(|| error.to_string(), str::to_string);
                session.warn(
                    Check::Region,
                    format!("Could not check bucket region: {detail}"),
                );
            }
        }
    }
}

/// Why the checks stopped early
enum Abort {
    /// A check classified the failure and already printed it
    Reported(Check),
    /// An error outside the checks' classification, raised while `Check` ran
    Storage(Check, StorageError),
}

/// Reporter plus the results recorded so far
struct Session<'r, W> {
    reporter: &'r mut Reporter<W>,
    results: Vec<CheckResult>,
}

impl<W: Write> Session<'_, W> {
    fn record(&mut self, check: Check, outcome: Outcome, reason: String) {
        self.reporter.status(outcome, &reason);
        self.results.push(CheckResult {
            check,
            outcome,
            reason,
        });
    }

    fn pass(&mut self, check: Check, reason: impl Into<String>) {
        self.record(check, Outcome::Pass, reason.into());
    }

    fn warn(&mut self, check: Check, reason: impl Into<String>) {
        self.record(check, Outcome::Warn, reason.into());
    }

    fn fail(&mut self, check: Check, reason: impl Into<String>) -> Abort {
        self.record(check, Outcome::Fail, reason.into());
        Abort::Reported(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::{Call, MockObjectStorage};
    use crate::storage::ObjectListing;
    use pretty_assertions::assert_eq;

    fn config() -> S3Config {
        S3Config {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            bucket_name: "my-bucket".to_string(),
            endpoint_url: None,
        }
    }

    async fn run(storage: &MockObjectStorage) -> (ConnectivityReport, String) {
        let config = config();
        let mut reporter = Reporter::new(Vec::new());
        let report = ConnectivityCheck::new(storage, &config)
            .run(&mut reporter)
            .await;
        (report, String::from_utf8(reporter.into_inner()).unwrap())
    }

    #[test]
    fn test_check_names() {
        assert_eq!(Check::Credentials.to_string(), "credentials");
        assert_eq!(Check::WriteDelete.to_string(), "write-delete");
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let storage = MockObjectStorage::new()
            .with_buckets(["other", "my-bucket"])
            .with_listing(ObjectListing {
                key_count: 1,
                keys: vec!["a.txt".to_string()],
            })
            .with_location(None);

        let (report, output) = run(&storage).await;

        assert!(report.passed());
        assert!(!report.has_warnings());
        assert_eq!(report.results().len(), 5);
        assert!(output.contains("📊 Current objects in bucket: 1"));
        assert!(output.contains("Bucket region matches configuration: us-east-1"));
        assert!(output.contains("All S3 tests passed"));
        assert_eq!(
            storage.calls(),
            vec![
                Call::ListBuckets,
                Call::ListObjects {
                    bucket: "my-bucket".to_string(),
                    max_keys: 1
                },
                Call::PutObject {
                    bucket: "my-bucket".to_string(),
                    key: TEST_OBJECT_KEY.to_string(),
                    content_type: "text/plain".to_string()
                },
                Call::DeleteObject {
                    bucket: "my-bucket".to_string(),
                    key: TEST_OBJECT_KEY.to_string()
                },
                Call::BucketLocation {
                    bucket: "my-bucket".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_signature_mismatch_reports_invalid_secret() {
        let storage = MockObjectStorage::new().with_list_buckets_error(
            StorageError::SignatureDoesNotMatch("signature mismatch".to_string()),
        );

        let (report, output) = run(&storage).await;

        assert!(!report.passed());
        assert_eq!(report.failure(), Some(&Failure::Check(Check::Credentials)));
        assert!(output.contains("❌ Invalid AWS Secret Access Key"));
        assert_eq!(storage.calls(), vec![Call::ListBuckets]);
    }

    #[tokio::test]
    async fn test_other_credential_code_is_generic() {
        let storage = MockObjectStorage::new()
            .with_list_buckets_error(StorageError::from_code("ExpiredToken", "expired"));

        let (report, output) = run(&storage).await;

        assert!(!report.passed());
        assert!(output.contains("❌ AWS credentials error: ExpiredToken"));
    }

    #[tokio::test]
    async fn test_listing_failures_are_classified() {
        let cases = [
            (
                StorageError::AccessDenied(String::new()),
                "Access denied to bucket - check IAM permissions",
            ),
            (
                StorageError::NoSuchBucket(String::new()),
                "Bucket 'my-bucket' does not exist",
            ),
            (
                StorageError::from_code("InternalError", ""),
                "Bucket access error: InternalError",
            ),
        ];

        for (error, expected) in cases {
            let storage = MockObjectStorage::new()
                .with_buckets(["my-bucket"])
                .with_list_objects_error(error);

            let (report, output) = run(&storage).await;

            assert_eq!(report.failure(), Some(&Failure::Check(Check::Listing)));
            assert!(output.contains(expected), "missing {expected:?} in {output}");
            assert_eq!(storage.calls().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_upload_denied_stops_without_cleanup() {
        let storage = MockObjectStorage::new()
            .with_buckets(["my-bucket"])
            .with_put_error(StorageError::AccessDenied(String::new()));

        let (report, output) = run(&storage).await;

        assert_eq!(report.failure(), Some(&Failure::Check(Check::WriteDelete)));
        assert!(output.contains("❌ No upload permissions - check IAM policy"));
        assert!(!storage
            .calls()
            .iter()
            .any(|call| matches!(call, Call::DeleteObject { .. })));
    }

    #[tokio::test]
    async fn test_delete_failure_warns_and_continues() {
        let storage = MockObjectStorage::new()
            .with_buckets(["my-bucket"])
            .with_delete_error(StorageError::AccessDenied("denied".to_string()))
            .with_location(Some("us-east-1"));

        let (report, output) = run(&storage).await;

        assert!(report.passed());
        assert!(report.has_warnings());
        assert!(output.contains("Cleanup failed"));
        assert!(output.contains("Delete 'test-connection.txt' from bucket 'my-bucket' manually"));
        assert!(storage
            .calls()
            .contains(&Call::BucketLocation {
                bucket: "my-bucket".to_string()
            }));
    }

    #[tokio::test]
    async fn test_region_error_degrades_to_warning() {
        let storage = MockObjectStorage::new()
            .with_buckets(["my-bucket"])
            .with_location_error(StorageError::AccessDenied(String::new()));

        let (report, output) = run(&storage).await;

        assert!(report.passed());
        let region: Vec<_> = report.results_for(Check::Region).collect();
        assert_eq!(region.len(), 1);
        assert_eq!(region[0].outcome, Outcome::Warn);
        assert!(output.contains("Could not check bucket region: AccessDenied"));
    }

    #[tokio::test]
    async fn test_no_credentials_has_its_own_message() {
        let storage = MockObjectStorage::new()
            .with_list_buckets_error(StorageError::NoCredentials("chain empty".to_string()));

        let (report, output) = run(&storage).await;

        assert_eq!(
            report.failure(),
            Some(&Failure::NoCredentials("chain empty".to_string()))
        );
        assert!(output.contains("❌ No AWS credentials found"));
        assert_eq!(
            report.results(),
            &[CheckResult {
                check: Check::Credentials,
                outcome: Outcome::Fail,
                reason: "No AWS credentials found".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unexpected_error_mid_pipeline() {
        let storage = MockObjectStorage::new()
            .with_buckets(["my-bucket"])
            .with_put_error(StorageError::Unexpected("connection reset".to_string()));

        let (report, output) = run(&storage).await;

        assert_eq!(
            report.failure(),
            Some(&Failure::Unexpected("connection reset".to_string()))
        );
        assert!(output.contains("❌ Unexpected error: connection reset"));

        let write: Vec<_> = report.results_for(Check::WriteDelete).collect();
        assert_eq!(write.len(), 1);
        assert_eq!(write[0].outcome, Outcome::Fail);
        assert_eq!(write[0].reason, "Unexpected error: connection reset");
    }

    #[tokio::test]
    async fn test_unexpected_listing_error_records_listing_failure() {
        let storage = MockObjectStorage::new()
            .with_buckets(["my-bucket"])
            .with_list_objects_error(StorageError::Unexpected("dispatch failure".to_string()));

        let (report, _) = run(&storage).await;

        let last = report.results().last().unwrap();
        assert_eq!(last.check, Check::Listing);
        assert_eq!(last.outcome, Outcome::Fail);
        assert_eq!(report.results_for(Check::WriteDelete).count(), 0);
    }
}
