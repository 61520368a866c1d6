// datacop-core/src/cloud.rs
//! Collaborator traits for the remote cloud services the workflow touches.
//!
//! The workflow never talks to the AWS SDK directly; it goes through these
//! traits so every component can be exercised against in-process fakes. The
//! concrete SDK-backed implementations live in the `s3`, `ssm`, and `sns`
//! submodules. A [`CloudContext`] bundles one client per service and is
//! constructed once per execution, then passed by reference to each
//! component: an explicit dependency, not ambient global state.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod s3;
pub mod sns;
pub mod ssm;

/// Errors surfaced by [`StorageClient`] operations.
///
/// `NotFound` is split out because several callers treat absence as a normal
/// condition (a missing artifact is "no finding", a missing bucket policy is
/// "not denied") while every other transport failure propagates.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object or configuration not found")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The four public-access-block flags on a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublicAccessFlags {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessFlags {
    /// The fully restrictive configuration a lockdown writes.
    pub fn fully_restricted() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }

    /// True only when all four flags are set.
    pub fn is_fully_restricted(&self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }
}

/// Object storage operations used by the workflow.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Fetches the raw bytes of an object. `StorageError::NotFound` when the
    /// key does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Server-side copy from one bucket to another.
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), StorageError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Reads the bucket policy document. `Ok(None)` when no policy is
    /// attached; that is a normal state, not an error.
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the bucket policy. Writing the same document twice is a
    /// no-op at the remote API level.
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError>;

    /// Reads the public-access-block configuration. `Ok(None)` when none is
    /// configured.
    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> Result<Option<PublicAccessFlags>, StorageError>;

    async fn put_public_access_block(
        &self,
        bucket: &str,
        flags: PublicAccessFlags,
    ) -> Result<(), StorageError>;
}

/// Read access to the deployment's key-value parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Pub/sub channel listing and publishing for operator notifications.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// Returns the ARNs of all existing topics.
    async fn list_topics(&self) -> Result<Vec<String>>;

    /// Publishes a message and returns the delivery id.
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String>;
}

/// One client per remote service, built once per execution.
#[derive(Clone)]
pub struct CloudContext {
    pub storage: Arc<dyn StorageClient>,
    pub parameters: Arc<dyn ParameterStore>,
    pub topics: Arc<dyn TopicPublisher>,
}

impl CloudContext {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        parameters: Arc<dyn ParameterStore>,
        topics: Arc<dyn TopicPublisher>,
    ) -> Self {
        Self {
            storage,
            parameters,
            topics,
        }
    }

    /// Builds SDK-backed clients from the ambient AWS environment
    /// (credentials chain, region). Called once per execution.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            storage: Arc::new(s3::S3StorageClient::new(aws_sdk_s3::Client::new(&config))),
            parameters: Arc::new(ssm::SsmParameterStore::new(aws_sdk_ssm::Client::new(&config))),
            topics: Arc::new(sns::SnsTopicPublisher::new(aws_sdk_sns::Client::new(&config))),
        }
    }
}
