// datacop-core/src/cloud/s3.rs
//! S3-backed implementation of the [`StorageClient`] trait.

use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::PublicAccessBlockConfiguration;
use aws_sdk_s3::Client;
use log::debug;

use crate::cloud::{PublicAccessFlags, StorageClient, StorageError};

pub struct S3StorageClient {
    client: Client,
}

impl S3StorageClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        debug!("fetching object 's3://{}/{}'", bucket, key);
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Other(anyhow!(e).context("reading object body")))?;
                Ok(bytes.to_vec())
            }
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    Err(StorageError::NotFound)
                } else {
                    Err(StorageError::Other(
                        anyhow!(err).context(format!("fetching 's3://{bucket}/{key}'")),
                    ))
                }
            }
        }
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), StorageError> {
        debug!(
            "copying 's3://{}/{}' to 's3://{}/{}'",
            source_bucket, source_key, target_bucket, target_key
        );
        self.client
            .copy_object()
            .copy_source(format!("{source_bucket}/{source_key}"))
            .bucket(target_bucket)
            .key(target_key)
            .send()
            .await
            .map_err(|e| StorageError::Other(anyhow!(e).context("copying object")))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Other(anyhow!(e).context("deleting object")))?;
        debug!("deleted 's3://{}/{}'", bucket, key);
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let resp = self.client.get_bucket_policy().bucket(bucket).send().await;
        match resp {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            Err(err) => {
                // No attached policy is a normal state for an open bucket.
                if err.code() == Some("NoSuchBucketPolicy") {
                    Ok(None)
                } else {
                    Err(StorageError::Other(
                        anyhow!(err).context(format!("reading policy of bucket '{bucket}'")),
                    ))
                }
            }
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .confirm_remove_self_bucket_access(true)
            .policy(policy)
            .send()
            .await
            .map_err(|e| {
                StorageError::Other(
                    anyhow!(e).context(format!("attaching policy to bucket '{bucket}'")),
                )
            })?;
        debug!("attached policy to bucket: {}", bucket);
        Ok(())
    }

    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> Result<Option<PublicAccessFlags>, StorageError> {
        let resp = self
            .client
            .get_public_access_block()
            .bucket(bucket)
            .send()
            .await;
        match resp {
            Ok(output) => {
                let flags = output
                    .public_access_block_configuration()
                    .map(|pab| PublicAccessFlags {
                        block_public_acls: pab.block_public_acls().unwrap_or(false),
                        ignore_public_acls: pab.ignore_public_acls().unwrap_or(false),
                        block_public_policy: pab.block_public_policy().unwrap_or(false),
                        restrict_public_buckets: pab.restrict_public_buckets().unwrap_or(false),
                    });
                Ok(flags)
            }
            Err(err) => {
                if err.code() == Some("NoSuchPublicAccessBlockConfiguration") {
                    Ok(None)
                } else {
                    Err(StorageError::Other(anyhow!(err).context(format!(
                        "reading public access block of bucket '{bucket}'"
                    ))))
                }
            }
        }
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        flags: PublicAccessFlags,
    ) -> Result<(), StorageError> {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(flags.block_public_acls)
            .ignore_public_acls(flags.ignore_public_acls)
            .block_public_policy(flags.block_public_policy)
            .restrict_public_buckets(flags.restrict_public_buckets)
            .build();

        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(|e| {
                StorageError::Other(
                    anyhow!(e).context(format!("blocking public access to bucket '{bucket}'")),
                )
            })?;
        debug!("blocked public access to bucket: {}", bucket);
        Ok(())
    }
}
