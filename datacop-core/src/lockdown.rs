// datacop-core/src/lockdown.rs
//! Bucket protection status checks and lockdown enforcement.
//!
//! A bucket counts as locked down only when *both* protections are in place:
//! the canonical deny-all policy (compared byte-for-byte against the
//! templated document) and a fully restrictive public-access-block. Neither
//! alone is sufficient. Enforcement writes both, is safe to repeat, and
//! attempts the second write even when the first fails so a partial apply
//! never goes unnoticed.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cloud::{CloudContext, PublicAccessFlags, StorageError};
use crate::config::RemediationConfig;
use crate::errors::DataCopError;
use crate::policy::deny_all_policy;

/// Live protection state of a bucket, recomputed on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProtectionState {
    pub resource_id: String,
    pub is_policy_denied: bool,
    pub is_public_access_blocked: bool,
}

impl ResourceProtectionState {
    /// Both conditions are required; neither alone is sufficient.
    pub fn is_blocked(&self) -> bool {
        self.is_policy_denied && self.is_public_access_blocked
    }
}

/// Result of a lockdown attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockdownResult {
    pub applied: bool,
}

/// Queries whether a bucket is already locked down, to avoid duplicate work.
pub struct ProtectionStatusChecker<'a> {
    cloud: &'a CloudContext,
    config: &'a RemediationConfig,
}

impl<'a> ProtectionStatusChecker<'a> {
    pub fn new(cloud: &'a CloudContext, config: &'a RemediationConfig) -> Self {
        Self { cloud, config }
    }

    /// Issues the two independent read queries and returns their conjunction
    /// material. Absence of a policy or of a public-access-block
    /// configuration is `false`, never an error. No side effects.
    pub async fn check(&self, bucket: &str) -> Result<ResourceProtectionState, DataCopError> {
        let expected =
            serialized_deny_all_policy(bucket, &self.config.trusted_principals)?;

        let is_policy_denied = match self.cloud.storage.get_bucket_policy(bucket).await {
            Ok(Some(policy)) => policy == expected,
            Ok(None) | Err(StorageError::NotFound) => false,
            Err(StorageError::Other(err)) => return Err(DataCopError::AnyhowWrapper(err)),
        };

        let is_public_access_blocked = match self.cloud.storage.get_public_access_block(bucket).await
        {
            Ok(Some(flags)) => flags.is_fully_restricted(),
            Ok(None) | Err(StorageError::NotFound) => false,
            Err(StorageError::Other(err)) => return Err(DataCopError::AnyhowWrapper(err)),
        };

        let state = ResourceProtectionState {
            resource_id: bucket.to_string(),
            is_policy_denied,
            is_public_access_blocked,
        };
        debug!(
            "protection status of bucket '{}': policy_denied={}, public_access_blocked={}",
            bucket, state.is_policy_denied, state.is_public_access_blocked
        );
        Ok(state)
    }
}

/// Applies the deny-all policy and public-access-block to a bucket.
pub struct LockdownEnforcer<'a> {
    cloud: &'a CloudContext,
    config: &'a RemediationConfig,
}

impl<'a> LockdownEnforcer<'a> {
    pub fn new(cloud: &'a CloudContext, config: &'a RemediationConfig) -> Self {
        Self { cloud, config }
    }

    /// Locks down `bucket`: public-access-block first, then the policy
    /// replacement. Both writes are idempotent and both are attempted even
    /// if the first fails; any failure surfaces as
    /// [`DataCopError::Enforcement`] after both attempts.
    pub async fn enforce(&self, bucket: &str) -> Result<LockdownResult, DataCopError> {
        info!("restricting access to bucket: {}", bucket);
        let mut failures: Vec<String> = Vec::new();

        if let Err(err) = self
            .cloud
            .storage
            .put_public_access_block(bucket, PublicAccessFlags::fully_restricted())
            .await
        {
            warn!("unable to block public access to '{}': {}", bucket, err);
            failures.push(format!("public access block: {err}"));
        }

        match serialized_deny_all_policy(bucket, &self.config.trusted_principals) {
            Ok(policy) => {
                if let Err(err) = self.cloud.storage.put_bucket_policy(bucket, &policy).await {
                    warn!("unable to attach deny all policy to '{}': {}", bucket, err);
                    failures.push(format!("bucket policy: {err}"));
                }
            }
            Err(err) => failures.push(format!("policy template: {err}")),
        }

        if failures.is_empty() {
            info!("bucket '{}' is locked down", bucket);
            Ok(LockdownResult { applied: true })
        } else {
            Err(DataCopError::Enforcement {
                bucket: bucket.to_string(),
                reason: failures.join("; "),
            })
        }
    }
}

fn serialized_deny_all_policy(
    bucket: &str,
    trusted_principals: &[String],
) -> Result<String, DataCopError> {
    serde_json::to_string(&deny_all_policy(bucket, trusted_principals))
        .map_err(|err| DataCopError::AnyhowWrapper(err.into()))
}
