// datacop-core/src/quarantine.rs
//! Relocation of offending objects into the quarantine bucket.
//!
//! Ordering is copy-then-delete, never the reverse: a failure between the
//! two steps must leave the object duplicated, not lost. A delete failure
//! after a successful copy is surfaced, not retried; the source bucket is
//! already locked down at that point, so the exposure itself is contained.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cloud::CloudContext;
use crate::config::RemediationConfig;
use crate::errors::DataCopError;

/// Where a quarantined object came from and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub original_resource_id: String,
    pub original_object_path: String,
    pub target_resource_id: String,
    pub target_object_path: String,
}

/// Moves flagged objects into the configured quarantine bucket.
pub struct QuarantineMover<'a> {
    cloud: &'a CloudContext,
    config: &'a RemediationConfig,
}

impl<'a> QuarantineMover<'a> {
    pub fn new(cloud: &'a CloudContext, config: &'a RemediationConfig) -> Self {
        Self { cloud, config }
    }

    /// Copies `object_path` from `bucket` into the quarantine bucket under a
    /// key namespaced by the source bucket, then deletes the original.
    pub async fn quarantine(
        &self,
        bucket: &str,
        object_path: &str,
    ) -> Result<QuarantineRecord, DataCopError> {
        let source_key = object_path.trim_start_matches('/');
        // Namespacing by source bucket avoids key collisions between buckets.
        let target_key = format!("{bucket}/{source_key}");
        let target_bucket = &self.config.quarantine_bucket;

        self.cloud
            .storage
            .copy_object(bucket, source_key, target_bucket, &target_key)
            .await
            .map_err(|err| DataCopError::Quarantine {
                bucket: bucket.to_string(),
                object_path: object_path.to_string(),
                reason: format!("copy to quarantine failed: {err}"),
            })?;
        info!(
            "copied 's3://{}/{}' to 's3://{}/{}'",
            bucket, source_key, target_bucket, target_key
        );

        if let Err(err) = self.cloud.storage.delete_object(bucket, source_key).await {
            // Copy already succeeded: the object now exists in both places.
            warn!(
                "delete of 's3://{}/{}' failed after quarantine copy; object remains duplicated",
                bucket, source_key
            );
            return Err(DataCopError::Quarantine {
                bucket: bucket.to_string(),
                object_path: object_path.to_string(),
                reason: format!(
                    "delete after successful copy failed ({err}); \
                     a duplicate remains at 's3://{target_bucket}/{target_key}'"
                ),
            });
        }
        info!("deleted 's3://{}/{}' from the source bucket", bucket, source_key);

        Ok(QuarantineRecord {
            original_resource_id: bucket.to_string(),
            original_object_path: object_path.to_string(),
            target_resource_id: target_bucket.clone(),
            target_object_path: target_key,
        })
    }
}
