// datacop-core/src/store.rs
//! Retrieval and decoding of scan-result batch artifacts.
//!
//! A batch artifact is a gzip-compressed, newline-delimited JSON file: one
//! finding record per line. The store fetches and decompresses the artifact
//! eagerly (the bytes have to move anyway) but decodes records lazily, one
//! line at a time, so the workflow can stop pulling at the first qualifying
//! finding. A missing artifact is "no finding", not an error; a malformed
//! line is logged and skipped without aborting the batch.

use flate2::read::GzDecoder;
use log::{debug, warn};
use serde::Deserialize;
use std::io::Read;

use crate::cloud::{CloudContext, StorageError};
use crate::errors::DataCopError;
use crate::finding::{Finding, FindingSource, Severity};

/// Loads batch artifacts through the execution's storage client.
pub struct FindingStore<'a> {
    cloud: &'a CloudContext,
}

impl<'a> FindingStore<'a> {
    pub fn new(cloud: &'a CloudContext) -> Self {
        Self { cloud }
    }

    /// Fetches and decompresses the artifact at `s3://{bucket}/{key}`.
    ///
    /// A 404 from storage yields an empty batch (logged); any other
    /// retrieval or decompression failure is [`DataCopError::ArtifactUnreadable`].
    pub async fn load(&self, bucket: &str, key: &str) -> Result<FindingBatch, DataCopError> {
        let key = key.trim_start_matches('/');
        debug!("loading batch artifact 's3://{}/{}'", bucket, key);

        let bytes = match self.cloud.storage.get_object(bucket, key).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                warn!(
                    "batch artifact 's3://{}/{}' does not exist; treating as no finding",
                    bucket, key
                );
                return Ok(FindingBatch::empty());
            }
            Err(StorageError::Other(err)) => {
                return Err(DataCopError::ArtifactUnreadable {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    reason: format!("{err:#}"),
                });
            }
        };

        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|err| DataCopError::ArtifactUnreadable {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: format!("decompression failed: {err}"),
            })?;

        Ok(FindingBatch { text })
    }
}

/// A decompressed batch artifact, decoded record by record on demand.
#[derive(Debug, Clone)]
pub struct FindingBatch {
    text: String,
}

impl FindingBatch {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Builds a batch from already-decompressed NDJSON text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Lazy, single-pass iteration over the batch's findings.
    ///
    /// Malformed lines are logged and skipped; blank lines are ignored.
    pub fn findings(&self) -> impl Iterator<Item = Finding> + '_ {
        self.text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match parse_finding_line(line, index + 1) {
                Ok(finding) => Some(finding),
                Err(err) => {
                    warn!("skipping finding record: {}", err);
                    None
                }
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFinding {
    resources_affected: RawResources,
    severity: RawSeverity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResources {
    s3_bucket: RawBucket,
    s3_object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    path: String,
}

#[derive(Debug, Deserialize)]
struct RawSeverity {
    description: String,
}

/// Decodes one NDJSON line into a [`Finding`].
pub fn parse_finding_line(line: &str, line_no: usize) -> Result<Finding, DataCopError> {
    let raw: RawFinding =
        serde_json::from_str(line).map_err(|err| DataCopError::MalformedRecord {
            line: line_no,
            reason: err.to_string(),
        })?;

    let severity = Severity::parse_label(&raw.severity.description).ok_or_else(|| {
        DataCopError::MalformedRecord {
            line: line_no,
            reason: format!("unknown severity label '{}'", raw.severity.description),
        }
    })?;

    Ok(Finding {
        resource_id: raw.resources_affected.s3_bucket.name,
        object_path: raw.resources_affected.s3_object.path,
        severity,
        source: FindingSource::ScanBatch,
    })
}
