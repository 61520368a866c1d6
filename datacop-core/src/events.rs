// datacop-core/src/events.rs
//! Trigger classification for the remediation workflow.
//!
//! An execution is started by one of two trigger shapes: a direct storage
//! mutation event (an object was created, possibly a scan batch artifact) or
//! a callback wrapping a third-party scanner verdict. Classification is a
//! tagged-union decode: each known shape is attempted in a fixed priority
//! order and the first successful decode wins. A payload matching neither
//! shape is surfaced as [`DataCopError::UnrecognizedTrigger`], since that
//! indicates a contract change upstream rather than a transient fault.

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::DataCopError;
use crate::finding::{Finding, FindingSource, Severity};

/// Substring of the notification channel id that marks a third-party
/// scanner callback.
pub const CALLBACK_CHANNEL_MARKER: &str = "FileStorageSecurity";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackTrigger {
    notification_channel_id: String,
    embedded_message: EmbeddedMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedMessage {
    file_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectTrigger {
    event_kind: String,
    resource_id: String,
    object_path: String,
}

/// A trigger reduced to its canonical workflow entry payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedTrigger {
    /// An object-created event in a watched bucket. `resource_id` holds the
    /// bucket, `object_path` the created key.
    DirectStorageEvent {
        event_kind: String,
        resource_id: String,
        object_path: String,
    },
    /// A third-party scanner flagged an object; the verdict has already been
    /// rendered upstream.
    ScannerCallback {
        resource_id: String,
        object_path: String,
    },
}

impl ClassifiedTrigger {
    /// Location of the scan batch artifact this trigger references, if any.
    ///
    /// Only object-created events for `jsonl.gz` artifacts carry findings to
    /// load; every other direct event classifies cleanly but yields no work.
    pub fn batch_artifact(&self) -> Option<(&str, &str)> {
        match self {
            Self::DirectStorageEvent {
                resource_id,
                object_path,
                ..
            } if object_path.contains("jsonl.gz") => {
                Some((resource_id.as_str(), object_path.as_str()))
            }
            _ => None,
        }
    }

    /// The finding a scanner callback carries directly.
    ///
    /// Callback verdicts are synthesized at `CRITICAL` severity: the scanner
    /// already decided the object is malicious, so the threshold comparison
    /// does not apply to them.
    pub fn callback_finding(&self) -> Option<Finding> {
        match self {
            Self::ScannerCallback {
                resource_id,
                object_path,
            } => Some(Finding {
                resource_id: resource_id.clone(),
                object_path: object_path.clone(),
                severity: Severity::Critical,
                source: FindingSource::ThirdPartyCallback,
            }),
            Self::DirectStorageEvent { .. } => None,
        }
    }
}

/// Classifies a raw trigger record into its canonical payload.
///
/// The scanner callback shape is attempted first because it carries a
/// distinguishing marker; a decoded callback whose channel id lacks the
/// marker is not trusted and falls through to the direct shape.
pub fn classify(trigger: &Value) -> Result<ClassifiedTrigger, DataCopError> {
    if let Ok(callback) = serde_json::from_value::<CallbackTrigger>(trigger.clone()) {
        if callback.notification_channel_id.contains(CALLBACK_CHANNEL_MARKER) {
            let (resource_id, object_path) = parse_object_url(&callback.embedded_message.file_url)?;
            debug!(
                "classified scanner callback for object '{}' in bucket '{}'",
                object_path, resource_id
            );
            return Ok(ClassifiedTrigger::ScannerCallback {
                resource_id,
                object_path,
            });
        }
    }

    if let Ok(direct) = serde_json::from_value::<DirectTrigger>(trigger.clone()) {
        debug!(
            "classified direct storage event '{}' for 's3://{}/{}'",
            direct.event_kind, direct.resource_id, direct.object_path
        );
        return Ok(ClassifiedTrigger::DirectStorageEvent {
            event_kind: direct.event_kind,
            resource_id: direct.resource_id,
            object_path: direct.object_path,
        });
    }

    Err(DataCopError::UnrecognizedTrigger(
        "trigger matches neither the storage event shape nor the scanner callback shape"
            .to_string(),
    ))
}

/// Extracts `(bucket, object_path)` from a virtual-hosted-style S3 URL such
/// as `https://bucket123.s3.amazonaws.com/path/to/obj.txt`.
///
/// The leading slash of the object path is preserved; it is part of the path
/// as scanners report it.
fn parse_object_url(url: &str) -> Result<(String, String), DataCopError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            DataCopError::UnrecognizedTrigger(format!("callback file url has no scheme: '{url}'"))
        })?;

    let (host, path) = rest.split_once('/').ok_or_else(|| {
        DataCopError::UnrecognizedTrigger(format!("callback file url has no object path: '{url}'"))
    })?;

    // Virtual-hosted style: the bucket is the host label before ".s3".
    let bucket = match host.split_once(".s3") {
        Some((bucket, suffix))
            if !bucket.is_empty() && (suffix.starts_with('.') || suffix.starts_with('-')) =>
        {
            bucket.to_string()
        }
        _ => {
            return Err(DataCopError::UnrecognizedTrigger(format!(
                "callback file url host is not a bucket endpoint: '{host}'"
            )))
        }
    };

    Ok((bucket, format!("/{path}")))
}
