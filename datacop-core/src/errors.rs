//! errors.rs - Custom error types for the datacop-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `datacop-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions. This prevents them from
/// matching all variants exhaustively, thus avoiding breaking changes.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DataCopError {
    /// The inbound trigger matched neither the direct storage event shape nor
    /// the scanner callback shape. Indicates schema drift upstream; surfaced
    /// to the caller rather than converted into a notification.
    #[error("unrecognized trigger shape: {0}")]
    UnrecognizedTrigger(String),

    #[error("failed to read batch artifact 's3://{bucket}/{key}': {reason}")]
    ArtifactUnreadable {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("malformed finding record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("lockdown enforcement failed for bucket '{bucket}': {reason}")]
    Enforcement { bucket: String, reason: String },

    #[error("quarantine of '{object_path}' from bucket '{bucket}' failed: {reason}")]
    Quarantine {
        bucket: String,
        object_path: String,
        reason: String,
    },

    /// No notification topic matched the configured name fragment. Fatal:
    /// the workflow exits via notification, so there is no fallback channel.
    #[error("no delivery channel matching '{fragment}' exists")]
    NoDeliveryChannel { fragment: String },

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}
