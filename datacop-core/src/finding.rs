// datacop-core/src/finding.rs
//! Value types for sensitive-data findings.
//!
//! A [`Finding`] is one detection record: the affected bucket, the offending
//! object, and the severity the scanner assigned. Findings are immutable once
//! parsed; they are created by the finding store (batch artifacts) or by the
//! event router (third-party scanner callbacks) and consumed by the severity
//! policy and the workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity label attached to a finding by the upstream scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parses a severity label case-insensitively. Returns `None` for labels
    /// outside the known set; callers decide whether that is an error.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Canonical upper-case label, matching the scanner's wire format.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingSource {
    /// Decoded from a scan-result batch artifact (one JSON record per line).
    ScanBatch,
    /// Synthesized from a third-party scanner callback.
    ThirdPartyCallback,
}

/// One sensitive-data detection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Name of the affected S3 bucket.
    pub resource_id: String,
    /// Path of the offending object within the bucket.
    pub object_path: String,
    pub severity: Severity,
    pub source: FindingSource,
}
