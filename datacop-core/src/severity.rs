// datacop-core/src/severity.rs
//! The severity policy: decides whether a finding triggers remediation.

use log::warn;

use crate::finding::{Finding, Severity};

/// Compares finding severities against a configured threshold label.
///
/// The comparison is an *equality* match, not a ranking: a finding one level
/// above the threshold does not match, only the exact severity does. This
/// mirrors the deployed behavior; see the project design notes before
/// changing it to a ranked comparison.
#[derive(Debug, Clone)]
pub struct SeverityPolicy {
    threshold: Option<Severity>,
    label: String,
}

impl SeverityPolicy {
    /// Builds a policy from the externally configured threshold label.
    ///
    /// An unknown label yields a policy that matches nothing; this is logged
    /// once at construction rather than treated as a hard error, since the
    /// parameter is owned by the deployment, not by this library.
    pub fn from_label(label: &str) -> Self {
        let threshold = Severity::parse_label(label);
        if threshold.is_none() {
            warn!(
                "configured severity threshold '{}' is not a known label; no finding will match",
                label
            );
        }
        Self {
            threshold,
            label: label.to_string(),
        }
    }

    /// True when the finding's severity equals the configured threshold
    /// (case-insensitively, via label parsing).
    pub fn matches(&self, finding: &Finding) -> bool {
        self.threshold == Some(finding.severity)
    }

    /// The raw threshold label as configured.
    pub fn label(&self) -> &str {
        &self.label
    }
}
