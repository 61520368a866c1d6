// datacop-core/src/config.rs
//! Configuration management for `datacop-core`.
//!
//! The remediation workflow consumes a handful of deployment-owned settings:
//! the name of the parameter holding the severity threshold, the quarantine
//! bucket, the notification topic name fragment, and the principals exempted
//! from the deny-all policy. All of them have defaults matching the standard
//! deployment and can be overridden through the environment.
//!
//! License: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::env;

/// Default name of the parameter-store entry holding the severity threshold.
pub const DEFAULT_SEVERITY_PARAMETER: &str = "DataCopSeverity";

/// Default bucket receiving quarantined objects.
pub const DEFAULT_QUARANTINE_BUCKET: &str = "datacop-quarantine";

/// Default substring used to resolve the notification topic by name.
pub const DEFAULT_CHANNEL_FRAGMENT: &str = "datacop";

/// Settings consumed by the remediation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationConfig {
    /// Parameter-store name resolving to the severity threshold label.
    pub severity_parameter: String,
    /// Bucket offending objects are moved into.
    pub quarantine_bucket: String,
    /// Case-insensitive substring matched against topic ARNs to find the
    /// operator notification channel. First match wins.
    pub channel_fragment: String,
    /// Principal ARN patterns still allowed to access a locked-down bucket.
    pub trusted_principals: Vec<String>,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            severity_parameter: DEFAULT_SEVERITY_PARAMETER.to_string(),
            quarantine_bucket: DEFAULT_QUARANTINE_BUCKET.to_string(),
            channel_fragment: DEFAULT_CHANNEL_FRAGMENT.to_string(),
            trusted_principals: vec![
                "arn:aws:iam::*:user/DataCop".to_string(),
                "arn:aws:iam::*:role/DataCop*".to_string(),
                "arn:aws:iam::*:root".to_string(),
            ],
        }
    }
}

impl RemediationConfig {
    /// Loads the configuration, applying environment overrides on top of the
    /// deployment defaults.
    ///
    /// Recognized variables: `DATACOP_SEVERITY_PARAMETER`,
    /// `DATACOP_QUARANTINE_BUCKET`, `DATACOP_CHANNEL_FRAGMENT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = env::var("DATACOP_SEVERITY_PARAMETER") {
            config.severity_parameter = name;
        }
        if let Ok(bucket) = env::var("DATACOP_QUARANTINE_BUCKET") {
            config.quarantine_bucket = bucket;
        }
        if let Ok(fragment) = env::var("DATACOP_CHANNEL_FRAGMENT") {
            config.channel_fragment = fragment;
        }
        config
    }
}
