// datacop-core/src/policy.rs
//! Canonical bucket policy documents.
//!
//! The deny-all policy is built as a fresh document value per call, with the
//! bucket name substituted into the resource ARNs. There is no shared mutable
//! template; status checks compare the remote policy byte-for-byte against
//! the serialization of this document.

use serde_json::{json, Value};

/// Builds the deny-all-except-trusted-principals policy for `bucket`.
///
/// The document denies every `s3:*` action on the bucket and its objects to
/// any principal whose ARN does not match one of `trusted_principals`.
pub fn deny_all_policy(bucket: &str, trusted_principals: &[String]) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "DenyAllPolicy",
                "Effect": "Deny",
                "Principal": "*",
                "Action": ["s3:*"],
                "Resource": [
                    format!("arn:aws:s3:::{bucket}"),
                    format!("arn:aws:s3:::{bucket}/*"),
                ],
                "Condition": {
                    "StringNotLike": {
                        "aws:PrincipalARN": trusted_principals,
                    }
                },
            }
        ],
    })
}
