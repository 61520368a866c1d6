// datacop-core/src/lib.rs
//! # DataCop Core Library
//!
//! `datacop-core` implements automated containment of data-exposure
//! incidents in S3. When a sensitive-data scan flags an object at the
//! configured severity, the workflow locks down the affected bucket
//! (deny-all policy plus public-access-block), quarantines the offending
//! object, and notifies an operator, tolerating partial failure at every
//! step without double-blocking a bucket or losing the report.
//!
//! ## Modules
//!
//! * `finding`: value types for detection records and severities.
//! * `events`: trigger classification (direct storage event vs. scanner callback).
//! * `store`: retrieval and lazy decoding of scan batch artifacts.
//! * `severity`: the threshold policy deciding whether a finding remediates.
//! * `policy`: the canonical deny-all bucket policy template.
//! * `lockdown`: protection status checks and idempotent enforcement.
//! * `quarantine`: copy-then-delete relocation of flagged objects.
//! * `notify`: terminal success/failure reports to the operator channel.
//! * `workflow`: the state machine sequencing all of the above.
//! * `cloud`: collaborator traits and their AWS SDK implementations.
//! * `config`: deployment-owned settings with environment overrides.
//! * `errors`: the structured library error type.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use datacop_core::{CloudContext, RemediationConfig, WorkflowOrchestrator};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let trigger = serde_json::json!({
//!         "eventKind": "ObjectCreated:Put",
//!         "resourceId": "scan-results",
//!         "objectPath": "macie/findings/batch-0.jsonl.gz",
//!     });
//!
//!     let config = RemediationConfig::from_env();
//!     let cloud = CloudContext::from_env().await;
//!
//!     let report = WorkflowOrchestrator::new(&cloud, &config).run(&trigger).await?;
//!     println!("terminal state: {}", report.terminal_state);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`DataCopError`]; each workflow step's error
//! is caught once at the orchestrator boundary and converted into the
//! error-report terminal, so a triggered execution emits exactly one
//! notification (or none, when it skips).
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod cloud;
pub mod config;
pub mod errors;
pub mod events;
pub mod finding;
pub mod lockdown;
pub mod notify;
pub mod policy;
pub mod quarantine;
pub mod severity;
pub mod store;
pub mod workflow;

/// Re-exports the custom error type for clear error reporting.
pub use errors::DataCopError;

/// Re-exports the collaborator seams and the per-execution cloud context.
pub use cloud::{
    CloudContext, ParameterStore, PublicAccessFlags, StorageClient, StorageError, TopicPublisher,
};

/// Re-exports the configuration consumed by the workflow.
pub use config::RemediationConfig;

/// Re-exports the finding value types.
pub use finding::{Finding, FindingSource, Severity};

/// Re-exports trigger classification.
pub use events::{classify, ClassifiedTrigger};

/// Re-exports batch artifact loading.
pub use store::{FindingBatch, FindingStore};

/// Re-exports the severity threshold policy.
pub use severity::SeverityPolicy;

/// Re-exports the deny-all policy template.
pub use policy::deny_all_policy;

/// Re-exports protection status and lockdown types.
pub use lockdown::{
    LockdownEnforcer, LockdownResult, ProtectionStatusChecker, ResourceProtectionState,
};

/// Re-exports object quarantine types.
pub use quarantine::{QuarantineMover, QuarantineRecord};

/// Re-exports the operator notification types.
pub use notify::{NotificationOutcome, OutcomeNotifier};

/// Re-exports the remediation state machine.
pub use workflow::{
    ExecutionReport, RemediationContext, StepFailure, WorkflowOrchestrator, WorkflowState,
};
