// datacop-core/src/workflow.rs
//! The remediation state machine.
//!
//! One execution runs {classify severity -> check protection status ->
//! enforce lockdown -> quarantine -> report} as an explicit finite-state
//! machine. Every step's error is caught exactly once, at the transition
//! boundary, and redirected to the `ReportError` terminal instead of
//! propagating; the orchestrator itself never retries. The only exception is
//! trigger classification: an unrecognized trigger means schema drift
//! upstream and is surfaced to the caller directly.
//!
//! Concurrent executions share no in-process state. Two executions targeting
//! the same bucket can interleave a "not yet blocked" check with the other's
//! enforcement; that race is accepted, since enforcement is idempotent and
//! the worst case is a duplicate write of identical values.

use log::{debug, error, info};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::cloud::CloudContext;
use crate::config::RemediationConfig;
use crate::errors::DataCopError;
use crate::events::{classify, ClassifiedTrigger};
use crate::finding::Finding;
use crate::lockdown::{LockdownEnforcer, ProtectionStatusChecker, ResourceProtectionState};
use crate::notify::{NotificationOutcome, OutcomeNotifier};
use crate::quarantine::{QuarantineMover, QuarantineRecord};
use crate::severity::SeverityPolicy;
use crate::store::FindingStore;

/// States of the remediation workflow.
///
/// `Skip`, `ReportSuccess`, and `ReportError` are terminal. Each state
/// executes exactly once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    DetermineSeverity,
    CheckProtectionStatus,
    Enforce,
    Quarantine,
    Skip,
    ReportSuccess,
    ReportError,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skip | Self::ReportSuccess | Self::ReportError)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "Start",
            Self::DetermineSeverity => "DetermineSeverity",
            Self::CheckProtectionStatus => "CheckProtectionStatus",
            Self::Enforce => "Enforce",
            Self::Quarantine => "Quarantine",
            Self::Skip => "Skip",
            Self::ReportSuccess => "ReportSuccess",
            Self::ReportError => "ReportError",
        };
        f.write_str(name)
    }
}

/// The step that raised and what it said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub state: WorkflowState,
    pub message: String,
}

/// State threaded through one execution. Owned exclusively by the
/// orchestrator; fields are appended as steps complete, never rewritten.
#[derive(Debug)]
pub struct RemediationContext {
    pub execution_id: String,
    pub finding: Option<Finding>,
    pub protection_state: Option<ResourceProtectionState>,
    pub quarantine: Option<QuarantineRecord>,
    pub error: Option<StepFailure>,
}

impl RemediationContext {
    fn new(execution_id: String) -> Self {
        Self {
            execution_id,
            finding: None,
            protection_state: None,
            quarantine: None,
            error: None,
        }
    }
}

/// What one execution did.
#[derive(Debug)]
pub struct ExecutionReport {
    pub terminal_state: WorkflowState,
    pub context: RemediationContext,
    /// Present iff the terminal state was `ReportSuccess` or `ReportError`.
    pub notification: Option<NotificationOutcome>,
}

/// Drives one execution of the remediation workflow.
pub struct WorkflowOrchestrator<'a> {
    cloud: &'a CloudContext,
    config: &'a RemediationConfig,
}

impl<'a> WorkflowOrchestrator<'a> {
    pub fn new(cloud: &'a CloudContext, config: &'a RemediationConfig) -> Self {
        Self { cloud, config }
    }

    /// Runs one execution for `trigger` under a fresh execution id.
    pub async fn run(&self, trigger: &Value) -> Result<ExecutionReport, DataCopError> {
        self.run_with_id(trigger, Uuid::new_v4().to_string()).await
    }

    /// Runs one execution under a caller-supplied execution id (the trigger
    /// infrastructure usually has one of its own).
    pub async fn run_with_id(
        &self,
        trigger: &Value,
        execution_id: String,
    ) -> Result<ExecutionReport, DataCopError> {
        // Classification happens outside the catch boundary: an unrecognized
        // trigger is a contract change, not a step failure to report.
        let trigger = classify(trigger)?;

        let mut ctx = RemediationContext::new(execution_id);
        let notifier = OutcomeNotifier::new(self.cloud, self.config);
        info!("starting remediation execution {}", ctx.execution_id);

        let mut state = WorkflowState::Start;
        let mut notification = None;

        loop {
            state = match state {
                WorkflowState::Start => WorkflowState::DetermineSeverity,

                WorkflowState::DetermineSeverity => {
                    let result = self.determine_severity(&trigger, &mut ctx).await;
                    Self::catch(&mut ctx, WorkflowState::DetermineSeverity, result)
                }

                WorkflowState::CheckProtectionStatus => {
                    let result = self.check_protection_status(&mut ctx).await;
                    Self::catch(&mut ctx, WorkflowState::CheckProtectionStatus, result)
                }

                WorkflowState::Enforce => {
                    let result = self.enforce(&ctx).await;
                    Self::catch(&mut ctx, WorkflowState::Enforce, result)
                }

                WorkflowState::Quarantine => {
                    let result = self.quarantine_object(&mut ctx).await;
                    Self::catch(&mut ctx, WorkflowState::Quarantine, result)
                }

                WorkflowState::Skip => {
                    info!("execution {} skipped; nothing to remediate", ctx.execution_id);
                    break;
                }

                WorkflowState::ReportSuccess => {
                    let (finding, record) = match (&ctx.finding, &ctx.quarantine) {
                        (Some(finding), Some(record)) => (finding, record),
                        _ => {
                            return Err(DataCopError::AnyhowWrapper(anyhow::anyhow!(
                                "reached ReportSuccess without a finding and quarantine record"
                            )))
                        }
                    };
                    let outcome = notifier
                        .report_success(&ctx.execution_id, finding, record)
                        .await
                        .map_err(|err| {
                            error!(
                                "unable to deliver success report for execution {}: {}",
                                ctx.execution_id, err
                            );
                            err
                        })?;
                    notification = Some(outcome);
                    break;
                }

                WorkflowState::ReportError => {
                    let failure = match &ctx.error {
                        Some(failure) => failure.clone(),
                        None => {
                            return Err(DataCopError::AnyhowWrapper(anyhow::anyhow!(
                                "reached ReportError without a recorded failure"
                            )))
                        }
                    };
                    let outcome = notifier
                        .report_error(
                            &ctx.execution_id,
                            &failure.state.to_string(),
                            &failure.message,
                        )
                        .await
                        .map_err(|err| {
                            error!(
                                "unable to deliver error report for execution {}: {}",
                                ctx.execution_id, err
                            );
                            err
                        })?;
                    notification = Some(outcome);
                    break;
                }
            };
        }

        info!(
            "execution {} reached terminal state {}",
            ctx.execution_id, state
        );
        Ok(ExecutionReport {
            terminal_state: state,
            context: ctx,
            notification,
        })
    }

    /// The single error-handling wrapper applied to every state transition:
    /// a step error records a `StepFailure` and reroutes to `ReportError`.
    fn catch(
        ctx: &mut RemediationContext,
        state: WorkflowState,
        result: Result<WorkflowState, DataCopError>,
    ) -> WorkflowState {
        match result {
            Ok(next) => next,
            Err(err) => {
                error!(
                    "state {} failed for execution {}: {}",
                    state, ctx.execution_id, err
                );
                ctx.error = Some(StepFailure {
                    state,
                    message: err.to_string(),
                });
                WorkflowState::ReportError
            }
        }
    }

    async fn determine_severity(
        &self,
        trigger: &ClassifiedTrigger,
        ctx: &mut RemediationContext,
    ) -> Result<WorkflowState, DataCopError> {
        if let Some(finding) = trigger.callback_finding() {
            info!(
                "scanner callback verdict for 's3://{}{}'; proceeding to containment",
                finding.resource_id, finding.object_path
            );
            ctx.finding = Some(finding);
            return Ok(WorkflowState::CheckProtectionStatus);
        }

        let Some((bucket, key)) = trigger.batch_artifact() else {
            debug!("trigger references no batch artifact; nothing to do");
            return Ok(WorkflowState::Skip);
        };

        let threshold = self
            .cloud
            .parameters
            .get_parameter(&self.config.severity_parameter)
            .await?;
        let policy = SeverityPolicy::from_label(&threshold);

        let batch = FindingStore::new(self.cloud).load(bucket, key).await?;
        // First qualifying finding wins; iteration stops there.
        let first_match = batch.findings().find(|finding| policy.matches(finding));
        match first_match {
            Some(finding) => {
                info!(
                    "finding for bucket '{}' matches severity threshold '{}'",
                    finding.resource_id,
                    policy.label()
                );
                ctx.finding = Some(finding);
                Ok(WorkflowState::CheckProtectionStatus)
            }
            None => {
                info!(
                    "no finding matched severity threshold '{}'",
                    policy.label()
                );
                Ok(WorkflowState::Skip)
            }
        }
    }

    async fn check_protection_status(
        &self,
        ctx: &mut RemediationContext,
    ) -> Result<WorkflowState, DataCopError> {
        let bucket = required_finding(ctx)?.resource_id.clone();

        let state = ProtectionStatusChecker::new(self.cloud, self.config)
            .check(&bucket)
            .await?;
        let already_blocked = state.is_blocked();
        ctx.protection_state = Some(state);

        if already_blocked {
            info!("bucket '{}' is already locked down; skipping", bucket);
            Ok(WorkflowState::Skip)
        } else {
            Ok(WorkflowState::Enforce)
        }
    }

    async fn enforce(&self, ctx: &RemediationContext) -> Result<WorkflowState, DataCopError> {
        let bucket = required_finding(ctx)?.resource_id.clone();
        LockdownEnforcer::new(self.cloud, self.config)
            .enforce(&bucket)
            .await?;
        Ok(WorkflowState::Quarantine)
    }

    async fn quarantine_object(
        &self,
        ctx: &mut RemediationContext,
    ) -> Result<WorkflowState, DataCopError> {
        let (bucket, path) = {
            let finding = required_finding(ctx)?;
            (finding.resource_id.clone(), finding.object_path.clone())
        };

        let record = QuarantineMover::new(self.cloud, self.config)
            .quarantine(&bucket, &path)
            .await?;
        ctx.quarantine = Some(record);
        Ok(WorkflowState::ReportSuccess)
    }
}

fn required_finding(ctx: &RemediationContext) -> Result<&Finding, DataCopError> {
    ctx.finding.as_ref().ok_or_else(|| {
        DataCopError::AnyhowWrapper(anyhow::anyhow!(
            "workflow reached a containment state without a finding in context"
        ))
    })
}
