// datacop-core/src/notify.rs
//! Operator notification at the end of an execution.
//!
//! The delivery channel is not configured by ARN; it is resolved lazily by a
//! case-insensitive name-substring lookup among the existing topics, first
//! match wins, and cached for the rest of the execution. No matching topic
//! is fatal ([`DataCopError::NoDeliveryChannel`]): the workflow exits via
//! notification, so there is nothing useful to do without a channel.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::cloud::CloudContext;
use crate::config::RemediationConfig;
use crate::errors::DataCopError;
use crate::finding::Finding;
use crate::quarantine::QuarantineRecord;

/// The single outbound notification of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub subject: String,
    pub body: String,
    pub execution_id: String,
    pub delivery_id: String,
}

/// Formats and emits success or failure reports.
pub struct OutcomeNotifier<'a> {
    cloud: &'a CloudContext,
    config: &'a RemediationConfig,
    channel: OnceCell<String>,
}

impl<'a> OutcomeNotifier<'a> {
    pub fn new(cloud: &'a CloudContext, config: &'a RemediationConfig) -> Self {
        Self {
            cloud,
            config,
            channel: OnceCell::new(),
        }
    }

    /// Reports a completed containment.
    pub async fn report_success(
        &self,
        execution_id: &str,
        finding: &Finding,
        record: &QuarantineRecord,
    ) -> Result<NotificationOutcome, DataCopError> {
        let subject = format!(
            "AWS DataCop Report: bucket {} contained",
            finding.resource_id
        );
        let body = format!(
            "The following S3 bucket has been blocked: {bucket}.\n\
             The offending object '{object}' ({severity}) was quarantined to \
             's3://{target_bucket}/{target_key}'.\n\
             Execution: {execution_id}\n\
             Time: {time}\n\
             Please log into the console and inspect the logs for more information.",
            bucket = finding.resource_id,
            object = finding.object_path,
            severity = finding.severity,
            target_bucket = record.target_resource_id,
            target_key = record.target_object_path,
            time = Utc::now().to_rfc3339(),
        );
        self.deliver(execution_id, subject, body).await
    }

    /// Reports a failed execution, naming the step that raised.
    pub async fn report_error(
        &self,
        execution_id: &str,
        failed_step: &str,
        message: &str,
    ) -> Result<NotificationOutcome, DataCopError> {
        let subject = "AWS DataCop Report: remediation failed".to_string();
        let body = format!(
            "Remediation failed during '{failed_step}': {message}\n\
             Execution: {execution_id}\n\
             Time: {time}\n\
             The affected bucket may be partially contained; inspect the logs before retrying.",
            time = Utc::now().to_rfc3339(),
        );
        self.deliver(execution_id, subject, body).await
    }

    async fn deliver(
        &self,
        execution_id: &str,
        subject: String,
        body: String,
    ) -> Result<NotificationOutcome, DataCopError> {
        let topic_arn = self.delivery_channel().await?;
        let delivery_id = self.cloud.topics.publish(topic_arn, &subject, &body).await?;
        info!(
            "published execution report to '{}' (delivery id {})",
            topic_arn, delivery_id
        );

        Ok(NotificationOutcome {
            subject,
            body,
            execution_id: execution_id.to_string(),
            delivery_id,
        })
    }

    /// Resolves the delivery channel on first use and caches it.
    async fn delivery_channel(&self) -> Result<&str, DataCopError> {
        let fragment = self.config.channel_fragment.to_lowercase();
        let arn = self
            .channel
            .get_or_try_init(|| async {
                for arn in self.cloud.topics.list_topics().await? {
                    if arn.to_lowercase().contains(&fragment) {
                        debug!("obtained topic ARN: {}", arn);
                        return Ok(arn);
                    }
                }
                Err(DataCopError::NoDeliveryChannel {
                    fragment: self.config.channel_fragment.clone(),
                })
            })
            .await?;
        Ok(arn.as_str())
    }
}
