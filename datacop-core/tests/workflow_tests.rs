// datacop-core/tests/workflow_tests.rs
//! End-to-end runs of the remediation workflow against an in-memory cloud.

use anyhow::Result;
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use datacop_core::{
    deny_all_policy, CloudContext, DataCopError, ParameterStore, PublicAccessFlags,
    RemediationConfig, StorageClient, StorageError, TopicPublisher, WorkflowOrchestrator,
    WorkflowState,
};

const HIGH_LINE: &str = r#"{"resourcesAffected":{"s3Bucket":{"name":"b1","arn":"arn:aws:s3:::b1"},"s3Object":{"path":"x/y.txt"}},"severity":{"description":"HIGH"}}"#;
const MEDIUM_LINE: &str = r#"{"resourcesAffected":{"s3Bucket":{"name":"b2","arn":"arn:aws:s3:::b2"},"s3Object":{"path":"m/n.txt"}},"severity":{"description":"MEDIUM"}}"#;
const CRITICAL_LINE: &str = r#"{"resourcesAffected":{"s3Bucket":{"name":"b3","arn":"arn:aws:s3:::b3"},"s3Object":{"path":"c/d.txt"}},"severity":{"description":"CRITICAL"}}"#;

#[derive(Default)]
struct FakeStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    policies: Mutex<HashMap<String, String>>,
    public_access: Mutex<HashMap<String, PublicAccessFlags>>,
    policy_puts: Mutex<Vec<String>>,
    pab_puts: Mutex<Vec<String>>,
    copies: Mutex<Vec<(String, String, String, String)>>,
    deletes: Mutex<Vec<(String, String)>>,
    fail_enforce: bool,
    fail_copy: bool,
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), StorageError> {
        if self.fail_copy {
            return Err(StorageError::Other(anyhow::anyhow!("copy denied")));
        }
        self.copies.lock().unwrap().push((
            source_bucket.to_string(),
            source_key.to_string(),
            target_bucket.to_string(),
            target_key.to_string(),
        ));
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.deletes
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        Ok(self.policies.lock().unwrap().get(bucket).cloned())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        if self.fail_enforce {
            return Err(StorageError::Other(anyhow::anyhow!("policy write denied")));
        }
        self.policy_puts.lock().unwrap().push(bucket.to_string());
        self.policies
            .lock()
            .unwrap()
            .insert(bucket.to_string(), policy.to_string());
        Ok(())
    }

    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> Result<Option<PublicAccessFlags>, StorageError> {
        Ok(self.public_access.lock().unwrap().get(bucket).copied())
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        flags: PublicAccessFlags,
    ) -> Result<(), StorageError> {
        if self.fail_enforce {
            return Err(StorageError::Other(anyhow::anyhow!("pab write denied")));
        }
        self.pab_puts.lock().unwrap().push(bucket.to_string());
        self.public_access
            .lock()
            .unwrap()
            .insert(bucket.to_string(), flags);
        Ok(())
    }
}

struct FakeParameters {
    threshold: String,
}

#[async_trait]
impl ParameterStore for FakeParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        assert_eq!(name, "DataCopSeverity");
        Ok(self.threshold.clone())
    }
}

struct FakeTopics {
    arns: Vec<String>,
    published: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl TopicPublisher for FakeTopics {
    async fn list_topics(&self) -> Result<Vec<String>> {
        Ok(self.arns.clone())
    }

    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String> {
        let mut published = self.published.lock().unwrap();
        published.push((
            topic_arn.to_string(),
            subject.to_string(),
            message.to_string(),
        ));
        Ok(format!("msg-{}", published.len()))
    }
}

struct Harness {
    storage: Arc<FakeStorage>,
    topics: Arc<FakeTopics>,
    cloud: CloudContext,
    config: RemediationConfig,
}

fn harness(threshold: &str, storage: FakeStorage) -> Harness {
    let storage = Arc::new(storage);
    let topics = Arc::new(FakeTopics {
        arns: vec![
            "arn:aws:sns:us-east-1:1:unrelated".to_string(),
            "arn:aws:sns:us-east-1:1:DataCopTopic".to_string(),
        ],
        published: Mutex::new(Vec::new()),
    });
    let cloud = CloudContext::new(
        storage.clone(),
        Arc::new(FakeParameters {
            threshold: threshold.to_string(),
        }),
        topics.clone(),
    );
    Harness {
        storage,
        topics,
        cloud,
        config: RemediationConfig::default(),
    }
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn seed_artifact(harness: &Harness, lines: &str) {
    harness.storage.objects.lock().unwrap().insert(
        (
            "scan-results".to_string(),
            "macie/batch.jsonl.gz".to_string(),
        ),
        gzip(lines),
    );
}

fn batch_trigger() -> serde_json::Value {
    json!({
        "eventKind": "ObjectCreated:Put",
        "resourceId": "scan-results",
        "objectPath": "macie/batch.jsonl.gz",
    })
}

fn lock_down(harness: &Harness, bucket: &str) {
    let policy =
        serde_json::to_string(&deny_all_policy(bucket, &harness.config.trusted_principals))
            .unwrap();
    harness
        .storage
        .policies
        .lock()
        .unwrap()
        .insert(bucket.to_string(), policy);
    harness
        .storage
        .public_access
        .lock()
        .unwrap()
        .insert(bucket.to_string(), PublicAccessFlags::fully_restricted());
}

#[test_log::test(tokio::test)]
async fn a_matching_finding_is_contained_and_reported() {
    let h = harness("high", FakeStorage::default());
    seed_artifact(&h, &format!("{HIGH_LINE}\n"));

    let orchestrator = WorkflowOrchestrator::new(&h.cloud, &h.config);
    let report = orchestrator.run(&batch_trigger()).await.unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportSuccess);
    assert_eq!(report.context.finding.as_ref().unwrap().resource_id, "b1");

    // One policy write and one public-access-block write, both on b1.
    assert_eq!(*h.storage.policy_puts.lock().unwrap(), vec!["b1"]);
    assert_eq!(*h.storage.pab_puts.lock().unwrap(), vec!["b1"]);

    // The object moved: copy first, then delete from the source.
    assert_eq!(h.storage.copies.lock().unwrap().len(), 1);
    assert_eq!(
        *h.storage.deletes.lock().unwrap(),
        vec![("b1".to_string(), "x/y.txt".to_string())]
    );

    // Exactly one notification, on the matching topic, naming the bucket.
    let published = h.topics.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "arn:aws:sns:us-east-1:1:DataCopTopic");
    assert!(published[0].2.contains("b1"));

    let outcome = report.notification.unwrap();
    assert!(outcome.body.contains("b1"));
    assert_eq!(outcome.delivery_id, "msg-1");
}

#[test_log::test(tokio::test)]
async fn an_already_blocked_bucket_is_skipped_silently() {
    let h = harness("high", FakeStorage::default());
    seed_artifact(&h, &format!("{HIGH_LINE}\n"));
    lock_down(&h, "b1");

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::Skip);
    assert!(report.context.protection_state.unwrap().is_blocked());

    // Neither enforcement nor quarantine ran, and nothing was published.
    assert!(h.storage.policy_puts.lock().unwrap().is_empty());
    assert!(h.storage.pab_puts.lock().unwrap().is_empty());
    assert!(h.storage.copies.lock().unwrap().is_empty());
    assert!(h.storage.deletes.lock().unwrap().is_empty());
    assert!(h.topics.published.lock().unwrap().is_empty());
    assert!(report.notification.is_none());
}

#[test_log::test(tokio::test)]
async fn findings_below_the_threshold_skip() {
    let h = harness("high", FakeStorage::default());
    seed_artifact(&h, &format!("{MEDIUM_LINE}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::Skip);
    assert!(report.context.finding.is_none());
    assert!(h.topics.published.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn findings_above_the_threshold_also_skip() {
    // The threshold is an equality match: CRITICAL does not qualify under
    // a "high" threshold.
    let h = harness("high", FakeStorage::default());
    seed_artifact(&h, &format!("{CRITICAL_LINE}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::Skip);
    assert!(h.storage.policy_puts.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn the_first_qualifying_finding_wins() {
    let h = harness("high", FakeStorage::default());
    let second_high = HIGH_LINE.replace("b1", "b9");
    seed_artifact(&h, &format!("{MEDIUM_LINE}\n{HIGH_LINE}\n{second_high}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportSuccess);
    assert_eq!(report.context.finding.unwrap().resource_id, "b1");
    assert_eq!(*h.storage.policy_puts.lock().unwrap(), vec!["b1"]);
}

#[test_log::test(tokio::test)]
async fn malformed_lines_are_skipped_without_aborting_the_batch() {
    let h = harness("high", FakeStorage::default());
    seed_artifact(&h, &format!("this is not json\n{HIGH_LINE}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportSuccess);
}

#[test_log::test(tokio::test)]
async fn a_missing_artifact_is_no_finding() {
    let h = harness("high", FakeStorage::default());

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::Skip);
    assert!(h.topics.published.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn an_enforcement_failure_becomes_exactly_one_error_report() {
    let h = harness(
        "high",
        FakeStorage {
            fail_enforce: true,
            ..Default::default()
        },
    );
    seed_artifact(&h, &format!("{HIGH_LINE}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportError);
    let failure = report.context.error.as_ref().unwrap();
    assert_eq!(failure.state, WorkflowState::Enforce);

    // Quarantine never ran.
    assert!(h.storage.copies.lock().unwrap().is_empty());
    assert!(h.storage.deletes.lock().unwrap().is_empty());

    let published = h.topics.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert!(published[0].2.contains("Enforce"));
    assert!(report.notification.is_some());
}

#[test_log::test(tokio::test)]
async fn a_copy_failure_reports_an_error_and_never_deletes() {
    let h = harness(
        "high",
        FakeStorage {
            fail_copy: true,
            ..Default::default()
        },
    );
    seed_artifact(&h, &format!("{HIGH_LINE}\n"));

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&batch_trigger())
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportError);
    assert_eq!(
        report.context.error.as_ref().unwrap().state,
        WorkflowState::Quarantine
    );
    // The source object is untouched.
    assert!(h.storage.deletes.lock().unwrap().is_empty());
    assert_eq!(h.topics.published.lock().unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn a_scanner_callback_is_contained_without_a_threshold_check() {
    let h = harness("high", FakeStorage::default());

    let trigger = json!({
        "notificationChannelId": "arn:aws:sns:us-east-1:1:FileStorageSecurity-ScanResultTopic",
        "embeddedMessage": { "fileUrl": "https://bucket123.s3.amazonaws.com/path/to/obj.txt" },
    });

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&trigger)
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::ReportSuccess);
    let finding = report.context.finding.as_ref().unwrap();
    assert_eq!(finding.resource_id, "bucket123");
    assert_eq!(finding.object_path, "/path/to/obj.txt");

    assert_eq!(*h.storage.policy_puts.lock().unwrap(), vec!["bucket123"]);
    assert_eq!(
        *h.storage.deletes.lock().unwrap(),
        vec![("bucket123".to_string(), "path/to/obj.txt".to_string())]
    );
}

#[test_log::test(tokio::test)]
async fn an_unrecognized_trigger_is_surfaced_not_reported() {
    let h = harness("high", FakeStorage::default());

    let err = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&json!({ "something": "else" }))
        .await
        .unwrap_err();

    assert!(matches!(err, DataCopError::UnrecognizedTrigger(_)));
    assert!(h.topics.published.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn a_missing_delivery_channel_is_fatal() {
    let storage = FakeStorage::default();
    let storage = Arc::new(storage);
    storage.objects.lock().unwrap().insert(
        (
            "scan-results".to_string(),
            "macie/batch.jsonl.gz".to_string(),
        ),
        gzip(&format!("{HIGH_LINE}\n")),
    );
    let topics = Arc::new(FakeTopics {
        arns: vec!["arn:aws:sns:us-east-1:1:unrelated".to_string()],
        published: Mutex::new(Vec::new()),
    });
    let cloud = CloudContext::new(
        storage,
        Arc::new(FakeParameters {
            threshold: "high".to_string(),
        }),
        topics.clone(),
    );
    let config = RemediationConfig::default();

    let err = WorkflowOrchestrator::new(&cloud, &config)
        .run(&batch_trigger())
        .await
        .unwrap_err();

    assert!(matches!(err, DataCopError::NoDeliveryChannel { .. }));
    assert!(topics.published.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn non_artifact_object_events_are_ignored() {
    let h = harness("high", FakeStorage::default());

    let trigger = json!({
        "eventKind": "ObjectCreated:Put",
        "resourceId": "uploads",
        "objectPath": "photos/cat.png",
    });

    let report = WorkflowOrchestrator::new(&h.cloud, &h.config)
        .run(&trigger)
        .await
        .unwrap();

    assert_eq!(report.terminal_state, WorkflowState::Skip);
    assert!(h.topics.published.lock().unwrap().is_empty());
}
