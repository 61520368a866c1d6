// datacop-core/src/cloud/sns.rs
//! SNS-backed implementation of the [`TopicPublisher`] trait.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_sns::Client;
use log::debug;

use crate::cloud::TopicPublisher;

pub struct SnsTopicPublisher {
    client: Client,
}

impl SnsTopicPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TopicPublisher for SnsTopicPublisher {
    async fn list_topics(&self) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_topics();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let resp = request.send().await.context("listing topics")?;

            for topic in resp.topics() {
                if let Some(arn) = topic.topic_arn() {
                    arns.push(arn.to_string());
                }
            }

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(arns)
    }

    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String> {
        let message_id = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .with_context(|| format!("publishing to topic '{topic_arn}'"))?
            .message_id()
            .ok_or_else(|| anyhow!("publish response carried no message id"))?
            .to_string();

        debug!(
            "message has been published to topic successfully: {}",
            message_id
        );
        Ok(message_id)
    }
}
