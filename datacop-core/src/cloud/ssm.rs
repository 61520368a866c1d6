// datacop-core/src/cloud/ssm.rs
//! SSM-backed implementation of the [`ParameterStore`] trait.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_ssm::Client;
use log::debug;

use crate::cloud::ParameterStore;

pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let resp = self
            .client
            .get_parameter()
            .name(name)
            .send()
            .await
            .with_context(|| format!("reading parameter '{name}'"))?;

        let value = resp
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| anyhow!("parameter '{name}' has no value"))?
            .to_string();
        debug!("obtained parameter '{}': {}", name, value);
        Ok(value)
    }
}
