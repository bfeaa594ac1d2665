//! HTTP client for the task server API.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use soar_core::{AircraftState, TaskDefinition, TaskStats};

#[derive(Debug, Deserialize)]
struct QueuedResponse {
    queued: usize,
}

/// Thin async client for the server's `/v1` endpoints.
pub struct TaskClient {
    client: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a task. Returns the server's reply including any warnings.
    pub async fn put_task(&self, definition: &TaskDefinition) -> Result<Value> {
        let response = self
            .client
            .put(self.url("/v1/task"))
            .json(definition)
            .send()
            .await
            .context("sending task")?;
        let status = response.status();
        let body: Value = response.json().await.context("reading task reply")?;
        if !status.is_success() {
            bail!("task rejected ({status}): {body}");
        }
        Ok(body)
    }

    /// Post a batch of fixes. Returns how many were queued.
    pub async fn send_fixes(&self, fixes: &[AircraftState]) -> Result<usize> {
        let response = self
            .client
            .post(self.url("/v1/fixes"))
            .json(fixes)
            .send()
            .await
            .context("sending fixes")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("fixes rejected ({status}): {body}");
        }
        let reply: QueuedResponse = response.json().await.context("reading fix reply")?;
        Ok(reply.queued)
    }

    pub async fn stats(&self) -> Result<TaskStats> {
        self.client
            .get(self.url("/v1/stats"))
            .send()
            .await
            .context("requesting stats")?
            .error_for_status()?
            .json()
            .await
            .context("reading stats")
    }
}
