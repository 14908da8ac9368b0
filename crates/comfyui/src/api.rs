//! REST API client for the ComfyUI HTTP endpoints.

use serde::{Deserialize, Serialize};
use texgen_core::checkpoint::{self, CheckpointInfo};

/// Default base URL of a local ComfyUI instance.
pub const DEFAULT_API_URL: &str = "http://localhost:8188";

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by `POST /prompt` after queuing a workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub prompt_id: String,
    /// Position in the execution queue.
    pub number: i64,
}

/// Running and pending entries of the ComfyUI execution queue.
///
/// Entries are kept as raw JSON; their layout is ComfyUI's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub queue_running: Vec<serde_json::Value>,
    #[serde(default)]
    pub queue_pending: Vec<serde_json::Value>,
}

impl QueueSnapshot {
    pub fn running_count(&self) -> usize {
        self.queue_running.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue_pending.len()
    }
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

impl ComfyUIApi {
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Queue a workflow for execution (`POST /prompt`).
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(self.url("/prompt"))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Remove not-yet-started prompts from the queue.
    pub async fn delete_queued(&self, prompt_ids: &[String]) -> Result<(), ComfyUIApiError> {
        self.post_queue(&serde_json::json!({ "delete": prompt_ids })).await
    }

    /// Remove every not-yet-started prompt.
    pub async fn clear_queue(&self) -> Result<(), ComfyUIApiError> {
        self.post_queue(&serde_json::json!({ "clear": true })).await
    }

    /// Interrupt whatever is executing right now (`POST /interrupt`).
    pub async fn interrupt(&self) -> Result<(), ComfyUIApiError> {
        let response = self.client.post(self.url("/interrupt")).send().await?;
        Self::check_status(response).await
    }

    pub async fn get_queue(&self) -> Result<QueueSnapshot, ComfyUIApiError> {
        let response = self.client.get(self.url("/queue")).send().await?;
        Self::parse_response(response).await
    }

    /// Device and memory statistics (`GET /system_stats`). Also serves as
    /// the backend health probe.
    pub async fn system_stats(&self) -> Result<serde_json::Value, ComfyUIApiError> {
        let response = self.client.get(self.url("/system_stats")).send().await?;
        Self::parse_response(response).await
    }

    /// Execution history of one prompt (`GET /history/{prompt_id}`).
    pub async fn get_history(&self, prompt_id: &str) -> Result<serde_json::Value, ComfyUIApiError> {
        let response = self
            .client
            .get(self.url(&format!("/history/{prompt_id}")))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Checkpoints the `CheckpointLoaderSimple` node can load
    /// (`GET /object_info/CheckpointLoaderSimple`).
    pub async fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, ComfyUIApiError> {
        let response = self
            .client
            .get(self.url("/object_info/CheckpointLoaderSimple"))
            .send()
            .await?;
        let info: serde_json::Value = Self::parse_response(response).await?;
        Ok(parse_checkpoints(&info))
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    async fn post_queue(&self, body: &serde_json::Value) -> Result<(), ComfyUIApiError> {
        let response = self.client.post(self.url("/queue")).json(body).send().await?;
        Self::check_status(response).await
    }

    /// Map a non-2xx response to [`ComfyUIApiError::ApiError`] carrying the
    /// body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ComfyUIApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Catalogue from an `object_info` node description. The choices live at
/// `input.required.ckpt_name[0]`; anything else yields an empty list.
pub fn parse_checkpoints(info: &serde_json::Value) -> Vec<CheckpointInfo> {
    let paths = info
        .pointer("/input/required/ckpt_name/0")
        .and_then(|v| v.as_array())
        .map(|choices| choices.iter().filter_map(|c| c.as_str()).collect::<Vec<_>>())
        .unwrap_or_default();
    checkpoint::catalogue(paths)
}
