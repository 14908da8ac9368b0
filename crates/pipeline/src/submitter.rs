//! Hands one queue item to the render backend.
//!
//! A submission creates the job row in the `processing` state and queues
//! the materialized workflow. It never retries; the sequencer decides what
//! happens after a failure.

use async_trait::async_trait;
use texgen_comfyui::{ComfyUIApi, ComfyUIApiError, WebhookTarget, WorkflowInputs, WorkflowTemplate};
use texgen_core::preset::ModelPreset;
use texgen_core::queue::QueueItem;
use texgen_core::types::DbId;
use texgen_db::models::generation::CreateGeneration;
use texgen_db::repositories::GenerationRepo;
use texgen_db::DbPool;

/// A submission the render backend rejected or never received.
///
/// `job_id` is set when the job row was created before the failure; the
/// caller must then mark that row failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Submission failed: {message}")]
pub struct SubmissionError {
    pub job_id: Option<DbId>,
    pub message: String,
}

impl SubmissionError {
    pub fn new(job_id: Option<DbId>, message: impl Into<String>) -> Self {
        Self {
            job_id,
            message: message.into(),
        }
    }
}

/// Render backend control call failed.
#[derive(Debug, thiserror::Error)]
#[error("Render backend error: {0}")]
pub struct BackendError(pub String);

impl From<ComfyUIApiError> for BackendError {
    fn from(e: ComfyUIApiError) -> Self {
        Self(e.to_string())
    }
}

#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Create the job row and queue the job. Returns the job id.
    async fn submit(&self, item: &QueueItem, preset: &ModelPreset) -> Result<DbId, SubmissionError>;

    /// Stop whatever the backend is executing right now.
    async fn interrupt(&self) -> Result<(), BackendError>;

    /// Drop specific not-yet-started backend jobs.
    async fn delete_queued(&self, prompt_ids: &[String]) -> Result<(), BackendError>;

    /// Drop every not-yet-started backend job.
    async fn clear_queued(&self) -> Result<(), BackendError>;
}

/// [`JobSubmitter`] backed by Postgres and ComfyUI.
pub struct ComfyUISubmitter {
    pool: DbPool,
    api: std::sync::Arc<ComfyUIApi>,
    template: WorkflowTemplate,
    webhook: WebhookTarget,
}

impl ComfyUISubmitter {
    pub fn new(
        pool: DbPool,
        api: std::sync::Arc<ComfyUIApi>,
        template: WorkflowTemplate,
        webhook: WebhookTarget,
    ) -> Self {
        Self {
            pool,
            api,
            template,
            webhook,
        }
    }
}

#[async_trait]
impl JobSubmitter for ComfyUISubmitter {
    async fn submit(&self, item: &QueueItem, preset: &ModelPreset) -> Result<DbId, SubmissionError> {
        let params = &item.params;
        let job_id = DbId::now_v7();

        let row = CreateGeneration {
            id: job_id,
            user_id: item.owner,
            model_id: params.model_id,
            subject_prompt: params.subject_prompt.clone(),
            style_prompt: params.style_prompt.clone(),
            reference_image_path: params.reference_image_url.clone(),
            seed: params.seed,
            reference_strength: params.reference_strength,
            view_angle: i16::from(params.view_angle),
            high_quality: item.effective_high_quality(),
            upgrade_of: item.kind.upgrade_of(),
            preset_id: Some(preset.id.clone()),
        };
        GenerationRepo::create(&self.pool, &row)
            .await
            .map_err(|e| SubmissionError::new(None, format!("Failed to create job record: {e}")))?;

        let inputs = WorkflowInputs {
            generation_id: job_id,
            model_file_name: &params.model_file_name,
            reference_image_name: &params.reference_image_name,
            style_prompt: &params.style_prompt,
            subject_prompt: &params.subject_prompt,
            seed: params.seed,
        };
        let graph = self
            .template
            .materialize(&inputs, preset, &self.webhook)
            .map_err(|e| SubmissionError::new(Some(job_id), e.to_string()))?;

        let response = self
            .api
            .submit_workflow(&graph, &format!("texgen-{job_id}"))
            .await
            .map_err(|e| SubmissionError::new(Some(job_id), e.to_string()))?;

        if let Err(e) = GenerationRepo::set_prompt_id(&self.pool, job_id, &response.prompt_id).await {
            tracing::warn!(
                job_id = %job_id,
                prompt_id = %response.prompt_id,
                error = %e,
                "Failed to store prompt id",
            );
        }

        tracing::info!(
            job_id = %job_id,
            item_id = %item.id,
            prompt_id = %response.prompt_id,
            queue_position = response.number,
            preset = %preset.id,
            "Job submitted to ComfyUI",
        );
        Ok(job_id)
    }

    async fn interrupt(&self) -> Result<(), BackendError> {
        Ok(self.api.interrupt().await?)
    }

    async fn delete_queued(&self, prompt_ids: &[String]) -> Result<(), BackendError> {
        Ok(self.api.delete_queued(prompt_ids).await?)
    }

    async fn clear_queued(&self) -> Result<(), BackendError> {
        Ok(self.api.clear_queue().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_error_displays_backend_text() {
        let err = SubmissionError::new(None, "connection refused");
        assert_eq!(err.to_string(), "Submission failed: connection refused");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn backend_error_wraps_api_error() {
        let err: BackendError = ComfyUIApiError::ApiError {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert!(err.to_string().contains("boom"));
    }
}
