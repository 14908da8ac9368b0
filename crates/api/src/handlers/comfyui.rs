//! Passthrough to the render backend's queue and status endpoints.
//!
//! Reads are open to any user; queue control and interrupt are admin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for POST /comfyui/queue, mirroring ComfyUI's own
/// `POST /queue`.
#[derive(Debug, Deserialize)]
pub struct QueueControlRequest {
    #[serde(default)]
    pub clear: bool,
    /// Prompt ids to drop from the pending queue.
    #[serde(default)]
    pub delete: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BackendQueueView {
    pub running: usize,
    pub pending: usize,
    pub queue_running: Vec<serde_json::Value>,
    pub queue_pending: Vec<serde_json::Value>,
}

/// GET /api/v1/comfyui/queue
pub async fn get_backend_queue(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.comfyui.get_queue().await?;
    Ok(Json(DataResponse {
        data: BackendQueueView {
            running: snapshot.running_count(),
            pending: snapshot.pending_count(),
            queue_running: snapshot.queue_running,
            queue_pending: snapshot.queue_pending,
        },
    }))
}

/// GET /api/v1/comfyui/stats
pub async fn get_system_stats(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = state.comfyui.system_stats().await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/comfyui/history/{prompt_id}
pub async fn get_prompt_history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let history = state.comfyui.get_history(&prompt_id).await?;
    Ok(Json(DataResponse { data: history }))
}

/// GET /api/v1/comfyui/models
///
/// Checkpoints installed on the backend, sorted by display name.
pub async fn list_models(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let models = state.comfyui.list_checkpoints().await?;
    Ok(Json(DataResponse { data: models }))
}

/// POST /api/v1/comfyui/queue
///
/// Clear the backend's pending queue or delete specific prompts. Admin only.
pub async fn control_backend_queue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<QueueControlRequest>,
) -> AppResult<StatusCode> {
    if !input.clear && input.delete.is_empty() {
        return Err(AppError::BadRequest(
            "Expected `clear: true` or a non-empty `delete` list".into(),
        ));
    }
    if input.clear {
        state.comfyui.clear_queue().await?;
        tracing::info!(admin_id = %admin.user_id, "ComfyUI queue cleared");
    }
    if !input.delete.is_empty() {
        state.comfyui.delete_queued(&input.delete).await?;
        tracing::info!(
            admin_id = %admin.user_id,
            count = input.delete.len(),
            "ComfyUI prompts deleted",
        );
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/comfyui/interrupt
///
/// Interrupt whatever the backend is executing. The job row is left alone;
/// use the lane cancel route to also release the lane. Admin only.
pub async fn interrupt(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    state.comfyui.interrupt().await?;
    tracing::warn!(admin_id = %admin.user_id, "ComfyUI execution interrupted");
    Ok(StatusCode::NO_CONTENT)
}
