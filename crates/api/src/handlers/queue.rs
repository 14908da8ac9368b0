//! Handlers for the generation queue.
//!
//! Every route requires authentication. Clearing a lane and stopping all
//! work are admin only; dequeue and cancel are limited to the owner or an
//! admin.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use texgen_core::error::CoreError;
use texgen_core::generation::JobStatus;
use texgen_core::queue::{GenerationParams, Lane, QueueItem, QueueItemKind};
use texgen_core::types::DbId;
use texgen_db::repositories::GenerationRepo;
use texgen_pipeline::LaneState;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for POST /queue.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default = "default_lane")]
    pub lane: Lane,
    pub params: GenerationParams,
    /// Completed generation to redo at high quality.
    #[serde(default)]
    pub upgrade_of: Option<DbId>,
}

fn default_lane() -> Lane {
    Lane::Continuous
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub lane: Lane,
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// Status and enqueue
// ---------------------------------------------------------------------------

/// GET /api/v1/queue
///
/// Pending items, total count and the state of each lane.
pub async fn get_queue_status(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.sequencer.status(),
    }))
}

/// POST /api/v1/queue
///
/// Enqueue a generation (or an upgrade of a completed one) owned by the
/// caller. Continuous items start draining immediately.
pub async fn enqueue(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EnqueueRequest>,
) -> AppResult<impl IntoResponse> {
    input.params.validate()?;

    let kind = match input.upgrade_of {
        Some(original) => {
            check_upgradable(&state, &auth, original).await?;
            QueueItemKind::Upgrade {
                original_job_id: original,
            }
        }
        None => QueueItemKind::Generation,
    };

    let item = state.sequencer.enqueue(QueueItem::new(
        input.lane,
        kind,
        auth.user_id,
        input.params,
    ));

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// DELETE /api/v1/queue/{id}
///
/// Remove a pending item by its id or by the job id it upgrades.
pub async fn dequeue(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let item = state.sequencer.store().find(id).ok_or(CoreError::NotFound {
        entity: "QueueItem",
        id,
    })?;
    auth.ensure_can_control(item.owner)?;

    // The lane may have taken the item since the lookup.
    state
        .sequencer
        .dequeue(id)
        .ok_or(CoreError::NotFound {
            entity: "QueueItem",
            id,
        })?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lane control
// ---------------------------------------------------------------------------

/// POST /api/v1/queue/{lane}/start
///
/// Arm a lane so it drains what it holds. Required for the batch lane.
pub async fn start_lane(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lane): Path<String>,
) -> AppResult<impl IntoResponse> {
    let lane: Lane = lane.parse()?;
    tracing::info!(lane = %lane, user_id = %auth.user_id, "Lane start requested");
    state.sequencer.start_lane(lane);
    Ok(Json(DataResponse {
        data: state.sequencer.status(),
    }))
}

/// POST /api/v1/queue/{lane}/cancel
///
/// Cancel the job the lane is currently awaiting. The lane moves on to its
/// next item.
pub async fn cancel_current(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lane): Path<String>,
) -> AppResult<impl IntoResponse> {
    let lane: Lane = lane.parse()?;
    let nothing_awaiting =
        || CoreError::Conflict(format!("No job is awaiting completion on the {lane} lane"));

    let LaneState::Awaiting { owner, .. } = state.sequencer.lane_state(lane) else {
        return Err(nothing_awaiting().into());
    };
    auth.ensure_can_control(owner)?;

    let job_id = state
        .sequencer
        .cancel_current(lane, auth.user_id)
        .ok_or_else(nothing_awaiting)?;

    Ok(Json(DataResponse {
        data: CancelResponse { job_id },
    }))
}

/// POST /api/v1/queue/{lane}/clear
///
/// Empty a lane and cancel its current job. Admin only.
pub async fn clear_lane(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(lane): Path<String>,
) -> AppResult<impl IntoResponse> {
    let lane: Lane = lane.parse()?;
    let removed = state.sequencer.clear_lane(lane, admin.user_id);
    Ok(Json(DataResponse {
        data: ClearResponse { lane, removed },
    }))
}

/// POST /api/v1/queue/stop
///
/// Stop everything: clear both lanes and the backend queue, interrupt the
/// running job and fail every processing row. Admin only.
pub async fn stop_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let summary = state.sequencer.stop_all(admin.user_id).await;
    Ok(Json(DataResponse { data: summary }))
}

// ---- private helpers ----

/// An upgrade needs a completed, fast, caller-controlled generation with no
/// other upgrade queued or running.
async fn check_upgradable(state: &AppState, auth: &AuthUser, original: DbId) -> AppResult<()> {
    let generation = GenerationRepo::find_by_id(&state.pool, original)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Generation",
            id: original,
        })?;
    auth.ensure_can_control(generation.user_id)?;

    if generation.status()? != JobStatus::Completed {
        return Err(AppError::Core(CoreError::Conflict(
            "Only completed generations can be upgraded".into(),
        )));
    }
    if generation.high_quality {
        return Err(AppError::Core(CoreError::Conflict(
            "Generation is already high quality".into(),
        )));
    }
    if state.sequencer.upgrade_pending(original) {
        return Err(AppError::Core(CoreError::Conflict(
            "An upgrade of this generation is already queued or running".into(),
        )));
    }
    Ok(())
}
