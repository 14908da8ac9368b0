//! Handlers for the generation history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use texgen_core::error::CoreError;
use texgen_core::types::DbId;
use texgen_db::models::generation::{Generation, GenerationListQuery};
use texgen_db::repositories::GenerationRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/generations
///
/// The caller's generations, newest first.
pub async fn list_generations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<GenerationListQuery>,
) -> AppResult<impl IntoResponse> {
    let rows = GenerationRepo::list_for_user(&state.pool, auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/generations/{id}
pub async fn get_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let generation = find_controlled(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: generation }))
}

/// DELETE /api/v1/generations/{id}
///
/// A job still being polled ends as vanished on its next tick.
pub async fn delete_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_controlled(&state, &auth, id).await?;
    GenerationRepo::delete(&state.pool, id).await?;
    tracing::info!(generation_id = %id, user_id = %auth.user_id, "Generation deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---- private helpers ----

async fn find_controlled(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<Generation> {
    let generation = GenerationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Generation",
            id,
        })?;
    auth.ensure_can_control(generation.user_id)?;
    Ok(generation)
}
