//! Model preset selection.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use texgen_core::preset::ModelPreset;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PresetList {
    pub active: String,
    pub presets: Vec<ModelPreset>,
}

#[derive(Debug, Deserialize)]
pub struct SetActivePreset {
    pub id: String,
}

/// GET /api/v1/presets
pub async fn list_presets(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let registry = state.sequencer.presets();
    Ok(Json(DataResponse {
        data: PresetList {
            active: registry.active().id,
            presets: registry.list().to_vec(),
        },
    }))
}

/// PUT /api/v1/presets/active
///
/// Switch the preset used for every later submission. Admin only.
pub async fn set_active_preset(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<SetActivePreset>,
) -> AppResult<impl IntoResponse> {
    let preset = state.sequencer.presets().set_active(&input.id)?;
    tracing::info!(preset = %preset.id, admin_id = %admin.user_id, "Active preset set by admin");
    Ok(Json(DataResponse { data: preset }))
}
