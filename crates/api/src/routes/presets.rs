use axum::routing::{get, put};
use axum::Router;

use crate::handlers::presets;
use crate::state::AppState;

/// Routes mounted at `/presets`.
///
/// ```text
/// GET /        -> list_presets
/// PUT /active  -> set_active_preset (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(presets::list_presets))
        .route("/active", put(presets::set_active_preset))
}
