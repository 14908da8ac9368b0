use axum::routing::{get, post};
use axum::Router;

use crate::handlers::comfyui;
use crate::state::AppState;

/// Routes mounted at `/comfyui`.
///
/// ```text
/// GET  /queue                -> get_backend_queue
/// POST /queue                -> control_backend_queue (admin)
/// GET  /stats                -> get_system_stats
/// GET  /history/{prompt_id}  -> get_prompt_history
/// GET  /models               -> list_models
/// POST /interrupt            -> interrupt (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/queue",
            get(comfyui::get_backend_queue).post(comfyui::control_backend_queue),
        )
        .route("/stats", get(comfyui::get_system_stats))
        .route("/history/{prompt_id}", get(comfyui::get_prompt_history))
        .route("/models", get(comfyui::list_models))
        .route("/interrupt", post(comfyui::interrupt))
}
