use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes mounted at `/webhook`. Authenticated by shared secret, not JWT.
///
/// ```text
/// POST /comfyui  -> comfyui_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/comfyui", post(webhook::comfyui_webhook))
}
