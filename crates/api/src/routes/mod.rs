pub mod comfyui;
pub mod generations;
pub mod health;
pub mod presets;
pub mod queue;
pub mod session;
pub mod webhook;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                  WebSocket push (token in query)
///
/// /queue                               status (GET), enqueue (POST)
/// /queue/stop                          stop all (POST, admin)
/// /queue/{id}                          dequeue (DELETE, owner or admin)
/// /queue/{lane}/start                  arm lane (POST)
/// /queue/{lane}/cancel                 cancel awaiting job (POST, owner or admin)
/// /queue/{lane}/clear                  clear lane (POST, admin)
///
/// /generations                         own history (GET)
/// /generations/{id}                    get, delete (owner or admin)
///
/// /session                             applied textures and pairs (GET)
/// /notifications/current               visible notification (GET), dismiss (DELETE)
///
/// /presets                             list (GET)
/// /presets/active                      switch (PUT, admin)
///
/// /comfyui/queue                       backend queue (GET), clear/delete (POST, admin)
/// /comfyui/stats                       system stats (GET)
/// /comfyui/history/{prompt_id}         prompt history (GET)
/// /comfyui/interrupt                   interrupt (POST, admin)
///
/// /webhook/comfyui                     completion webhook (POST, shared secret)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/queue", queue::router())
        .nest("/generations", generations::router())
        .merge(session::router())
        .nest("/presets", presets::router())
        .nest("/comfyui", comfyui::router())
        .nest("/webhook", webhook::router())
}
