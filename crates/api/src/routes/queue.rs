//! Route definitions for the generation queue.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

/// Routes mounted at `/queue`.
///
/// ```text
/// GET    /               -> get_queue_status
/// POST   /               -> enqueue
/// POST   /stop           -> stop_all
/// DELETE /{id}           -> dequeue
/// POST   /{lane}/start   -> start_lane
/// POST   /{lane}/cancel  -> cancel_current
/// POST   /{lane}/clear   -> clear_lane
/// ```
///
/// The router needs one parameter name per segment, so the item id and the
/// lane name share `{key}`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(queue::get_queue_status).post(queue::enqueue))
        .route("/stop", post(queue::stop_all))
        .route("/{key}", delete(queue::dequeue))
        .route("/{key}/start", post(queue::start_lane))
        .route("/{key}/cancel", post(queue::cancel_current))
        .route("/{key}/clear", post(queue::clear_lane))
}
