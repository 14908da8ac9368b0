use axum::routing::get;
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Session and notification routes, merged at the `/api/v1` root.
///
/// ```text
/// GET    /session                -> get_session
/// GET    /notifications/current  -> get_current_notification
/// DELETE /notifications/current  -> dismiss_notification
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::get_session))
        .route(
            "/notifications/current",
            get(session::get_current_notification).delete(session::dismiss_notification),
        )
}
