//! Session state and the visible notification.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use texgen_core::notification::Notification;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CurrentNotification {
    /// Message prefixed with its severity glyph.
    pub text: String,
    #[serde(flatten)]
    pub notification: Notification,
}

/// GET /api/v1/session
///
/// Applied textures, previews and generation pairs, with the caller's
/// history only.
pub async fn get_session(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let mut snapshot = state.sequencer.session().snapshot();
    snapshot.history.retain(|owner, _| *owner == auth.user_id);
    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /api/v1/notifications/current
///
/// The notification still visible, unless it belongs to another user.
pub async fn get_current_notification(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let current = state
        .sequencer
        .notifier()
        .current()
        .filter(|n| n.user_id.map_or(true, |owner| owner == auth.user_id))
        .map(|notification| CurrentNotification {
            text: notification.display_text(),
            notification,
        });
    Ok(Json(DataResponse { data: current }))
}

/// DELETE /api/v1/notifications/current
pub async fn dismiss_notification(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    state.sequencer.notifier().dismiss();
    Ok(StatusCode::NO_CONTENT)
}
