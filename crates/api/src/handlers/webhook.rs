//! Completion webhook called by the render backend's webhook node.
//!
//! Not behind JWT auth. When a webhook secret is configured the caller must
//! present it, either verbatim or as an HMAC-SHA256 signature of the body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use texgen_core::error::CoreError;
use texgen_core::generation::{PreviewSet, TextureSet};
use texgen_core::types::DbId;
use texgen_core::webhook::{
    secrets_match, verify_webhook_signature, SECRET_HEADER, SIGNATURE_HEADER,
};
use texgen_db::repositories::GenerationRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body posted by the webhook node.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "generationId")]
    pub generation_id: DbId,
    #[serde(default)]
    pub textures: TextureSet,
    #[serde(default)]
    pub previews: PreviewSet,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub generation_id: DbId,
    /// `"completed"` or `"previews_updated"`.
    pub outcome: &'static str,
}

/// POST /api/v1/webhook/comfyui
pub async fn comfyui_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = state.config.comfyui.webhook_secret.as_deref() {
        verify_caller(secret, &headers, &body)?;
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;
    let id = payload.generation_id;

    if !payload.textures.is_empty() {
        match GenerationRepo::complete(&state.pool, id, &payload.textures, &payload.previews)
            .await?
        {
            Some(_) => {
                tracing::info!(generation_id = %id, "Generation completed via webhook");
                return Ok(Json(DataResponse {
                    data: WebhookAck {
                        generation_id: id,
                        outcome: "completed",
                    },
                }));
            }
            None => return Err(not_processing(&state, id).await),
        }
    }

    if !payload.previews.is_empty() {
        if !GenerationRepo::update_previews(&state.pool, id, &payload.previews).await? {
            return Err(CoreError::NotFound {
                entity: "Generation",
                id,
            }
            .into());
        }
        tracing::debug!(generation_id = %id, "Preview artifacts stored via webhook");
        return Ok(Json(DataResponse {
            data: WebhookAck {
                generation_id: id,
                outcome: "previews_updated",
            },
        }));
    }

    Err(AppError::BadRequest(
        "Webhook carried neither textures nor previews".into(),
    ))
}

// ---- private helpers ----

fn verify_caller(secret: &str, headers: &HeaderMap, body: &[u8]) -> AppResult<()> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let by_secret = header(SECRET_HEADER).is_some_and(|s| secrets_match(secret, s));
    let by_signature =
        header(SIGNATURE_HEADER).is_some_and(|sig| verify_webhook_signature(secret, body, sig));

    if by_secret || by_signature {
        Ok(())
    } else {
        tracing::warn!("Rejected webhook with missing or invalid secret");
        Err(CoreError::Unauthorized("Invalid webhook secret".into()).into())
    }
}

/// Explain why a completion did not apply: missing row or already terminal.
async fn not_processing(state: &AppState, id: DbId) -> AppError {
    match GenerationRepo::find_by_id(&state.pool, id).await {
        Ok(Some(row)) => CoreError::Conflict(format!(
            "Generation {id} is already {}",
            row.status
        ))
        .into(),
        Ok(None) => CoreError::NotFound {
            entity: "Generation",
            id,
        }
        .into(),
        Err(e) => e.into(),
    }
}
