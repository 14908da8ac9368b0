#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use texgen_api::auth::jwt::{generate_access_token, JwtConfig};
use texgen_api::config::{ComfyUIConfig, ServerConfig};
use texgen_api::router::build_app_router;
use texgen_api::state::AppState;
use texgen_api::ws::WsManager;
use texgen_comfyui::{ComfyUIApi, WebhookTarget, WorkflowTemplate};
use texgen_core::policy::QueuePolicy;
use texgen_core::types::DbId;
use texgen_events::{EventBus, Notifier};
use texgen_pipeline::{ComfyUISubmitter, JobSubmitter, PgJobRecords, Sequencer};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Nothing listens here; backend calls fail fast with a connection error.
const DEAD_BACKEND: &str = "http://127.0.0.1:9";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        comfyui: ComfyUIConfig {
            api_url: DEAD_BACKEND.to_string(),
            workflow_path: "unused.json".to_string(),
            webhook_url: "http://localhost:3000/api/v1/webhook/comfyui".to_string(),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        },
        queue: QueuePolicy::default(),
    }
}

/// Application state over `pool`.
///
/// The sequencer lanes are not spawned, so enqueued items stay queued and
/// tests can inspect them.
pub fn build_test_state(pool: PgPool) -> AppState {
    let config = test_config();
    let comfyui = Arc::new(ComfyUIApi::new(DEAD_BACKEND));
    let template = WorkflowTemplate::from_value(serde_json::json!({}))
        .expect("empty object is a valid template");
    let submitter = Arc::new(ComfyUISubmitter::new(
        pool.clone(),
        Arc::clone(&comfyui),
        template,
        WebhookTarget {
            url: config.comfyui.webhook_url.clone(),
            secret: config.comfyui.webhook_secret.clone(),
        },
    ));
    build_state_with(pool, submitter)
}

/// Application state whose sequencer submits through `submitter`.
pub fn build_state_with(pool: PgPool, submitter: Arc<dyn JobSubmitter>) -> AppState {
    let config = test_config();
    let comfyui = Arc::new(ComfyUIApi::new(DEAD_BACKEND));
    let records = Arc::new(PgJobRecords::new(pool.clone()));
    let event_bus = Arc::new(EventBus::default());
    let notifier = Arc::new(Notifier::new(Arc::clone(&event_bus)));
    let sequencer = Arc::new(Sequencer::new(
        config.queue.clone(),
        submitter,
        records,
        notifier,
    ));

    AppState {
        pool,
        config: Arc::new(config),
        ws_manager: Arc::new(WsManager::new()),
        sequencer,
        comfyui,
        event_bus,
    }
}

/// Full router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    app_for(build_test_state(pool))
}

pub fn app_for(state: AppState) -> Router {
    let config = test_config();
    build_app_router(state, &config)
}

pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// A valid enqueue body.
pub fn params_json(subject: &str) -> serde_json::Value {
    serde_json::json!({
        "model_id": DbId::new_v4(),
        "model_file_name": "crate.glb",
        "reference_image_url": "https://cdn.example.com/ref.png",
        "reference_image_name": "ref.png",
        "subject_prompt": subject,
        "style_prompt": "weathered oak",
        "seed": 1234
    })
}

/// Insert a `processing` generation row owned by `owner`.
pub async fn insert_generation(
    pool: &PgPool,
    owner: DbId,
    high_quality: bool,
) -> texgen_db::models::generation::Generation {
    use texgen_db::models::generation::CreateGeneration;
    use texgen_db::repositories::GenerationRepo;

    let input = CreateGeneration {
        id: DbId::now_v7(),
        user_id: owner,
        model_id: DbId::new_v4(),
        subject_prompt: "old crate".into(),
        style_prompt: "weathered oak".into(),
        reference_image_path: "ref.png".into(),
        seed: 7,
        reference_strength: 0.7,
        view_angle: 1,
        high_quality,
        upgrade_of: None,
        preset_id: None,
    };
    GenerationRepo::create(pool, &input).await.unwrap()
}

/// Insert a generation and mark it completed with a diffuse texture.
pub async fn insert_completed(
    pool: &PgPool,
    owner: DbId,
    high_quality: bool,
) -> texgen_db::models::generation::Generation {
    use texgen_core::generation::{PreviewSet, TextureSet};
    use texgen_db::repositories::GenerationRepo;

    let row = insert_generation(pool, owner, high_quality).await;
    let textures = TextureSet {
        diffuse: Some(format!("{}/diffuse.png", row.id)),
        ..Default::default()
    };
    GenerationRepo::complete(pool, row.id, &textures, &PreviewSet::default())
        .await
        .unwrap()
        .unwrap()
}
