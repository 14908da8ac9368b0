//! Completion webhook: caller verification and row updates.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, WEBHOOK_SECRET};
use serde_json::json;
use sqlx::PgPool;
use texgen_core::generation::JobStatus;
use texgen_core::types::DbId;
use texgen_core::webhook::{compute_webhook_hmac, SECRET_HEADER, SIGNATURE_HEADER};
use texgen_db::repositories::GenerationRepo;
use tower::ServiceExt;

const URI: &str = "/api/v1/webhook/comfyui";

async fn post_webhook(
    pool: PgPool,
    header: Option<(&str, String)>,
    body: serde_json::Value,
) -> axum::http::Response<Body> {
    let body = body.to_string();
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(URI)
        .header("content-type", "application/json");
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    common::build_test_app(pool)
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

fn with_secret() -> Option<(&'static str, String)> {
    Some((SECRET_HEADER, WEBHOOK_SECRET.to_string()))
}

fn textures_for(id: DbId) -> serde_json::Value {
    json!({
        "generationId": id,
        "textures": {
            "diffuse": format!("{id}/diffuse.png"),
            "normal": format!("{id}/normal.png"),
        },
        "previews": { "depth": format!("{id}/depth.png") },
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_or_wrong_secret_is_rejected(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;

    let response = post_webhook(pool.clone(), None, textures_for(row.id)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_webhook(
        pool.clone(),
        Some((SECRET_HEADER, "not-the-secret".to_string())),
        textures_for(row.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let row = GenerationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(row.status().unwrap(), JobStatus::Processing);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn textures_complete_the_generation(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;

    let response = post_webhook(pool.clone(), with_secret(), textures_for(row.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["outcome"], "completed");
    assert_eq!(json["data"]["generation_id"], row.id.to_string());

    let row = GenerationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(row.status().unwrap(), JobStatus::Completed);
    assert_eq!(
        row.diffuse_storage_path.as_deref(),
        Some(format!("{}/diffuse.png", row.id).as_str())
    );
    assert!(row.height_storage_path.is_none());
    assert!(row.depth_preview_path.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signed_previews_update_a_processing_row(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;
    let body = json!({
        "generationId": row.id,
        "previews": { "front": format!("{}/front.png", row.id) },
    });
    let signature = compute_webhook_hmac(WEBHOOK_SECRET, body.to_string().as_bytes());

    let response = post_webhook(pool.clone(), Some((SIGNATURE_HEADER, signature)), body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["outcome"], "previews_updated");

    let row = GenerationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(row.status().unwrap(), JobStatus::Processing);
    assert!(row.front_preview_path.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bad_signature_is_rejected(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;
    let signature = compute_webhook_hmac("some-other-secret", b"{}");

    let response = post_webhook(pool, Some((SIGNATURE_HEADER, signature)), textures_for(row.id)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_payload_is_bad_request(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;

    let response = post_webhook(pool, with_secret(), json!({ "generationId": row.id })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_payload_is_bad_request(pool: PgPool) {
    let response = post_webhook(pool, with_secret(), json!({ "textures": {} })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_generation_is_404(pool: PgPool) {
    let response = post_webhook(pool, with_secret(), textures_for(DbId::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_completion_is_conflict(pool: PgPool) {
    let row = common::insert_generation(&pool, DbId::new_v4(), false).await;

    let first = post_webhook(pool.clone(), with_secret(), textures_for(row.id)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_webhook(pool, with_secret(), textures_for(row.id)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["code"], "CONFLICT");
}
