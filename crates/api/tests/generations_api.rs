//! Generation history endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, token};
use sqlx::PgPool;
use texgen_core::roles::{ROLE_ADMIN, ROLE_USER};
use texgen_core::types::DbId;

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_returns_only_callers_generations(pool: PgPool) {
    let alice = DbId::new_v4();
    let bob = DbId::new_v4();
    let first = common::insert_generation(&pool, alice, false).await;
    let second = common::insert_completed(&pool, alice, false).await;
    common::insert_generation(&pool, bob, false).await;

    let response = get_auth(
        common::build_test_app(pool),
        "/api/v1/generations",
        &token(alice, ROLE_USER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Newest first.
    assert_eq!(rows[0]["id"], second.id.to_string());
    assert_eq!(rows[0]["status"], "completed");
    assert_eq!(rows[1]["id"], first.id.to_string());
    assert!(rows.iter().all(|r| r["user_id"] == alice.to_string()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_honours_limit(pool: PgPool) {
    let owner = DbId::new_v4();
    for _ in 0..3 {
        common::insert_generation(&pool, owner, false).await;
    }

    let response = get_auth(
        common::build_test_app(pool),
        "/api/v1/generations?limit=2",
        &token(owner, ROLE_USER),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn another_users_generation_is_forbidden_but_admin_may_read(pool: PgPool) {
    let owner = DbId::new_v4();
    let row = common::insert_generation(&pool, owner, false).await;
    let uri = format!("/api/v1/generations/{}", row.id);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        &uri,
        &token(DbId::new_v4(), ROLE_USER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        &uri,
        &token(DbId::new_v4(), ROLE_ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], owner.to_string());
    assert_eq!(json["data"]["status"], "processing");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_generation_is_404(pool: PgPool) {
    let response = get_auth(
        common::build_test_app(pool),
        &format!("/api/v1/generations/{}", DbId::new_v4()),
        &token(DbId::new_v4(), ROLE_USER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_deletes_generation(pool: PgPool) {
    let owner = DbId::new_v4();
    let row = common::insert_completed(&pool, owner, false).await;
    let uri = format!("/api/v1/generations/{}", row.id);
    let tok = token(owner, ROLE_USER);

    let response = delete_auth(common::build_test_app(pool.clone()), &uri, &tok).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(common::build_test_app(pool), &uri, &tok).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_owner_cannot_delete(pool: PgPool) {
    let row = common::insert_completed(&pool, DbId::new_v4(), false).await;

    let response = delete_auth(
        common::build_test_app(pool),
        &format!("/api/v1/generations/{}", row.id),
        &token(DbId::new_v4(), ROLE_USER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
