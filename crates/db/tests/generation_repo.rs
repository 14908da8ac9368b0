//! Integration tests for the generations repository.

use sqlx::PgPool;
use texgen_core::generation::{JobStatus, PreviewSet, TextureSet};
use texgen_core::types::DbId;
use texgen_db::models::generation::{CreateGeneration, GenerationListQuery};
use texgen_db::repositories::GenerationRepo;

fn new_generation(user_id: DbId) -> CreateGeneration {
    CreateGeneration {
        id: DbId::now_v7(),
        user_id,
        model_id: DbId::new_v4(),
        subject_prompt: "barrel".into(),
        style_prompt: "rusted iron".into(),
        reference_image_path: "refs/barrel.png".into(),
        seed: 7,
        reference_strength: 0.7,
        view_angle: 1,
        high_quality: false,
        upgrade_of: None,
        preset_id: Some("standard-juggernaut".into()),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bootstrap(pool: PgPool) {
    texgen_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_starts_processing(pool: PgPool) {
    let user = DbId::new_v4();
    let row = GenerationRepo::create(&pool, &new_generation(user)).await.unwrap();
    assert_eq!(row.status().unwrap(), JobStatus::Processing);
    assert_eq!(row.user_id, user);

    GenerationRepo::set_prompt_id(&pool, row.id, "prompt-1").await.unwrap();
    let found = GenerationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(found.comfyui_prompt_id.as_deref(), Some("prompt-1"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complete_writes_textures_once(pool: PgPool) {
    let row = GenerationRepo::create(&pool, &new_generation(DbId::new_v4())).await.unwrap();
    let textures = TextureSet {
        diffuse: Some("out/diffuse.png".into()),
        normal: Some("out/normal.png".into()),
        height: None,
        thumbnail: Some("out/thumb.png".into()),
    };

    let done = GenerationRepo::complete(&pool, row.id, &textures, &PreviewSet::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status().unwrap(), JobStatus::Completed);
    assert_eq!(done.textures(), textures);

    // Terminal rows stay terminal.
    let again = GenerationRepo::complete(&pool, row.id, &textures, &PreviewSet::default())
        .await
        .unwrap();
    assert!(again.is_none());
    assert!(!GenerationRepo::fail(&pool, row.id, "late").await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_previews_do_not_change_status(pool: PgPool) {
    let row = GenerationRepo::create(&pool, &new_generation(DbId::new_v4())).await.unwrap();
    let previews = PreviewSet {
        depth: Some("prev/depth.png".into()),
        front: None,
    };
    assert!(GenerationRepo::update_previews(&pool, row.id, &previews).await.unwrap());

    let found = GenerationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(found.status().unwrap(), JobStatus::Processing);
    assert_eq!(found.previews(), previews);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fail_all_processing_only_touches_processing(pool: PgPool) {
    let user = DbId::new_v4();
    let a = GenerationRepo::create(&pool, &new_generation(user)).await.unwrap();
    let b = GenerationRepo::create(&pool, &new_generation(user)).await.unwrap();
    GenerationRepo::complete(&pool, b.id, &TextureSet::default(), &PreviewSet::default())
        .await
        .unwrap();

    let changed = GenerationRepo::fail_all_processing(&pool, "Manually interrupted")
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let a = GenerationRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(a.status().unwrap(), JobStatus::Failed);
    assert_eq!(a.error_message.as_deref(), Some("Manually interrupted"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_for_user_newest_first(pool: PgPool) {
    let user = DbId::new_v4();
    let first = GenerationRepo::create(&pool, &new_generation(user)).await.unwrap();
    let second = GenerationRepo::create(&pool, &new_generation(user)).await.unwrap();
    GenerationRepo::create(&pool, &new_generation(DbId::new_v4())).await.unwrap();

    let rows = GenerationRepo::list_for_user(&pool, user, &GenerationListQuery::default())
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_removes_row(pool: PgPool) {
    let row = GenerationRepo::create(&pool, &new_generation(DbId::new_v4())).await.unwrap();
    assert!(GenerationRepo::delete(&pool, row.id).await.unwrap());
    assert!(!GenerationRepo::delete(&pool, row.id).await.unwrap());
    assert!(GenerationRepo::find_by_id(&pool, row.id).await.unwrap().is_none());
}
