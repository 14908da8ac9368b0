//! Repository for the `generations` table.
//!
//! Status transitions only ever leave `processing`; a terminal row is never
//! moved back.

use sqlx::PgPool;
use texgen_core::generation::{JobStatus, PreviewSet, TextureSet};
use texgen_core::types::DbId;

use crate::models::generation::{CreateGeneration, Generation, GenerationListQuery};

/// Column list for `generations` queries.
const COLUMNS: &str = "\
    id, user_id, model_id, subject_prompt, style_prompt, reference_image_path, \
    seed, reference_strength, view_angle, high_quality, upgrade_of, preset_id, \
    status, comfyui_prompt_id, error_message, \
    diffuse_storage_path, normal_storage_path, height_storage_path, \
    thumbnail_storage_path, depth_preview_path, front_preview_path, \
    created_at, updated_at";

/// Maximum page size for history listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for history listing.
const DEFAULT_LIMIT: i64 = 50;

pub struct GenerationRepo;

impl GenerationRepo {
    /// Insert a new row in the `processing` state.
    pub async fn create(pool: &PgPool, input: &CreateGeneration) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations \
                (id, user_id, model_id, subject_prompt, style_prompt, reference_image_path, \
                 seed, reference_strength, view_angle, high_quality, upgrade_of, preset_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(input.model_id)
            .bind(&input.subject_prompt)
            .bind(&input.style_prompt)
            .bind(&input.reference_image_path)
            .bind(input.seed)
            .bind(input.reference_strength)
            .bind(input.view_angle)
            .bind(input.high_quality)
            .bind(input.upgrade_of)
            .bind(&input.preset_id)
            .bind(JobStatus::Processing.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the render backend's prompt id after a successful submission.
    pub async fn set_prompt_id(pool: &PgPool, id: DbId, prompt_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE generations SET comfyui_prompt_id = $2 WHERE id = $1")
            .bind(id)
            .bind(prompt_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a row completed with its final textures.
    ///
    /// Previews, if given, are written too. Returns `None` if the row does
    /// not exist or is no longer `processing`.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        textures: &TextureSet,
        previews: &PreviewSet,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations SET \
                status = $2, \
                diffuse_storage_path = $3, normal_storage_path = $4, \
                height_storage_path = $5, thumbnail_storage_path = $6, \
                depth_preview_path = COALESCE($7, depth_preview_path), \
                front_preview_path = COALESCE($8, front_preview_path), \
                error_message = NULL \
             WHERE id = $1 AND status = $9 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(JobStatus::Completed.as_str())
            .bind(&textures.diffuse)
            .bind(&textures.normal)
            .bind(&textures.height)
            .bind(&textures.thumbnail)
            .bind(&previews.depth)
            .bind(&previews.front)
            .bind(JobStatus::Processing.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Store early preview artifacts without changing status.
    pub async fn update_previews(
        pool: &PgPool,
        id: DbId,
        previews: &PreviewSet,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generations SET \
                depth_preview_path = COALESCE($2, depth_preview_path), \
                front_preview_path = COALESCE($3, front_preview_path) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&previews.depth)
        .bind(&previews.front)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a `processing` row as failed. Returns `false` if the row was
    /// already terminal or does not exist.
    pub async fn fail(pool: &PgPool, id: DbId, error_message: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generations SET status = $2, error_message = $3 \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(JobStatus::Failed.as_str())
        .bind(error_message)
        .bind(JobStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail every `processing` row. Returns the number of rows changed.
    pub async fn fail_all_processing(pool: &PgPool, error_message: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generations SET status = $1, error_message = $2 WHERE status = $3",
        )
        .bind(JobStatus::Failed.as_str())
        .bind(error_message)
        .bind(JobStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// A user's history, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        params: &GenerationListQuery,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Hard-delete a row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
