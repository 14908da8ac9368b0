//! Generation rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use texgen_core::error::CoreError;
use texgen_core::generation::{Artifacts, JobStatus, PreviewSet, TextureSet};
use texgen_core::types::{DbId, Timestamp};

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub user_id: DbId,
    pub model_id: DbId,
    pub subject_prompt: String,
    pub style_prompt: String,
    pub reference_image_path: String,
    pub seed: i64,
    pub reference_strength: f32,
    pub view_angle: i16,
    pub high_quality: bool,
    pub upgrade_of: Option<DbId>,
    pub preset_id: Option<String>,
    pub status: String,
    pub comfyui_prompt_id: Option<String>,
    pub error_message: Option<String>,
    pub diffuse_storage_path: Option<String>,
    pub normal_storage_path: Option<String>,
    pub height_storage_path: Option<String>,
    pub thumbnail_storage_path: Option<String>,
    pub depth_preview_path: Option<String>,
    pub front_preview_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Generation {
    pub fn status(&self) -> Result<JobStatus, CoreError> {
        self.status.parse()
    }

    pub fn textures(&self) -> TextureSet {
        TextureSet {
            diffuse: self.diffuse_storage_path.clone(),
            normal: self.normal_storage_path.clone(),
            height: self.height_storage_path.clone(),
            thumbnail: self.thumbnail_storage_path.clone(),
        }
    }

    pub fn previews(&self) -> PreviewSet {
        PreviewSet {
            depth: self.depth_preview_path.clone(),
            front: self.front_preview_path.clone(),
        }
    }

    pub fn artifacts(&self) -> Artifacts {
        Artifacts {
            textures: self.textures(),
            previews: self.previews(),
        }
    }
}

/// DTO for inserting a new generation in the `processing` state.
#[derive(Debug, Clone)]
pub struct CreateGeneration {
    pub id: DbId,
    pub user_id: DbId,
    pub model_id: DbId,
    pub subject_prompt: String,
    pub style_prompt: String,
    pub reference_image_path: String,
    pub seed: i64,
    pub reference_strength: f32,
    pub view_angle: i16,
    pub high_quality: bool,
    pub upgrade_of: Option<DbId>,
    pub preset_id: Option<String>,
}

/// Query parameters for `GET /api/v1/generations`.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationListQuery {
    /// Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
