//! Checkpoints installed on the render backend, grouped by the family
//! their file name suggests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointCategory {
    Lightning,
    Turbo,
    Standard,
    Artistic,
}

impl CheckpointCategory {
    /// Category for a checkpoint's display name. Matching is
    /// case-insensitive and the first hit wins.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("lightning") {
            Self::Lightning
        } else if lower.contains("turbo") {
            Self::Turbo
        } else if lower.contains("artistic") || lower.contains("anime") {
            Self::Artistic
        } else {
            Self::Standard
        }
    }
}

/// One checkpoint as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Path relative to the backend's checkpoint directory, as it must be
    /// passed back in a workflow.
    pub path: String,
    /// File name without directories.
    pub name: String,
    /// File name without the `.safetensors` or `.ckpt` extension.
    pub display_name: String,
    pub category: CheckpointCategory,
}

impl CheckpointInfo {
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path).to_string();
        let display_name = name
            .strip_suffix(".safetensors")
            .or_else(|| name.strip_suffix(".ckpt"))
            .unwrap_or(&name)
            .to_string();
        Self {
            path: path.to_string(),
            category: CheckpointCategory::from_name(&display_name),
            name,
            display_name,
        }
    }
}

/// Catalogue entries for `paths`, ordered by display name ignoring case.
pub fn catalogue<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<CheckpointInfo> {
    let mut models: Vec<CheckpointInfo> = paths.into_iter().map(CheckpointInfo::from_path).collect();
    models.sort_by_cached_key(|m| m.display_name.to_lowercase());
    models
}
