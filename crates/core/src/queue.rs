//! Queue items and lanes.
//!
//! A [`QueueItem`] is a request that has not yet been handed to the render
//! backend. Its presence in a queue means "not yet submitted", never
//! "in flight".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Identity of a queue item. Time-ordered (UUID v7).
pub type QueueItemId = uuid::Uuid;

/// Default reference image strength when the client omits it.
pub const DEFAULT_REFERENCE_STRENGTH: f32 = 0.7;

/// Default camera angle when the client omits it.
pub const DEFAULT_VIEW_ANGLE: u8 = 1;

/// Valid view angles.
pub const VIEW_ANGLE_RANGE: std::ops::RangeInclusive<u8> = 1..=6;

/// Generate a fresh queue item id.
pub fn new_item_id() -> QueueItemId {
    uuid::Uuid::now_v7()
}

// ---------------------------------------------------------------------------
// Lane
// ---------------------------------------------------------------------------

/// An independently drained queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Auto-started as soon as an item arrives.
    Continuous,
    /// Held until someone starts the lane explicitly.
    Batch,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::Continuous, Lane::Batch];

    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Continuous => "continuous",
            Lane::Batch => "batch",
        }
    }

    /// Whether the lane starts draining on enqueue without an explicit start.
    pub fn auto_starts(self) -> bool {
        matches!(self, Lane::Continuous)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lane {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continuous" => Ok(Lane::Continuous),
            "batch" => Ok(Lane::Batch),
            other => Err(CoreError::Validation(format!(
                "Unknown lane '{other}', expected 'continuous' or 'batch'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Kind and parameters
// ---------------------------------------------------------------------------

/// What the item asks the backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueItemKind {
    /// A new job.
    Generation,
    /// Re-run of a completed job at high fidelity.
    Upgrade { original_job_id: DbId },
}

impl QueueItemKind {
    /// The original job this item upgrades, if any.
    pub fn upgrade_of(&self) -> Option<DbId> {
        match self {
            QueueItemKind::Generation => None,
            QueueItemKind::Upgrade { original_job_id } => Some(*original_job_id),
        }
    }
}

/// Everything the submitter needs to build a render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model_id: DbId,
    /// Name of the uploaded mesh as known to the render backend.
    pub model_file_name: String,
    pub reference_image_url: String,
    /// Name of the uploaded reference image as known to the render backend.
    pub reference_image_name: String,
    pub subject_prompt: String,
    pub style_prompt: String,
    pub seed: i64,
    #[serde(default = "default_reference_strength")]
    pub reference_strength: f32,
    #[serde(default)]
    pub high_quality: bool,
    #[serde(default = "default_view_angle")]
    pub view_angle: u8,
}

fn default_reference_strength() -> f32 {
    DEFAULT_REFERENCE_STRENGTH
}

fn default_view_angle() -> u8 {
    DEFAULT_VIEW_ANGLE
}

impl GenerationParams {
    /// Check the domain rules on the parameters.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.subject_prompt.trim().is_empty() {
            return Err(CoreError::Validation(
                "subject_prompt must not be empty".into(),
            ));
        }
        if self.style_prompt.trim().is_empty() {
            return Err(CoreError::Validation("style_prompt must not be empty".into()));
        }
        if self.model_file_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "model_file_name must not be empty".into(),
            ));
        }
        if self.reference_image_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "reference_image_name must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reference_strength) {
            return Err(CoreError::Validation(format!(
                "reference_strength must be between 0 and 1, got {}",
                self.reference_strength
            )));
        }
        if !VIEW_ANGLE_RANGE.contains(&self.view_angle) {
            return Err(CoreError::Validation(format!(
                "view_angle must be between 1 and 6, got {}",
                self.view_angle
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// A pending unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Nil until the store assigns one.
    pub id: QueueItemId,
    pub kind: QueueItemKind,
    pub lane: Lane,
    /// Submitting user. Used for authorization, not for partitioning.
    pub owner: DbId,
    pub params: GenerationParams,
    pub created_at: Timestamp,
}

impl QueueItem {
    /// Build an item without an id; the queue store assigns it on enqueue.
    pub fn new(lane: Lane, kind: QueueItemKind, owner: DbId, params: GenerationParams) -> Self {
        Self {
            id: QueueItemId::nil(),
            kind,
            lane,
            owner,
            params,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether this item matches `id`, either directly or through its
    /// upgrade back-reference.
    pub fn matches(&self, id: uuid::Uuid) -> bool {
        self.id == id || self.kind.upgrade_of() == Some(id)
    }

    /// Upgrades always run at high fidelity.
    pub fn effective_high_quality(&self) -> bool {
        self.params.high_quality || self.kind.upgrade_of().is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;

    use super::*;

    pub(crate) fn sample_params() -> GenerationParams {
        GenerationParams {
            model_id: DbId::new_v4(),
            model_file_name: "crate.glb".into(),
            reference_image_url: "https://cdn.example.com/ref.png".into(),
            reference_image_name: "ref.png".into(),
            subject_prompt: "wooden crate".into(),
            style_prompt: "weathered pine".into(),
            seed: 42,
            reference_strength: DEFAULT_REFERENCE_STRENGTH,
            high_quality: false,
            view_angle: DEFAULT_VIEW_ANGLE,
        }
    }

    #[test]
    fn valid_params_pass() {
        assert!(sample_params().validate().is_ok());
    }

    #[test]
    fn strength_outside_unit_interval_rejected() {
        let mut p = sample_params();
        p.reference_strength = 1.2;
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn view_angle_zero_rejected() {
        let mut p = sample_params();
        p.view_angle = 0;
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
        p.view_angle = 7;
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_prompt_rejected() {
        let mut p = sample_params();
        p.subject_prompt = "   ".into();
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn omitted_optional_fields_take_defaults() {
        let json = serde_json::json!({
            "model_id": DbId::new_v4(),
            "model_file_name": "m.glb",
            "reference_image_url": "u",
            "reference_image_name": "r.png",
            "subject_prompt": "s",
            "style_prompt": "t",
            "seed": 1
        });
        let p: GenerationParams = serde_json::from_value(json).unwrap();
        assert_eq!(p.reference_strength, DEFAULT_REFERENCE_STRENGTH);
        assert_eq!(p.view_angle, DEFAULT_VIEW_ANGLE);
        assert!(!p.high_quality);
    }

    #[test]
    fn upgrade_matches_back_reference() {
        let original = DbId::new_v4();
        let mut item = QueueItem::new(
            Lane::Continuous,
            QueueItemKind::Upgrade {
                original_job_id: original,
            },
            DbId::new_v4(),
            sample_params(),
        );
        item.id = new_item_id();
        assert!(item.matches(original));
        assert!(item.matches(item.id));
        assert!(!item.matches(DbId::new_v4()));
        assert!(item.effective_high_quality());
    }

    #[test]
    fn lane_parses_from_path_segment() {
        assert_eq!("batch".parse::<Lane>().unwrap(), Lane::Batch);
        assert_matches!("other".parse::<Lane>(), Err(CoreError::Validation(_)));
        assert!(Lane::Continuous.auto_starts());
        assert!(!Lane::Batch.auto_starts());
    }
}
