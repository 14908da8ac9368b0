//! Job status, produced artifacts and the session-level generation pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Status of a job row. `Completed` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CoreError::Internal(format!("Unknown job status '{other}'"))),
        }
    }
}

/// Final texture maps written by the completion webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSet {
    pub diffuse: Option<String>,
    pub normal: Option<String>,
    pub height: Option<String>,
    pub thumbnail: Option<String>,
}

impl TextureSet {
    pub fn is_empty(&self) -> bool {
        self.diffuse.is_none()
            && self.normal.is_none()
            && self.height.is_none()
            && self.thumbnail.is_none()
    }
}

/// Early artifacts that may arrive before completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSet {
    pub depth: Option<String>,
    pub front: Option<String>,
}

impl PreviewSet {
    pub fn is_empty(&self) -> bool {
        self.depth.is_none() && self.front.is_none()
    }
}

/// Full artifact set of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub textures: TextureSet,
    pub previews: PreviewSet,
}

/// Links a fast job with its optional high-fidelity upgrade.
///
/// Lives only for the session; keyed by the fast job's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPair {
    pub id: DbId,
    pub fast_job: Option<DbId>,
    pub hq_job: Option<DbId>,
    pub can_upgrade: bool,
    pub is_upgrading: bool,
    pub current_textures: TextureSet,
}

impl GenerationPair {
    /// Pair created when a job completes.
    ///
    /// A job that already ran at high quality has nothing to upgrade to.
    pub fn from_completed(job_id: DbId, high_quality: bool, textures: TextureSet) -> Self {
        Self {
            id: job_id,
            fast_job: (!high_quality).then_some(job_id),
            hq_job: high_quality.then_some(job_id),
            can_upgrade: !high_quality,
            is_upgrading: false,
            current_textures: textures,
        }
    }

    /// An upgrade of this pair was queued.
    pub fn begin_upgrade(&mut self) {
        self.is_upgrading = true;
    }

    /// The upgrade job completed.
    pub fn finish_upgrade(&mut self, hq_job: DbId, textures: TextureSet) {
        self.hq_job = Some(hq_job);
        self.is_upgrading = false;
        self.can_upgrade = false;
        self.current_textures = textures;
    }

    /// The upgrade job ended without textures.
    pub fn abort_upgrade(&mut self) {
        self.is_upgrading = false;
    }
}
