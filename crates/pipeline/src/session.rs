//! Session state fed by the sequencer: applied textures, previews, history
//! and generation pairs.
//!
//! Completion is applied at most once per job id.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::Serialize;
use texgen_core::generation::{Artifacts, GenerationPair, PreviewSet, TextureSet};
use texgen_core::types::DbId;

use crate::records::JobRecord;

/// Serializable view of the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    /// Job whose textures are currently applied.
    pub current_job: Option<DbId>,
    pub current_textures: TextureSet,
    pub previews: HashMap<DbId, PreviewSet>,
    pub pairs: Vec<GenerationPair>,
    /// History rows per user, newest first.
    pub history: HashMap<DbId, Vec<HistoryEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: DbId,
    pub status: texgen_core::generation::JobStatus,
    pub high_quality: bool,
    pub thumbnail: Option<String>,
    pub created_at: texgen_core::types::Timestamp,
}

impl From<&JobRecord> for HistoryEntry {
    fn from(r: &JobRecord) -> Self {
        Self {
            id: r.id,
            status: r.status,
            high_quality: r.high_quality,
            thumbnail: r.artifacts.textures.thumbnail.clone(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    applied: HashSet<DbId>,
    current_job: Option<DbId>,
    current_textures: TextureSet,
    previews: HashMap<DbId, PreviewSet>,
    pairs: HashMap<DbId, GenerationPair>,
    history: HashMap<DbId, Vec<HistoryEntry>>,
}

#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<Inner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a completed job's artifacts.
    ///
    /// Returns `false` without touching state if this job was already
    /// applied.
    pub fn apply_completion(
        &self,
        job_id: DbId,
        artifacts: &Artifacts,
        high_quality: bool,
        upgrade_of: Option<DbId>,
    ) -> bool {
        let mut inner = self.lock();
        if !inner.applied.insert(job_id) {
            return false;
        }
        inner.current_job = Some(job_id);
        inner.current_textures = artifacts.textures.clone();
        if !artifacts.previews.is_empty() {
            inner.previews.insert(job_id, artifacts.previews.clone());
        }

        match upgrade_of {
            Some(original) => {
                let textures = artifacts.textures.clone();
                inner
                    .pairs
                    .entry(original)
                    .or_insert_with(|| GenerationPair::from_completed(original, false, TextureSet::default()))
                    .finish_upgrade(job_id, textures);
            }
            None => {
                inner.pairs.insert(
                    job_id,
                    GenerationPair::from_completed(job_id, high_quality, artifacts.textures.clone()),
                );
            }
        }
        true
    }

    pub fn apply_preview(&self, job_id: DbId, previews: PreviewSet) {
        self.lock().previews.insert(job_id, previews);
    }

    /// Mark the pair of `original` as upgrading, if such a pair exists.
    pub fn begin_upgrade(&self, original: DbId) -> bool {
        match self.lock().pairs.get_mut(&original) {
            Some(pair) => {
                pair.begin_upgrade();
                true
            }
            None => false,
        }
    }

    /// An upgrade of `original` ended without textures.
    pub fn abort_upgrade(&self, original: DbId) {
        if let Some(pair) = self.lock().pairs.get_mut(&original) {
            pair.abort_upgrade();
        }
    }

    pub fn set_history(&self, owner: DbId, records: &[JobRecord]) {
        let entries = records.iter().map(HistoryEntry::from).collect();
        self.lock().history.insert(owner, entries);
    }

    pub fn is_applied(&self, job_id: DbId) -> bool {
        self.lock().applied.contains(&job_id)
    }

    pub fn pair(&self, id: DbId) -> Option<GenerationPair> {
        self.lock().pairs.get(&id).cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let mut pairs: Vec<_> = inner.pairs.values().cloned().collect();
        pairs.sort_by_key(|p| p.id);
        SessionSnapshot {
            current_job: inner.current_job,
            current_textures: inner.current_textures.clone(),
            previews: inner.previews.clone(),
            pairs,
            history: inner.history.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
