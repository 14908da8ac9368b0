//! Read/write access to job rows as seen by the sequencer.
//!
//! The sequencer polls rows and only writes them to record failure or
//! cancellation; normal completion is written by the webhook handler.

use async_trait::async_trait;
use texgen_core::generation::{Artifacts, JobStatus};
use texgen_core::types::{DbId, Timestamp};
use texgen_db::models::generation::{Generation, GenerationListQuery};
use texgen_db::repositories::GenerationRepo;
use texgen_db::DbPool;

/// Error message stored on rows cancelled by a user or admin.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Error message stored on rows failed by a stop-all action.
pub const INTERRUPTED_MESSAGE: &str = "Manually interrupted";

/// A job row reduced to what the sequencer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: DbId,
    pub owner: DbId,
    pub status: JobStatus,
    pub high_quality: bool,
    pub upgrade_of: Option<DbId>,
    pub artifacts: Artifacts,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<Generation> for JobRecord {
    type Error = RecordsError;

    fn try_from(row: Generation) -> Result<Self, Self::Error> {
        let status = row
            .status()
            .map_err(|e| RecordsError::Corrupt(e.to_string()))?;
        let artifacts = row.artifacts();
        Ok(Self {
            id: row.id,
            owner: row.user_id,
            status,
            high_quality: row.high_quality,
            upgrade_of: row.upgrade_of,
            artifacts,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    /// The database could not be queried.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row holds a value the domain does not recognise.
    #[error("Corrupt job record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait JobRecords: Send + Sync {
    /// Current state of a job; `None` when the row no longer exists.
    async fn fetch(&self, job_id: DbId) -> Result<Option<JobRecord>, RecordsError>;

    /// Move a `processing` row to `failed`. Returns `false` if the row was
    /// already terminal or gone.
    async fn mark_failed(&self, job_id: DbId, message: &str) -> Result<bool, RecordsError>;

    /// Fail every `processing` row.
    async fn fail_all_processing(&self, message: &str) -> Result<u64, RecordsError>;

    /// A user's most recent jobs, newest first.
    async fn history(&self, owner: DbId, limit: i64) -> Result<Vec<JobRecord>, RecordsError>;
}

/// [`JobRecords`] over the `generations` table.
pub struct PgJobRecords {
    pool: DbPool,
}

impl PgJobRecords {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRecords for PgJobRecords {
    async fn fetch(&self, job_id: DbId) -> Result<Option<JobRecord>, RecordsError> {
        GenerationRepo::find_by_id(&self.pool, job_id)
            .await?
            .map(JobRecord::try_from)
            .transpose()
    }

    async fn mark_failed(&self, job_id: DbId, message: &str) -> Result<bool, RecordsError> {
        Ok(GenerationRepo::fail(&self.pool, job_id, message).await?)
    }

    async fn fail_all_processing(&self, message: &str) -> Result<u64, RecordsError> {
        Ok(GenerationRepo::fail_all_processing(&self.pool, message).await?)
    }

    async fn history(&self, owner: DbId, limit: i64) -> Result<Vec<JobRecord>, RecordsError> {
        let params = GenerationListQuery {
            limit: Some(limit),
            offset: None,
        };
        GenerationRepo::list_for_user(&self.pool, owner, &params)
            .await?
            .into_iter()
            .map(JobRecord::try_from)
            .collect()
    }
}
