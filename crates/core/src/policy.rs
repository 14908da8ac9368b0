//! Timing policy of the queue sequencer.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default completion poll interval (10 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-job polling ceiling (45 minutes).
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Default pause before the next item after a finished job.
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_millis(2000);

/// Default pause before the next item after a failed submission.
pub const DEFAULT_FAILURE_DELAY: Duration = Duration::from_millis(1000);

/// How the two lanes share the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneMode {
    /// Both lanes contend for a single submission slot, so at most one job
    /// is in flight across the whole service.
    Shared,
    /// Each lane runs on its own; two jobs may be in flight at once.
    Independent,
}

impl FromStr for LaneMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(LaneMode::Shared),
            "independent" => Ok(LaneMode::Independent),
            other => Err(CoreError::Validation(format!(
                "Unknown lane mode '{other}', expected 'shared' or 'independent'"
            ))),
        }
    }
}

/// Single source of truth for sequencer timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePolicy {
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    pub inter_item_delay: Duration,
    pub failure_delay: Duration,
    pub lane_mode: LaneMode,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
            failure_delay: DEFAULT_FAILURE_DELAY,
            lane_mode: LaneMode::Shared,
        }
    }
}

impl QueuePolicy {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation("poll interval must be positive".into()));
        }
        if self.job_timeout < self.poll_interval {
            return Err(CoreError::Validation(
                "job timeout must be at least one poll interval".into(),
            ));
        }
        Ok(())
    }
}
