//! Generation queue pipeline.
//!
//! [`QueueStore`] holds items not yet submitted, [`JobSubmitter`] hands an
//! item to the render backend, [`CompletionPoller`] watches the job row and
//! [`Sequencer`] ties them together, one job at a time per lane.

pub mod poller;
pub mod presets;
pub mod records;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod submitter;

#[cfg(test)]
mod test_support;

pub use poller::{CompletionPoller, PollEvent};
pub use presets::PresetRegistry;
pub use records::{JobRecord, JobRecords, PgJobRecords, RecordsError};
pub use sequencer::{LaneState, QueueStatus, Sequencer, StopSummary};
pub use session::SessionState;
pub use store::QueueStore;
pub use submitter::{BackendError, ComfyUISubmitter, JobSubmitter, SubmissionError};
