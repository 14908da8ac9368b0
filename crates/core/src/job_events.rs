//! Event type names published on the event bus and pushed to WebSocket
//! clients as the `type` field of each message.

/// A queue item was accepted by the render backend.
pub const JOB_SUBMITTED: &str = "job.submitted";

/// The render backend rejected or could not be reached for a queue item.
pub const JOB_SUBMISSION_FAILED: &str = "job.submission_failed";

/// New preview artifacts arrived before completion.
pub const JOB_PREVIEW: &str = "job.preview";

/// Job completed and its textures were applied.
pub const JOB_COMPLETED: &str = "job.completed";

/// Job reached the `failed` state.
pub const JOB_FAILED: &str = "job.failed";

/// Job was cancelled by a user or admin, or its record vanished.
pub const JOB_CANCELLED: &str = "job.cancelled";

/// Job exceeded the polling ceiling.
pub const JOB_TIMED_OUT: &str = "job.timed_out";

/// Every lane is empty after processing at least one item.
pub const QUEUE_DRAINED: &str = "queue.drained";

/// A lane was cleared by an admin.
pub const QUEUE_CLEARED: &str = "queue.cleared";

/// A user-facing notification replaced the current one.
pub const NOTIFICATION: &str = "notification";
