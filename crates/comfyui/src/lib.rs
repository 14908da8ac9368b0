//! ComfyUI render backend client.
//!
//! - [`api`]: HTTP wrappers for submission, interruption, queue control and
//!   the checkpoint catalogue.
//! - [`workflow`]: loads the texture workflow template and fills in
//!   per-job parameters.

pub mod api;
pub mod workflow;

pub use api::{parse_checkpoints, ComfyUIApi, ComfyUIApiError};
pub use workflow::{WebhookTarget, WorkflowError, WorkflowInputs, WorkflowTemplate};
