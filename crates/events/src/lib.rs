//! Event bus and user notification slot.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the job/queue event envelope.
//! - [`Notifier`]: holds the single currently visible notification and
//!   republishes every new one on the bus.

pub mod bus;
pub mod notifier;

pub use bus::{EventBus, PlatformEvent};
pub use notifier::Notifier;
