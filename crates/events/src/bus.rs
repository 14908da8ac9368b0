//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Shared via `Arc<EventBus>` between the sequencer, the webhook handler and
//! the WebSocket router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use texgen_core::queue::Lane;
use texgen_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// Something that happened to a job or a lane.
///
/// Built with [`PlatformEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, see `texgen_core::job_events`.
    pub event_type: String,

    pub job_id: Option<DbId>,

    pub lane: Option<Lane>,

    /// User the event concerns. `None` means every connected client.
    pub owner_user_id: Option<DbId>,

    /// User that triggered the event, when it was a user action.
    pub actor_user_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            job_id: None,
            lane: None,
            owner_user_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_job(mut self, job_id: DbId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn with_owner(mut self, user_id: DbId) -> Self {
        self.owner_user_id = Some(user_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Slow receivers observe `RecvError::Lagged` once the buffer overflows.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: PlatformEvent) {
        // A SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_enriched_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let job = DbId::new_v4();
        let owner = DbId::new_v4();

        bus.publish(
            PlatformEvent::new("job.completed")
                .with_job(job)
                .with_lane(Lane::Batch)
                .with_owner(owner)
                .with_payload(serde_json::json!({"diffuse": "a.png"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "job.completed");
        assert_eq!(received.job_id, Some(job));
        assert_eq!(received.lane, Some(Lane::Batch));
        assert_eq!(received.owner_user_id, Some(owner));
        assert!(received.actor_user_id.is_none());
        assert_eq!(received.payload["diffuse"], "a.png");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PlatformEvent::new("queue.drained"));

        assert_eq!(rx1.recv().await.unwrap().event_type, "queue.drained");
        assert_eq!(rx2.recv().await.unwrap().event_type, "queue.drained");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(PlatformEvent::new("orphan.event"));
    }
}
