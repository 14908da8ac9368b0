//! Event-to-WebSocket routing.
//!
//! [`NotificationRouter`] subscribes to the platform event bus and pushes
//! every event to browsers. Events with an owner go to that user's
//! connections only; the rest are broadcast.

use std::sync::Arc;

use axum::extract::ws::Message;
use texgen_events::PlatformEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Route events until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn route_event(&self, event: &PlatformEvent) {
        let message = Message::Text(render(event).into());
        match event.owner_user_id {
            Some(user_id) => {
                let delivered = self.ws_manager.send_to_user(user_id, message).await;
                tracing::trace!(
                    event_type = %event.event_type,
                    user_id = %user_id,
                    delivered,
                    "Event pushed to owner"
                );
            }
            None => self.ws_manager.broadcast(message).await,
        }
    }
}

/// Wire form of an event pushed to browsers.
fn render(event: &PlatformEvent) -> String {
    serde_json::json!({
        "type": event.event_type,
        "job_id": event.job_id,
        "lane": event.lane,
        "payload": event.payload,
        "timestamp": event.timestamp,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use texgen_core::job_events;
    use texgen_core::types::DbId;
    use texgen_events::EventBus;

    use super::*;

    fn text(msg: Message) -> serde_json::Value {
        match msg {
            Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn owner_scoped_events_reach_only_the_owner() {
        let manager = Arc::new(WsManager::new());
        let alice = DbId::new_v4();
        let bob = DbId::new_v4();
        let mut alice_rx = manager.add("a".into(), alice).await;
        let mut bob_rx = manager.add("b".into(), bob).await;

        let bus = EventBus::default();
        let handle = tokio::spawn(NotificationRouter::new(Arc::clone(&manager)).run(bus.subscribe()));

        bus.publish(PlatformEvent::new(job_events::JOB_COMPLETED).with_owner(alice));
        bus.publish(PlatformEvent::new(job_events::QUEUE_DRAINED));
        drop(bus);
        handle.await.unwrap();

        assert_eq!(text(alice_rx.recv().await.unwrap())["type"], job_events::JOB_COMPLETED);
        assert_eq!(text(alice_rx.recv().await.unwrap())["type"], job_events::QUEUE_DRAINED);
        assert_eq!(text(bob_rx.recv().await.unwrap())["type"], job_events::QUEUE_DRAINED);
        assert!(bob_rx.try_recv().is_err());
    }
}
