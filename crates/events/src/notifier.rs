//! Single-slot notification holder.
//!
//! Notifications do not queue: a new one replaces whatever is showing.
//! Visibility decays after the notification's duration.

use std::sync::{Arc, Mutex};

use texgen_core::job_events::NOTIFICATION;
use texgen_core::notification::Notification;
use tokio::time::Instant;

use crate::bus::{EventBus, PlatformEvent};

struct Shown {
    notification: Notification,
    shown_at: Instant,
}

pub struct Notifier {
    current: Mutex<Option<Shown>>,
    bus: Arc<EventBus>,
}

impl Notifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            current: Mutex::new(None),
            bus,
        }
    }

    /// Bus the notifier publishes on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Show `notification`, preempting the current one, and publish it.
    pub fn notify(&self, notification: Notification) {
        tracing::debug!(
            severity = ?notification.severity,
            job_id = ?notification.job_id,
            message = %notification.message,
            "Notification"
        );

        let mut event = PlatformEvent::new(NOTIFICATION).with_payload(
            serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null),
        );
        if let Some(user_id) = notification.user_id {
            event = event.with_owner(user_id);
        }
        if let Some(job_id) = notification.job_id {
            event = event.with_job(job_id);
        }
        if let Some(lane) = notification.lane {
            event = event.with_lane(lane);
        }

        {
            let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
            *slot = Some(Shown {
                notification,
                shown_at: Instant::now(),
            });
        }
        self.bus.publish(event);
    }

    /// The notification still visible now, if any.
    pub fn current(&self) -> Option<Notification> {
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(shown) if shown.shown_at.elapsed() < shown.notification.duration => {
                Some(shown.notification.clone())
            }
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Hide the current notification early.
    pub fn dismiss(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
