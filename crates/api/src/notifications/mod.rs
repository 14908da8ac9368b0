//! Delivery of bus events to WebSocket clients.

pub mod router;

pub use router::NotificationRouter;
