//! Texture generation API server library.
//!
//! Exposes config, state, error handling, routes and the WebSocket push
//! infrastructure so integration tests and the binary share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
