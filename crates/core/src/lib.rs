//! Domain types and pure logic for the texture generation queue.
//!
//! Nothing in this crate performs I/O. The database, render backend and
//! HTTP layers all depend on it.

pub mod checkpoint;
pub mod error;
pub mod generation;
pub mod job_events;
pub mod notification;
pub mod policy;
pub mod preset;
pub mod queue;
pub mod roles;
pub mod types;
pub mod webhook;
