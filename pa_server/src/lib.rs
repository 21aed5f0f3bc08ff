//! Prize arcade server library.
//!
//! Exposes the HTTP/WebSocket API plus configuration, logging, and metrics
//! so integration tests can assemble the router without spawning the
//! binary.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
