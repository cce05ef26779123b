//! Infrastructure layer for parlor-server.
//!
//! Everything that touches the outside world lives here: the WebSocket
//! accept loop, per-connection task plumbing, and configuration file
//! loading.
//!
//! # What does NOT belong here?
//!
//! - Membership and dispatch logic (application layer)
//! - Table and configuration types (domain layer)
//! - Frame syntax (parlor-core)

pub mod storage;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use storage::{load_config, ConfigError};
pub use ws_server::run_server;
