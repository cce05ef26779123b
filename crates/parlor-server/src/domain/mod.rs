//! Domain layer for parlor-server.
//!
//! Pure collaboration-state types with no I/O: the shared [`Table`] with
//! its seats, owners, and leader, and the [`ServerConfig`] settings struct.
//! Fan-out reaches sessions only through their outbound queues
//! ([`table::SessionLink`]), never through sockets, so everything here is
//! testable without a network.

pub mod config;
pub mod table;

// Re-export the most commonly needed types at the domain boundary.
pub use config::ServerConfig;
pub use table::{Outbox, SessionId, SessionLink, Table};
