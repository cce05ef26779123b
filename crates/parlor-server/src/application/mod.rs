//! Application layer for parlor-server.
//!
//! The application layer holds the collaboration logic: what happens to a
//! session's membership and pending requests for each inbound frame. It
//! knows nothing about sockets — sessions talk to the world only through
//! their outbound queues, which the infrastructure layer drains.
//!
//! # Responsibilities
//!
//! - [`session::Session`]: per-connection orchestration and dispatch
//! - [`membership::Membership`]: the join/move/leave state machine
//! - [`correlator::Correlator`]: request/response correlation for content
//!   retrieval
//! - [`directory::Directory`]: the process-wide session and table registry
//!
//! # What does NOT belong here?
//!
//! - Accepting connections or WebSocket framing (infrastructure)
//! - Frame token syntax (parlor-core)
//! - Table occupancy bookkeeping (domain)

pub mod correlator;
pub mod directory;
pub mod membership;
pub mod session;

// Re-export the primary types at the layer boundary.
pub use correlator::{Correlator, ProjectResult};
pub use directory::Directory;
pub use membership::{Membership, MembershipError};
pub use session::Session;
