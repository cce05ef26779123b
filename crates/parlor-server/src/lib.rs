//! parlor-server library crate.
//!
//! A real-time collaboration server: editors connect over WebSocket,
//! gather around shared *tables* partitioned into *seats*, relay messages
//! to their tablemates, and answer out-of-band content requests so the
//! server can persist their work.
//!
//! # Architecture
//!
//! ```text
//! Editor (text frames over WebSocket)
//!         ↕
//! [parlor-server]
//!   ├── domain/           Table (seats, owners, leader), ServerConfig
//!   ├── application/      Session dispatch, membership state machine,
//!   │                     request correlation, session/table registry
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         └── storage/    TOML configuration file loading
//! ```
//!
//! # Layer rules
//!
//! - `domain` performs no I/O; sessions are reachable only as outbound
//!   queue handles.
//! - `application` depends on `domain` and `parlor-core` only; handler
//!   bodies are synchronous.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.
//!
//! This split keeps the whole membership and correlation logic testable
//! without a network: tests construct sessions around plain channels and
//! feed frames straight into the dispatcher.

/// Domain layer: collaboration-state types (no I/O).
pub mod domain;

/// Application layer: session orchestration and registries.
pub mod application;

/// Infrastructure layer: WebSocket server and config file loading.
pub mod infrastructure;
