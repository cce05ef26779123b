//! # parlor-core
//!
//! Shared library for the Parlor collaboration server containing the text
//! frame codec, the session command vocabulary, and the saveable project
//! record derivation.
//!
//! This crate is used by the server and by any future native tooling that
//! speaks the session protocol. It has zero dependencies on async runtimes,
//! sockets, or OS APIs.
//!
//! # Architecture overview
//!
//! Parlor is a real-time collaborative editing server. Editors connect over
//! a message-delimited transport and gather around shared *tables*: each
//! table has a set of named *seats*, and each connected session occupies at
//! most one seat at a time. The session that created a table is its
//! *leader* and may declare new seats.
//!
//! This crate (`parlor-core`) is the shared foundation. It defines:
//!
//! - **`protocol`** – How frames travel over the wire. Frames are UTF-8
//!   text, tokens separated by single spaces, with the first token naming
//!   the command. The closed [`protocol::ClientCommand`] and
//!   [`protocol::ServerCommand`] enums give both directions a typed
//!   vocabulary.
//!
//! - **`project`** – Derivation of a persistence-ready project record from
//!   the JSON payload a client returns in response to a content request.
//!   Pure logic, independently testable.

// Declare the two top-level modules. Rust will look for each in a
// subdirectory or file with the same name (e.g., src/protocol/mod.rs).
pub mod project;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `parlor_core::ClientCommand` instead of the full module path.
pub use project::{ProjectError, RawProject, SavedProject};
pub use protocol::commands::{ClientCommand, ServerCommand};
pub use protocol::frame::{format_frame, parse_frame, Frame};
pub use protocol::serial::SerialCounter;
