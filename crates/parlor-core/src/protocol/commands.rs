//! Typed command vocabulary for both directions of the session protocol.
//!
//! The wire format itself (see [`crate::protocol::frame`]) is untyped text.
//! This module gives each direction a closed enum so the dispatcher can
//! match exhaustively instead of looking handlers up by name in a table:
//!
//! - [`ClientCommand`] – everything a connected editor can send.
//! - [`ServerCommand`] – everything the server originates itself. Chat
//!   relays are forwarded verbatim and therefore have no variant here.
//!
//! # Why two distinct enums?
//!
//! The two directions carry different information: clients send membership
//! and content commands, the server sends its handshake and state pushes.
//! Separate enums make it a compile-time error to encode a client-only
//! command on the server side, mirroring how the inbound and outbound
//! message sets never overlap on the wire.
//!
//! # Missing arguments
//!
//! Decoding never fails. A frame with fewer positional arguments than a
//! variant expects decodes with `None` in the trailing fields; each handler
//! validates the arguments it actually needs and degrades to a logged no-op
//! when a required one is absent. An unrecognized command name decodes to
//! [`ClientCommand::Unknown`], the dispatcher's warning arm.

use crate::protocol::frame::{format_frame, parse_frame};

// ── Inbound commands ──────────────────────────────────────────────────────────

/// All commands a client session can send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Relay the trailing tokens to every other occupant of the current
    /// table. Wire form: `message <...rest>`.
    Message {
        /// The raw trailing tokens, relayed as-is.
        rest: Vec<String>,
    },

    /// Table-directed delivery of the trailing tokens to every occupant of
    /// the current table. Wire form: `table-message <...rest>`.
    TableMessage {
        rest: Vec<String>,
    },

    /// Response to an earlier `project-request`, carrying the serialized
    /// project as a trailing JSON blob. Wire form:
    /// `project-response <requestId> <jsonPayload...>`.
    ProjectResponse {
        /// The request identifier issued by the server. `None` when the
        /// frame carried no arguments at all.
        request_id: Option<String>,
        /// The re-joined trailing payload. JSON text may contain spaces
        /// inside string values, so the remaining tokens are joined back
        /// into one blob.
        payload: String,
    },

    /// Rename the current table. Wire form: `rename-table <name>`.
    RenameTable { name: Option<String> },

    /// Rename a seat of the current table. Wire form:
    /// `rename-seat <oldSeat> <newSeat>`.
    RenameSeat {
        old_seat: Option<String>,
        new_seat: Option<String>,
    },

    /// Ask for the current table's membership snapshot. Wire form:
    /// `request-table-state` (no arguments).
    RequestTableState,

    /// Create a new table led by the sender and join its first seat. Wire
    /// form: `create-table <name> <seat>`.
    CreateTable {
        name: Option<String>,
        seat: Option<String>,
    },

    /// Join (or move within) a table identified by its leader and name.
    /// Wire form: `join-table <leaderRef> <tableName> <seat>`.
    JoinTable {
        leader: Option<String>,
        table: Option<String>,
        seat: Option<String>,
    },

    /// Declare a new unoccupied seat on the current table. Wire form:
    /// `add-seat <seatName>`.
    AddSeat { seat: Option<String> },

    /// Fallback arm for any command name not in the closed set above. The
    /// dispatcher logs a warning and drops the frame.
    Unknown {
        /// The unrecognized command name, kept for the log line.
        command: String,
    },
}

impl ClientCommand {
    /// Decodes a raw frame into a typed command.
    ///
    /// Never fails: short frames fill trailing fields with `None`, and an
    /// unrecognized command name becomes [`ClientCommand::Unknown`].
    pub fn decode(raw: &str) -> Self {
        let frame = parse_frame(raw);
        let mut args = frame.args.into_iter();

        match frame.command.as_str() {
            "message" => ClientCommand::Message { rest: args.collect() },
            "table-message" => ClientCommand::TableMessage { rest: args.collect() },
            "project-response" => {
                let request_id = args.next();
                let payload = args.collect::<Vec<_>>().join(" ");
                ClientCommand::ProjectResponse { request_id, payload }
            }
            "rename-table" => ClientCommand::RenameTable { name: args.next() },
            "rename-seat" => ClientCommand::RenameSeat {
                old_seat: args.next(),
                new_seat: args.next(),
            },
            "request-table-state" => ClientCommand::RequestTableState,
            "create-table" => ClientCommand::CreateTable {
                name: args.next(),
                seat: args.next(),
            },
            "join-table" => ClientCommand::JoinTable {
                leader: args.next(),
                table: args.next(),
                seat: args.next(),
            },
            "add-seat" => ClientCommand::AddSeat { seat: args.next() },
            other => ClientCommand::Unknown {
                command: other.to_string(),
            },
        }
    }

    /// Returns the command's wire name, used in log messages.
    ///
    /// Payload contents are intentionally not included so that log lines
    /// never leak project source.
    pub fn name(&self) -> &str {
        match self {
            ClientCommand::Message { .. } => "message",
            ClientCommand::TableMessage { .. } => "table-message",
            ClientCommand::ProjectResponse { .. } => "project-response",
            ClientCommand::RenameTable { .. } => "rename-table",
            ClientCommand::RenameSeat { .. } => "rename-seat",
            ClientCommand::RequestTableState => "request-table-state",
            ClientCommand::CreateTable { .. } => "create-table",
            ClientCommand::JoinTable { .. } => "join-table",
            ClientCommand::AddSeat { .. } => "add-seat",
            ClientCommand::Unknown { command } => command,
        }
    }
}

// ── Outbound commands ─────────────────────────────────────────────────────────

/// All frames the server originates itself.
///
/// Relayed chat frames (`message ...`) pass through verbatim and are not
/// re-encoded, so they do not appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// The handshake frame announcing the session's assigned identity.
    /// Always the first frame on a new connection. Wire form:
    /// `uuid <clientRef>`.
    Uuid { client_ref: String },

    /// Asks the client to send back its current project content. Wire
    /// form: `project-request <requestId>`.
    ProjectRequest { request_id: u64 },

    /// Pushes a membership snapshot of the client's current table. Wire
    /// form: `table-state <json>`.
    TableState { json: String },
}

impl ServerCommand {
    /// Encodes the command into its wire frame.
    pub fn encode(&self) -> String {
        match self {
            ServerCommand::Uuid { client_ref } => {
                format_frame("uuid", &[client_ref.clone()])
            }
            ServerCommand::ProjectRequest { request_id } => {
                format_frame("project-request", &[request_id.to_string()])
            }
            ServerCommand::TableState { json } => {
                format_frame("table-state", &[json.clone()])
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
