//! The per-connection session: identity, dispatch, and lifecycle.
//!
//! One `Session` exists per connected transport. It owns the session's
//! identity and display name, its [`Membership`] pointers, and the
//! [`Correlator`] for content retrieval, and it dispatches every inbound
//! frame to the matching handler.
//!
//! # Handshake ordering
//!
//! Construction queues the `uuid <clientRef>` frame before returning, and
//! the outbound queue is FIFO, so the very first frame a peer observes is
//! always the handshake — before any other traffic on the connection.
//!
//! # Error posture
//!
//! Nothing a peer sends can take the session down. Unrecognized commands
//! and unmet preconditions (seat operations while unjoined, missing
//! arguments) are logged warnings and no-ops; no error frame is ever sent
//! back. The one failure that propagates anywhere is a project payload
//! that fails to derive, and it propagates only to the caller awaiting
//! that specific request.
//!
//! Handler bodies are fully synchronous: frames for one session are
//! handled one at a time, and no lock is ever held across an await point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use parlor_core::protocol::frame::format_frame;
use parlor_core::{ClientCommand, ProjectError, SavedProject, ServerCommand};
use tracing::{debug, info, trace, warn};

use crate::application::correlator::{Correlator, ProjectResult};
use crate::application::directory::Directory;
use crate::application::membership::{Membership, MembershipError};
use crate::domain::table::{Outbox, SessionLink, Table};

/// A connected editor session.
pub struct Session {
    link: SessionLink,
    username: String,
    membership: Membership,
    requests: Arc<Correlator>,
    directory: Arc<Directory>,
    request_timeout: Duration,
}

impl Session {
    /// Creates a session for a freshly connected transport.
    ///
    /// Allocates the identity, registers with the directory, and queues
    /// the `uuid` handshake — the frame is in the outbox before this
    /// returns, ahead of anything else the session will ever send.
    pub fn new(directory: Arc<Directory>, outbox: Outbox, request_timeout: Duration) -> Self {
        let id = directory.allocate_session_id();
        let client_ref = format!("_client_{id}");
        let link = SessionLink {
            session_id: id,
            client_ref: client_ref.clone(),
            outbox,
        };
        directory.register(link.clone());

        let session = Self {
            link,
            // Until a login, the wire identity doubles as the guest name.
            username: client_ref,
            membership: Membership::new(),
            requests: Arc::new(Correlator::new()),
            directory,
            request_timeout,
        };
        session.send(
            ServerCommand::Uuid {
                client_ref: session.link.client_ref.clone(),
            }
            .encode(),
        );
        trace!(client = %session.link.client_ref, "session created");
        session
    }

    pub fn client_ref(&self) -> &str {
        &self.link.client_ref
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Number of content requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.requests.pending_count()
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Parses and dispatches one inbound frame.
    pub fn handle_frame(&mut self, raw: &str) {
        let command = ClientCommand::decode(raw);
        trace!(client = %self.link.client_ref, command = command.name(), "received frame");

        match command {
            ClientCommand::Message { rest } => self.handle_message(&rest),
            ClientCommand::TableMessage { rest } => self.handle_table_message(&rest),
            ClientCommand::ProjectResponse { request_id, payload } => {
                self.handle_project_response(request_id, &payload);
            }
            ClientCommand::RenameTable { name } => self.handle_rename_table(name),
            ClientCommand::RenameSeat { old_seat, new_seat } => {
                self.handle_rename_seat(old_seat, new_seat);
            }
            ClientCommand::RequestTableState => self.handle_request_table_state(),
            ClientCommand::CreateTable { name, seat } => self.handle_create_table(name, seat),
            ClientCommand::JoinTable { leader, table, seat } => {
                self.handle_join_table(leader, table, seat);
            }
            ClientCommand::AddSeat { seat } => self.handle_add_seat(seat),
            ClientCommand::Unknown { command } => {
                warn!(client = %self.link.client_ref, command = %command, "unrecognized command, frame dropped");
            }
        }
    }

    // ── Relay handlers ────────────────────────────────────────────────────────

    fn handle_message(&self, rest: &[String]) {
        let (Some(table), Some(seat)) = (self.membership.table(), self.membership.seat_id())
        else {
            warn!(client = %self.link.client_ref, "cannot relay message: not at a table");
            return;
        };
        let frame = format_frame("message", rest);
        table
            .lock()
            .expect("lock poisoned")
            .broadcast_from(seat, &frame);
    }

    /// Table-directed delivery: reaches every occupant, the sender's own
    /// seat included.
    fn handle_table_message(&self, rest: &[String]) {
        let Some(table) = self.membership.table() else {
            warn!(client = %self.link.client_ref, "cannot deliver table message: not at a table");
            return;
        };
        let frame = format_frame("message", rest);
        trace!(client = %self.link.client_ref, "delivering table-directed message");
        table.lock().expect("lock poisoned").broadcast(&frame);
    }

    // ── Content retrieval ─────────────────────────────────────────────────────

    fn handle_project_response(&self, request_id: Option<String>, payload: &str) {
        let Some(id) = request_id.as_deref().and_then(|s| s.parse::<u64>().ok()) else {
            warn!(
                client = %self.link.client_ref,
                "project-response carried no usable request id"
            );
            return;
        };
        let result = SavedProject::derive_now(payload);
        match &result {
            Ok(_) => debug!(client = %self.link.client_ref, request_id = id, "derived saveable project"),
            Err(e) => warn!(
                client = %self.link.client_ref,
                request_id = id,
                error = %e,
                "project payload failed to derive"
            ),
        }
        // The derivation failure, if any, travels to the awaiting caller;
        // an unknown id is warned about inside the correlator.
        self.requests.resolve(id, result);
    }

    /// Asks the peer for its current project content.
    ///
    /// Sends `project-request <id>` and returns a future resolving with
    /// the derived [`SavedProject`], the propagated derivation failure, or
    /// [`ProjectError::Timeout`] once the configured window elapses (the
    /// pending entry is removed, so a late response counts as stray). If
    /// the session closes first the future observes
    /// [`ProjectError::Abandoned`].
    pub fn request_project(&self) -> impl std::future::Future<Output = ProjectResult> {
        let (id, rx) = self.requests.begin();
        self.send(ServerCommand::ProjectRequest { request_id: id }.encode());

        let requests = Arc::clone(&self.requests);
        let window = self.request_timeout;
        async move {
            match tokio::time::timeout(window, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_closed)) => Err(ProjectError::Abandoned),
                Err(_elapsed) => {
                    requests.abandon(id);
                    Err(ProjectError::Timeout(id))
                }
            }
        }
    }

    // ── Table metadata handlers ───────────────────────────────────────────────

    fn handle_rename_table(&self, name: Option<String>) {
        let Some(name) = name else {
            warn!(client = %self.link.client_ref, "rename-table requires a name");
            return;
        };
        let Some(table) = self.membership.table() else {
            warn!(client = %self.link.client_ref, "cannot rename table: not at a table");
            return;
        };
        let mut locked = table.lock().expect("lock poisoned");
        locked.rename(&name);
        locked.broadcast_state();
    }

    fn handle_rename_seat(&mut self, old_seat: Option<String>, new_seat: Option<String>) {
        let (Some(old_seat), Some(new_seat)) = (old_seat, new_seat) else {
            warn!(client = %self.link.client_ref, "rename-seat requires both seat names");
            return;
        };
        let Some(table) = self.membership.table().cloned() else {
            warn!(client = %self.link.client_ref, "cannot rename seat: not at a table");
            return;
        };
        let renamed = {
            let mut locked = table.lock().expect("lock poisoned");
            let renamed = locked.rename_seat(&old_seat, &new_seat);
            if renamed {
                locked.broadcast_state();
            }
            renamed
        };
        if !renamed {
            warn!(client = %self.link.client_ref, seat = %old_seat, "cannot rename unknown seat");
            return;
        }
        if self.membership.seat_id() == Some(old_seat.as_str()) {
            self.membership.set_seat_id(&new_seat);
        }
    }

    fn handle_request_table_state(&self) {
        let Some(table) = self.membership.table() else {
            warn!(client = %self.link.client_ref, "cannot send table state: not at a table");
            return;
        };
        let json = table.lock().expect("lock poisoned").state_json();
        self.send(ServerCommand::TableState { json }.encode());
    }

    // ── Membership handlers ───────────────────────────────────────────────────

    fn handle_create_table(&mut self, name: Option<String>, seat: Option<String>) {
        let (Some(name), Some(seat)) = (name, seat) else {
            warn!(client = %self.link.client_ref, "create-table requires a name and a seat");
            return;
        };
        let table = self.directory.create_table(&name, &self.link);
        table
            .lock()
            .expect("lock poisoned")
            .create_seat(&seat, &self.username);
        // Creation does not seat the creator; joining is its own step (and
        // leaves any current table first).
        self.join_table(table, &seat);
    }

    fn handle_join_table(
        &mut self,
        leader: Option<String>,
        table: Option<String>,
        seat: Option<String>,
    ) {
        let (Some(leader), Some(table_name), Some(seat)) = (leader, table, seat) else {
            warn!(client = %self.link.client_ref, "join-table requires leader, table, and seat");
            return;
        };
        let table = self
            .directory
            .get_or_create_table(&leader, &table_name, &self.link);
        self.join_table(table, &seat);
    }

    fn handle_add_seat(&self, seat: Option<String>) {
        let Some(seat) = seat else {
            warn!(client = %self.link.client_ref, "add-seat requires a seat name");
            return;
        };
        let Some(table) = self.membership.table() else {
            warn!(client = %self.link.client_ref, "cannot add seat: not at a table");
            return;
        };
        let mut locked = table.lock().expect("lock poisoned");
        if !locked.is_leader(self.link.session_id) {
            warn!(
                client = %self.link.client_ref,
                seat = %seat,
                "not authorized: only the table leader may declare seats"
            );
            return;
        }
        locked.create_seat(&seat, "");
        locked.broadcast_state();
    }

    fn join_table(&mut self, table: Arc<Mutex<Table>>, seat: &str) {
        let link = self.link.clone();
        let username = self.username.clone();
        match self.membership.join(table, seat, &link, &username) {
            Ok(Some(left)) => self.directory.drop_if_deserted(&left),
            Ok(None) => {}
            Err(MembershipError::NotAuthorized { seat }) => {
                warn!(
                    client = %self.link.client_ref,
                    seat = %seat,
                    "join denied: only the table leader may declare seats"
                );
            }
        }
    }

    // ── Identity + lifecycle ──────────────────────────────────────────────────

    /// Updates the session's display name, propagating it to the seat's
    /// owner record when currently seated.
    pub fn on_login(&mut self, username: &str) {
        info!(client = %self.link.client_ref, username, "logged in");
        self.username = username.to_string();
        if let (Some(table), Some(seat)) = (self.membership.table(), self.membership.seat_id()) {
            let mut locked = table.lock().expect("lock poisoned");
            locked.set_owner(seat, username);
            locked.broadcast_state();
        }
    }

    /// Queues an outbound frame.
    ///
    /// The transport's openness is checked on every call — state can flip
    /// between two sends — and a frame that can no longer be delivered is
    /// dropped with a log line, never raised to the caller.
    pub fn send(&self, frame: String) {
        trace!(client = %self.link.client_ref, "sending frame");
        if self.link.outbox.send(frame).is_err() {
            debug!(
                client = %self.link.client_ref,
                "could not send frame: transport no longer open"
            );
        }
    }

    /// Tears the session down after its transport closed: a forced leave
    /// when still seated, then eviction from the registry. Pending content
    /// requests are abandoned, never answered.
    pub fn on_close(&mut self) {
        trace!(client = %self.link.client_ref, "transport closed");
        if self.membership.is_member() {
            if let Some(left) = self.membership.leave(self.link.session_id) {
                self.directory.drop_if_deserted(&left);
            }
        }
        self.directory.evict(&self.link.client_ref);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
