//! The shared table: a named room partitioned into seats.
//!
//! A `Table` is where sessions collaborate. It tracks three things per seat:
//! whether the seat exists at all, who (if anyone) currently occupies it,
//! and the display name of its last occupant. Seat existence is independent
//! of occupancy — a seat can be declared and stand empty — and the owner
//! name survives its occupant disconnecting, so a later rejoin by the same
//! user can be reconciled.
//!
//! Two invariants are enforced by construction rather than by audit:
//!
//! - Every seat present in the occupancy map is also present in the
//!   owner-name map ([`Table::create_seat`] and [`Table::occupy`] always
//!   populate both together).
//! - Occupancy is the sole source of truth. Concurrent seat creation is
//!   last-write-wins; there is no locking beyond the single mutex the
//!   server wraps each table in.
//!
//! Fan-out to occupants goes through [`SessionLink`] handles — cheap clones
//! of each session's outbound queue — so the table never touches a socket
//! directly and broadcasting never blocks on a slow peer.

use std::collections::BTreeMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

/// Process-unique numeric identity of a connected session.
pub type SessionId = u64;

/// The sending half of a session's outbound frame queue.
///
/// The session's writer task drains the other end and pushes frames onto
/// the transport, dropping them (with a log line) once it is closed.
pub type Outbox = UnboundedSender<String>;

/// A cheap handle to a connected session: its identity plus its outbox.
#[derive(Debug, Clone)]
pub struct SessionLink {
    /// Numeric session identity, unique for the process lifetime.
    pub session_id: SessionId,
    /// The wire identity announced in the `uuid` handshake, e.g. `_client_7`.
    pub client_ref: String,
    /// Outbound frame queue of the session.
    pub outbox: Outbox,
}

impl SessionLink {
    /// Queues a frame for this session.
    ///
    /// Returns `false` when the session's writer is gone; callers fanning
    /// out to a whole table ignore individual failures — the dead session's
    /// own close path removes it from the table.
    pub fn send(&self, frame: &str) -> bool {
        self.outbox.send(frame.to_string()).is_ok()
    }
}

/// A shared collaboration room with a leader and a set of named seats.
#[derive(Debug)]
pub struct Table {
    id: Uuid,
    name: String,
    leader_id: SessionId,
    leader_ref: String,
    /// Seat → current occupant. `None` marks an existing but empty seat.
    seats: BTreeMap<String, Option<SessionLink>>,
    /// Seat → last-known display name of its occupant. Entries are never
    /// removed on vacancy.
    seat_owners: BTreeMap<String, String>,
}

impl Table {
    /// Creates a fresh table led by `leader`. The leader is not seated;
    /// joining is a separate explicit step.
    pub fn new(name: &str, leader: &SessionLink) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            leader_id: leader.session_id,
            leader_ref: leader.client_ref.clone(),
            seats: BTreeMap::new(),
            seat_owners: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire identity of the session that created this table.
    pub fn leader_ref(&self) -> &str {
        &self.leader_ref
    }

    /// Whether `session_id` is this table's leader. Leadership gates seat
    /// declaration (explicit `add-seat` and implicit creation during join).
    pub fn is_leader(&self, session_id: SessionId) -> bool {
        self.leader_id == session_id
    }

    // ── Seat lifecycle ────────────────────────────────────────────────────────

    /// Declares a seat with no occupant, recording `owner` as its owner
    /// name. Idempotent: re-declaring an existing seat changes nothing.
    pub fn create_seat(&mut self, seat: &str, owner: &str) {
        self.seats.entry(seat.to_string()).or_insert(None);
        self.seat_owners
            .entry(seat.to_string())
            .or_insert_with(|| owner.to_string());
    }

    pub fn seat_exists(&self, seat: &str) -> bool {
        self.seats.contains_key(seat)
    }

    /// Registers `link` as the occupant of `seat` and records
    /// `display_name` as the seat's owner. Overwrites any previous
    /// occupant — displacement is deliberate, the occupancy map is the
    /// sole source of truth.
    pub fn occupy(&mut self, seat: &str, link: SessionLink, display_name: &str) {
        self.seats.insert(seat.to_string(), Some(link));
        self.seat_owners
            .insert(seat.to_string(), display_name.to_string());
    }

    /// Vacates `seat` if it is currently held by `session_id`.
    ///
    /// The owner-name record is retained. A displaced session (someone else
    /// took the seat since) vacates nothing, so its forced leave cannot
    /// evict the displacer.
    pub fn vacate(&mut self, seat: &str, session_id: SessionId) -> bool {
        if let Some(slot) = self.seats.get_mut(seat) {
            if slot.as_ref().is_some_and(|p| p.session_id == session_id) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Re-registers `link` under `new_seat` within this table, vacating its
    /// current seat. Returns `false` (and changes nothing) when the session
    /// holds no seat here.
    pub fn move_occupant(&mut self, new_seat: &str, link: SessionLink, display_name: &str) -> bool {
        let Some(old_seat) = self.seat_of(link.session_id) else {
            return false;
        };
        self.seats.insert(old_seat, None);
        self.occupy(new_seat, link, display_name);
        true
    }

    /// Returns the seat currently held by `session_id`, if any.
    pub fn seat_of(&self, session_id: SessionId) -> Option<String> {
        self.seats.iter().find_map(|(seat, occ)| {
            occ.as_ref()
                .filter(|p| p.session_id == session_id)
                .map(|_| seat.clone())
        })
    }

    /// Wire identity of the session occupying `seat`, if any.
    pub fn occupant_ref(&self, seat: &str) -> Option<String> {
        self.seats
            .get(seat)
            .and_then(|occ| occ.as_ref().map(|p| p.client_ref.clone()))
    }

    /// Last-known owner name of `seat`.
    pub fn owner_of(&self, seat: &str) -> Option<&str> {
        self.seat_owners.get(seat).map(String::as_str)
    }

    /// Rewrites the owner name of an existing seat (display-name change of
    /// its occupant). Unknown seats are left untouched.
    pub fn set_owner(&mut self, seat: &str, name: &str) -> bool {
        match self.seat_owners.get_mut(seat) {
            Some(owner) => {
                *owner = name.to_string();
                true
            }
            None => false,
        }
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Moves a seat's occupancy and owner record under a new identifier.
    /// Returns `false` when the old seat does not exist.
    pub fn rename_seat(&mut self, old_seat: &str, new_seat: &str) -> bool {
        let Some(occupant) = self.seats.remove(old_seat) else {
            return false;
        };
        let owner = self.seat_owners.remove(old_seat).unwrap_or_default();
        self.seats.insert(new_seat.to_string(), occupant);
        self.seat_owners.insert(new_seat.to_string(), owner);
        true
    }

    /// Whether no seat is occupied. The registry uses this after each leave
    /// to decide whether the table should be torn down.
    pub fn is_deserted(&self) -> bool {
        self.seats.values().all(Option::is_none)
    }

    pub fn occupant_count(&self) -> usize {
        self.seats.values().filter(|o| o.is_some()).count()
    }

    // ── Snapshot + fan-out ────────────────────────────────────────────────────

    /// Serializes the table's membership snapshot as compact JSON.
    pub fn state_json(&self) -> String {
        let seats: serde_json::Map<String, serde_json::Value> = self
            .seats
            .iter()
            .map(|(seat, occ)| {
                (
                    seat.clone(),
                    serde_json::json!({
                        "owner": self.seat_owners.get(seat).cloned().unwrap_or_default(),
                        "occupant": occ.as_ref().map(|p| p.client_ref.clone()),
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "leader": self.leader_ref,
            "seats": seats,
        })
        .to_string()
    }

    /// Sends `frame` to every occupant except the one seated at
    /// `sender_seat`.
    pub fn broadcast_from(&self, sender_seat: &str, frame: &str) {
        for (seat, occ) in &self.seats {
            if seat == sender_seat {
                continue;
            }
            if let Some(peer) = occ {
                if !peer.send(frame) {
                    debug!(peer = %peer.client_ref, "skipping broadcast to closed session");
                }
            }
        }
    }

    /// Sends `frame` to every occupant, the sender's seat included.
    pub fn broadcast(&self, frame: &str) {
        for peer in self.seats.values().flatten() {
            if !peer.send(frame) {
                debug!(peer = %peer.client_ref, "skipping broadcast to closed session");
            }
        }
    }

    /// Pushes the current membership snapshot to every occupant. Called
    /// after membership or metadata changes.
    pub fn broadcast_state(&self) {
        let frame = parlor_core::ServerCommand::TableState {
            json: self.state_json(),
        }
        .encode();
        self.broadcast(&frame);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_link(id: SessionId) -> (SessionLink, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SessionLink {
                session_id: id,
                client_ref: format!("_client_{id}"),
                outbox: tx,
            },
            rx,
        )
    }

    #[test]
    fn test_create_seat_populates_owner_record_together() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);

        table.create_seat("chair", "alice");

        assert!(table.seat_exists("chair"));
        assert_eq!(table.occupant_ref("chair"), None, "a fresh seat is empty");
        assert_eq!(table.owner_of("chair"), Some("alice"));
    }

    #[test]
    fn test_create_seat_is_idempotent() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        table.create_seat("chair", "alice");
        table.occupy("chair", leader.clone(), "alice");

        // Re-declaring must not clobber the occupant or the owner.
        table.create_seat("chair", "someone-else");

        assert_eq!(table.occupant_ref("chair"), Some("_client_1".to_string()));
        assert_eq!(table.owner_of("chair"), Some("alice"));
    }

    #[test]
    fn test_occupy_overwrites_previous_occupant() {
        let (leader, _rx1) = make_link(1);
        let (other, _rx2) = make_link(2);
        let mut table = Table::new("ideas", &leader);
        table.create_seat("chair", "alice");
        table.occupy("chair", leader, "alice");

        table.occupy("chair", other, "bob");

        assert_eq!(table.occupant_ref("chair"), Some("_client_2".to_string()));
        assert_eq!(table.owner_of("chair"), Some("bob"));
    }

    #[test]
    fn test_vacate_retains_owner_record() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader.clone(), "alice");

        assert!(table.vacate("chair", 1));

        assert!(table.seat_exists("chair"));
        assert_eq!(table.occupant_ref("chair"), None);
        assert_eq!(table.owner_of("chair"), Some("alice"));
    }

    #[test]
    fn test_vacate_by_displaced_session_is_a_no_op() {
        let (leader, _rx1) = make_link(1);
        let (other, _rx2) = make_link(2);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader, "alice");
        table.occupy("chair", other, "bob");

        // Session 1 was displaced; its leave must not evict session 2.
        assert!(!table.vacate("chair", 1));
        assert_eq!(table.occupant_ref("chair"), Some("_client_2".to_string()));
    }

    #[test]
    fn test_move_occupant_frees_old_seat() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        table.create_seat("bench", "");
        table.occupy("chair", leader.clone(), "alice");

        assert!(table.move_occupant("bench", leader, "alice"));

        assert_eq!(table.occupant_ref("chair"), None);
        assert_eq!(table.occupant_ref("bench"), Some("_client_1".to_string()));
    }

    #[test]
    fn test_move_occupant_without_a_seat_changes_nothing() {
        let (leader, _rx1) = make_link(1);
        let (stranger, _rx2) = make_link(9);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader, "alice");

        assert!(!table.move_occupant("bench", stranger, "zed"));
        assert!(!table.seat_exists("bench"));
        assert_eq!(table.occupant_ref("chair"), Some("_client_1".to_string()));
    }

    #[test]
    fn test_rename_seat_carries_occupant_and_owner() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader, "alice");

        assert!(table.rename_seat("chair", "throne"));

        assert!(!table.seat_exists("chair"));
        assert_eq!(table.occupant_ref("throne"), Some("_client_1".to_string()));
        assert_eq!(table.owner_of("throne"), Some("alice"));
    }

    #[test]
    fn test_rename_unknown_seat_returns_false() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        assert!(!table.rename_seat("ghost", "throne"));
    }

    #[test]
    fn test_is_deserted_with_empty_seats_only() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        assert!(table.is_deserted());

        table.create_seat("chair", "");
        assert!(table.is_deserted(), "existing but empty seats count as deserted");

        table.occupy("chair", leader, "alice");
        assert!(!table.is_deserted());

        table.vacate("chair", 1);
        assert!(table.is_deserted());
    }

    #[test]
    fn test_broadcast_from_excludes_sender_seat() {
        let (leader, mut rx1) = make_link(1);
        let (other, mut rx2) = make_link(2);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader, "alice");
        table.occupy("bench", other, "bob");

        table.broadcast_from("chair", "message hi");

        assert_eq!(rx2.try_recv().unwrap(), "message hi");
        assert!(rx1.try_recv().is_err(), "sender seat must not receive its own relay");
    }

    #[test]
    fn test_broadcast_reaches_every_occupant() {
        let (leader, mut rx1) = make_link(1);
        let (other, mut rx2) = make_link(2);
        let mut table = Table::new("ideas", &leader);
        table.occupy("chair", leader, "alice");
        table.occupy("bench", other, "bob");

        table.broadcast("message all");

        assert_eq!(rx1.try_recv().unwrap(), "message all");
        assert_eq!(rx2.try_recv().unwrap(), "message all");
    }

    #[test]
    fn test_state_json_lists_seats_with_owner_and_occupant() {
        let (leader, _rx) = make_link(1);
        let mut table = Table::new("ideas", &leader);
        table.create_seat("bench", "bob");
        table.occupy("chair", leader, "alice");

        let state: serde_json::Value = serde_json::from_str(&table.state_json()).unwrap();

        assert_eq!(state["name"], "ideas");
        assert_eq!(state["leader"], "_client_1");
        assert_eq!(state["seats"]["chair"]["owner"], "alice");
        assert_eq!(state["seats"]["chair"]["occupant"], "_client_1");
        assert_eq!(state["seats"]["bench"]["owner"], "bob");
        assert!(state["seats"]["bench"]["occupant"].is_null());
    }

    #[test]
    fn test_leadership_is_tied_to_the_creator() {
        let (leader, _rx) = make_link(1);
        let table = Table::new("ideas", &leader);
        assert!(table.is_leader(1));
        assert!(!table.is_leader(2));
        assert_eq!(table.leader_ref(), "_client_1");
    }
}
