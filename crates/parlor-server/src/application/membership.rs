//! The membership state machine: which table and seat a session holds.
//!
//! A session is in one of two states:
//!
//! ```text
//! Unjoined ──► Member(table, seat)     via join (or create + join)
//! Member   ──► Member                  via move or rename (same table)
//! Member   ──► Unjoined                via leave or transport close
//! ```
//!
//! The transitions enforce the core invariant directly: a session occupies
//! at most one seat in at most one table at any instant. A cross-table join
//! always leaves the current table first; a same-table join degrades to a
//! seat move rather than a fresh join.
//!
//! Seat declaration is leader-gated. A non-leader joining a seat that does
//! not exist gets [`MembershipError::NotAuthorized`] back — a
//! distinguishable outcome the dispatcher reports as a protocol warning —
//! and its current membership is left untouched.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::table::{SessionId, SessionLink, Table};

/// Distinguishable failures of a membership transition.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Only the table leader may declare new seats, explicitly or
    /// implicitly while joining.
    #[error("only the table leader may declare seat \"{seat}\"")]
    NotAuthorized { seat: String },
}

/// The table/seat pointers of one session.
///
/// `None` in both fields is the Unjoined state; both are populated while a
/// member. The pair is only ever updated together.
#[derive(Default)]
pub struct Membership {
    table: Option<Arc<Mutex<Table>>>,
    seat_id: Option<String>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_member(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Option<&Arc<Mutex<Table>>> {
        self.table.as_ref()
    }

    pub fn seat_id(&self) -> Option<&str> {
        self.seat_id.as_deref()
    }

    /// Refreshes the seat pointer after the session's own seat was renamed.
    pub fn set_seat_id(&mut self, seat: &str) {
        if self.seat_id.is_some() {
            self.seat_id = Some(seat.to_string());
        }
    }

    /// Joins `target` at `seat`, leaving any current table first.
    ///
    /// A join into the table the session already occupies degrades to
    /// [`Membership::move_seat`]. When the seat does not exist it is
    /// created implicitly — but only for the table's leader.
    ///
    /// Returns the table that was left as part of this join, if any, so the
    /// caller can tear it down when it ended up deserted.
    ///
    /// # Errors
    ///
    /// [`MembershipError::NotAuthorized`] when a non-leader names a
    /// nonexistent seat. The check runs before anything else, so a denied
    /// join changes no state at all.
    pub fn join(
        &mut self,
        target: Arc<Mutex<Table>>,
        seat: &str,
        link: &SessionLink,
        display_name: &str,
    ) -> Result<Option<Arc<Mutex<Table>>>, MembershipError> {
        {
            let mut table = target.lock().expect("lock poisoned");
            if !table.seat_exists(seat) {
                if table.is_leader(link.session_id) {
                    debug!(table = table.name(), seat, "leader implicitly creating seat");
                    table.create_seat(seat, display_name);
                } else {
                    return Err(MembershipError::NotAuthorized {
                        seat: seat.to_string(),
                    });
                }
            }
        }

        let same_table = self
            .table
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &target));
        if same_table {
            self.move_seat(seat, link, display_name);
            return Ok(None);
        }

        // Never a member of two tables at once.
        let left = self.leave(link.session_id);

        {
            let mut table = target.lock().expect("lock poisoned");
            table.occupy(seat, link.clone(), display_name);
            table.broadcast_state();
        }
        self.table = Some(target);
        self.seat_id = Some(seat.to_string());
        Ok(left)
    }

    /// Re-registers occupancy under `seat` within the current table.
    ///
    /// A no-op (with a warning, altering no table state) when the session
    /// is not a member anywhere.
    pub fn move_seat(&mut self, seat: &str, link: &SessionLink, display_name: &str) {
        let Some(table) = &self.table else {
            warn!(seat, "cannot change seats: not a member of any table");
            return;
        };
        {
            let mut table = table.lock().expect("lock poisoned");
            table.move_occupant(seat, link.clone(), display_name);
            table.broadcast_state();
        }
        self.seat_id = Some(seat.to_string());
    }

    /// Leaves the current table, retaining the seat's owner-name record.
    ///
    /// Returns the table that was left so the caller can ask the registry
    /// to tear it down if deserted — that determination belongs to the
    /// table, not to this state machine. A leave while Unjoined is a
    /// logged no-op.
    pub fn leave(&mut self, session_id: SessionId) -> Option<Arc<Mutex<Table>>> {
        let Some(table) = self.table.take() else {
            debug!("leave with no current table is a no-op");
            self.seat_id = None;
            return None;
        };
        let seat = self.seat_id.take();
        {
            let mut locked = table.lock().expect("lock poisoned");
            if let Some(seat) = seat.as_deref() {
                locked.vacate(seat, session_id);
            }
            locked.broadcast_state();
        }
        Some(table)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_link(id: SessionId) -> SessionLink {
        let (tx, _rx) = mpsc::unbounded_channel();
        // The receiver is dropped; broadcasts in these tests go nowhere.
        SessionLink {
            session_id: id,
            client_ref: format!("_client_{id}"),
            outbox: tx,
        }
    }

    fn make_table(leader: &SessionLink, name: &str) -> Arc<Mutex<Table>> {
        Arc::new(Mutex::new(Table::new(name, leader)))
    }

    #[test]
    fn test_join_as_leader_creates_missing_seat() {
        let leader = make_link(1);
        let table = make_table(&leader, "ideas");
        let mut membership = Membership::new();

        membership
            .join(Arc::clone(&table), "chair", &leader, "alice")
            .expect("leader join must succeed");

        assert!(membership.is_member());
        assert_eq!(membership.seat_id(), Some("chair"));
        let locked = table.lock().unwrap();
        assert_eq!(locked.occupant_ref("chair"), Some("_client_1".to_string()));
        assert_eq!(locked.owner_of("chair"), Some("alice"));
    }

    #[test]
    fn test_join_nonexistent_seat_as_non_leader_is_denied() {
        let leader = make_link(1);
        let stranger = make_link(2);
        let table = make_table(&leader, "ideas");
        let mut membership = Membership::new();

        let result = membership.join(Arc::clone(&table), "chair", &stranger, "bob");

        assert!(matches!(result, Err(MembershipError::NotAuthorized { .. })));
        assert!(!membership.is_member(), "a denied join must change nothing");
        assert!(!table.lock().unwrap().seat_exists("chair"));
    }

    #[test]
    fn test_join_existing_seat_as_non_leader_succeeds() {
        let leader = make_link(1);
        let guest = make_link(2);
        let table = make_table(&leader, "ideas");
        table.lock().unwrap().create_seat("chair", "");
        let mut membership = Membership::new();

        membership
            .join(Arc::clone(&table), "chair", &guest, "bob")
            .expect("joining a declared seat needs no leadership");

        assert_eq!(membership.seat_id(), Some("chair"));
        assert_eq!(
            table.lock().unwrap().occupant_ref("chair"),
            Some("_client_2".to_string())
        );
    }

    #[test]
    fn test_same_table_join_degrades_to_move() {
        let leader = make_link(1);
        let table = make_table(&leader, "ideas");
        let mut membership = Membership::new();
        membership
            .join(Arc::clone(&table), "chair", &leader, "alice")
            .unwrap();

        membership
            .join(Arc::clone(&table), "bench", &leader, "alice")
            .unwrap();

        assert_eq!(membership.seat_id(), Some("bench"));
        let locked = table.lock().unwrap();
        assert_eq!(locked.occupant_ref("chair"), None, "old seat is vacated");
        assert_eq!(locked.occupant_ref("bench"), Some("_client_1".to_string()));
    }

    #[test]
    fn test_cross_table_join_leaves_the_first_table() {
        let session = make_link(1);
        let first = make_table(&session, "ideas");
        let second = make_table(&session, "sketches");
        let mut membership = Membership::new();
        membership.join(Arc::clone(&first), "chair", &session, "alice").unwrap();

        let left = membership
            .join(Arc::clone(&second), "bench", &session, "alice")
            .unwrap();

        assert!(Arc::ptr_eq(&left.unwrap(), &first), "join must report the table it left");
        assert_eq!(first.lock().unwrap().occupant_count(), 0);
        assert_eq!(membership.seat_id(), Some("bench"));
        assert!(Arc::ptr_eq(membership.table().unwrap(), &second));
    }

    #[test]
    fn test_member_of_at_most_one_table_across_transitions() {
        let session = make_link(1);
        let a = make_table(&session, "a");
        let b = make_table(&session, "b");
        let mut membership = Membership::new();

        // Arbitrary join/move/leave sequence; after every step the session
        // holds at most one seat across both tables.
        let occupancy = |ta: &Arc<Mutex<Table>>, tb: &Arc<Mutex<Table>>| {
            ta.lock().unwrap().occupant_count() + tb.lock().unwrap().occupant_count()
        };

        membership.join(Arc::clone(&a), "s1", &session, "x").unwrap();
        assert_eq!(occupancy(&a, &b), 1);
        membership.join(Arc::clone(&a), "s2", &session, "x").unwrap();
        assert_eq!(occupancy(&a, &b), 1);
        membership.join(Arc::clone(&b), "s1", &session, "x").unwrap();
        assert_eq!(occupancy(&a, &b), 1);
        membership.leave(1);
        assert_eq!(occupancy(&a, &b), 0);
        assert!(!membership.is_member());
    }

    #[test]
    fn test_leave_when_unjoined_is_a_no_op() {
        let mut membership = Membership::new();
        assert!(membership.leave(1).is_none());
        assert!(!membership.is_member());
    }

    #[test]
    fn test_move_when_unjoined_alters_no_table_state() {
        let leader = make_link(1);
        let table = make_table(&leader, "ideas");
        table.lock().unwrap().create_seat("chair", "");
        let mut membership = Membership::new();

        membership.move_seat("chair", &leader, "alice");

        assert!(!membership.is_member());
        assert_eq!(table.lock().unwrap().occupant_ref("chair"), None);
    }

    #[test]
    fn test_leave_retains_owner_record() {
        let leader = make_link(1);
        let table = make_table(&leader, "ideas");
        let mut membership = Membership::new();
        membership.join(Arc::clone(&table), "chair", &leader, "alice").unwrap();

        membership.leave(1);

        let locked = table.lock().unwrap();
        assert_eq!(locked.owner_of("chair"), Some("alice"));
        assert!(locked.is_deserted());
    }
}
