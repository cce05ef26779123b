//! Process-wide registry of connected sessions and live tables.
//!
//! The `Directory` owns the serial counter that allocates session
//! identities, the identity → session map used to evict sessions when
//! their transport closes, and the set of live tables. Tables are found by
//! the pair a client names in `join-table`: the leader's wire identity and
//! the table name. Looking up a table that does not exist creates it, led
//! by the requester.
//!
//! All maps sit behind plain mutexes that are never held across an await
//! point; handler bodies are synchronous, so the single-lock discipline is
//! enough.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parlor_core::SerialCounter;
use tracing::{debug, info};

use crate::domain::table::{SessionLink, Table};

/// Registry of sessions and tables, shared across all connection tasks.
pub struct Directory {
    serial: SerialCounter,
    sessions: Mutex<HashMap<String, SessionLink>>,
    tables: Mutex<Vec<Arc<Mutex<Table>>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            serial: SerialCounter::new(),
            sessions: Mutex::new(HashMap::new()),
            tables: Mutex::new(Vec::new()),
        }
    }

    /// Allocates the next session identity.
    pub fn allocate_session_id(&self) -> u64 {
        self.serial.next()
    }

    // ── Session registry ──────────────────────────────────────────────────────

    /// Records a newly connected session under its wire identity.
    pub fn register(&self, link: SessionLink) {
        self.sessions
            .lock()
            .expect("lock poisoned")
            .insert(link.client_ref.clone(), link);
    }

    /// Evicts a session after its transport closed.
    pub fn evict(&self, client_ref: &str) {
        if self
            .sessions
            .lock()
            .expect("lock poisoned")
            .remove(client_ref)
            .is_some()
        {
            debug!(client_ref, "session evicted");
        }
    }

    /// Looks up a connected session by wire identity.
    pub fn find_session(&self, client_ref: &str) -> Option<SessionLink> {
        self.sessions
            .lock()
            .expect("lock poisoned")
            .get(client_ref)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("lock poisoned").len()
    }

    // ── Table registry ────────────────────────────────────────────────────────

    /// Creates a fresh table led by `leader` and registers it.
    pub fn create_table(&self, name: &str, leader: &SessionLink) -> Arc<Mutex<Table>> {
        let table = Arc::new(Mutex::new(Table::new(name, leader)));
        self.tables
            .lock()
            .expect("lock poisoned")
            .push(Arc::clone(&table));
        info!(table = name, leader = %leader.client_ref, "table created");
        table
    }

    /// Finds the table identified by `(leader_ref, name)`, creating it —
    /// led by `requester` — when no such table exists.
    pub fn get_or_create_table(
        &self,
        leader_ref: &str,
        name: &str,
        requester: &SessionLink,
    ) -> Arc<Mutex<Table>> {
        {
            let tables = self.tables.lock().expect("lock poisoned");
            for table in tables.iter() {
                let locked = table.lock().expect("lock poisoned");
                if locked.leader_ref() == leader_ref && locked.name() == name {
                    return Arc::clone(table);
                }
            }
        }
        self.create_table(name, requester)
    }

    /// Drops `table` from the registry when it has no occupants left.
    ///
    /// Whether a table is closeable is the table's own call
    /// ([`Table::is_deserted`]); this method only acts on its answer.
    pub fn drop_if_deserted(&self, table: &Arc<Mutex<Table>>) {
        let deserted = {
            let locked = table.lock().expect("lock poisoned");
            if locked.is_deserted() {
                info!(table = locked.name(), "dropping deserted table");
                true
            } else {
                false
            }
        };
        if deserted {
            self.tables
                .lock()
                .expect("lock poisoned")
                .retain(|t| !Arc::ptr_eq(t, table));
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.lock().expect("lock poisoned").len()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_link(id: u64) -> SessionLink {
        let (tx, _rx) = mpsc::unbounded_channel();
        SessionLink {
            session_id: id,
            client_ref: format!("_client_{id}"),
            outbox: tx,
        }
    }

    #[test]
    fn test_session_ids_are_unique() {
        let directory = Directory::new();
        let a = directory.allocate_session_id();
        let b = directory.allocate_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_register_and_evict_session() {
        let directory = Directory::new();
        let link = make_link(1);
        directory.register(link);

        assert!(directory.find_session("_client_1").is_some());
        assert_eq!(directory.session_count(), 1);

        directory.evict("_client_1");
        assert!(directory.find_session("_client_1").is_none());
        assert_eq!(directory.session_count(), 0);
    }

    #[test]
    fn test_get_or_create_finds_existing_table_by_leader_and_name() {
        let directory = Directory::new();
        let leader = make_link(1);
        let created = directory.create_table("ideas", &leader);

        let requester = make_link(2);
        let found = directory.get_or_create_table("_client_1", "ideas", &requester);

        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(directory.table_count(), 1);
    }

    #[test]
    fn test_get_or_create_spawns_missing_table_led_by_requester() {
        let directory = Directory::new();
        let requester = make_link(5);

        let table = directory.get_or_create_table("_client_1", "ideas", &requester);

        assert_eq!(directory.table_count(), 1);
        let locked = table.lock().unwrap();
        assert!(locked.is_leader(5), "a missing table is created for the requester");
    }

    #[test]
    fn test_drop_if_deserted_removes_empty_tables_only() {
        let directory = Directory::new();
        let leader = make_link(1);
        let table = directory.create_table("ideas", &leader);

        table.lock().unwrap().occupy("chair", leader.clone(), "alice");
        directory.drop_if_deserted(&table);
        assert_eq!(directory.table_count(), 1, "occupied tables stay registered");

        table.lock().unwrap().vacate("chair", 1);
        directory.drop_if_deserted(&table);
        assert_eq!(directory.table_count(), 0);
    }

    #[test]
    fn test_tables_with_same_name_but_different_leaders_are_distinct() {
        let directory = Directory::new();
        let alice = make_link(1);
        let bob = make_link(2);
        directory.create_table("ideas", &alice);
        directory.create_table("ideas", &bob);

        let found = directory.get_or_create_table("_client_2", "ideas", &alice);
        assert!(found.lock().unwrap().is_leader(2));
        assert_eq!(directory.table_count(), 2);
    }
}
