//! Request/response correlation for out-of-band content retrieval.
//!
//! The server asks a client for its current project with
//! `project-request <id>` and the client answers, at some later point and
//! interleaved with arbitrary other traffic, with
//! `project-response <id> <payload>`. The [`Correlator`] bridges that gap:
//! it allocates the identifier, parks a oneshot continuation under it, and
//! fires the continuation exactly once when the matching response arrives.
//!
//! Identifiers come from a [`SerialCounter`] owned by the correlator, so
//! they are unique for the process lifetime and race-free even when
//! several requests are issued back-to-back. Resolving an identifier that
//! is unknown — a stray or duplicate response from the peer — is a logged
//! no-op, never an error: the remote end is free to misbehave without
//! tearing down the session.

use std::collections::HashMap;
use std::sync::Mutex;

use parlor_core::{ProjectError, SavedProject, SerialCounter};
use tokio::sync::oneshot;
use tracing::warn;

/// The value a pending request eventually resolves to: either the derived
/// record or the one class of failure that crosses this boundary.
pub type ProjectResult = Result<SavedProject, ProjectError>;

/// Maps in-flight request identifiers to their pending continuations.
pub struct Correlator {
    serial: SerialCounter,
    pending: Mutex<HashMap<u64, oneshot::Sender<ProjectResult>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            serial: SerialCounter::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates a fresh request identifier and parks a continuation under
    /// it. The caller embeds the identifier in the outbound frame and
    /// awaits the returned receiver.
    pub fn begin(&self) -> (u64, oneshot::Receiver<ProjectResult>) {
        let id = self.serial.next();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("lock poisoned")
            .insert(id, tx);
        (id, rx)
    }

    /// Fires and removes the continuation parked under `id`.
    ///
    /// Returns `false` when no such request is pending — a stray or
    /// duplicate response — which is logged as a warning and otherwise
    /// ignored. Each identifier is therefore fulfilled at most once.
    pub fn resolve(&self, id: u64, result: ProjectResult) -> bool {
        let sender = self.pending.lock().expect("lock poisoned").remove(&id);
        match sender {
            Some(tx) => {
                // The receiver may already have given up (timeout); a failed
                // send just drops the result.
                let _ = tx.send(result);
                true
            }
            None => {
                warn!(request_id = id, "no pending project request for this response");
                false
            }
        }
    }

    /// Removes a pending request without firing it. Used when the awaiting
    /// side stops listening (timeout) so a late response is treated as
    /// stray rather than delivered to nobody.
    pub fn abandon(&self, id: u64) -> bool {
        self.pending
            .lock()
            .expect("lock poisoned")
            .remove(&id)
            .is_some()
    }

    /// Number of requests still awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("lock poisoned").len()
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
