//! Thread-safe serial counter for identity and request-id allocation.
//!
//! The server allocates two kinds of serial numbers: session identities
//! (`_client_<n>`) and content-request identifiers. Both must be unique for
//! the lifetime of the process and must stay race-free when several logical
//! requests are issued back-to-back within the same scheduling tick.
//!
//! Rather than a module-global counter, each consumer owns (or is handed)
//! its own `SerialCounter` instance at construction time. That keeps shared
//! state explicit and lets tests inject a fresh counter for deterministic
//! sequences.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter.
///
/// Values start at 1 and increment by 1 with each call to [`next`]; a value
/// is never reused and the counter is never reset.
///
/// # Examples
///
/// ```rust
/// use parlor_core::protocol::SerialCounter;
///
/// let counter = SerialCounter::new();
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.next(), 2);
/// ```
pub struct SerialCounter {
    inner: AtomicU64,
}

impl SerialCounter {
    /// Creates a new counter whose first [`next`] returns 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next serial number and atomically advances the counter.
    ///
    /// `fetch_add` performs the read-modify-write as a single indivisible
    /// step, so concurrent callers can never observe the same value.
    /// `Ordering::Relaxed` is sufficient: the values are identifiers, not
    /// a memory-synchronisation mechanism.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns the most recently issued value without advancing.
    ///
    /// Useful for diagnostics; by the time the caller uses the returned
    /// value another thread may already have advanced the counter.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SerialCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_serial_counter_starts_at_one() {
        let counter = SerialCounter::new();
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn test_serial_counter_increments_monotonically() {
        let counter = SerialCounter::new();
        let values: Vec<u64> = (0..100).map(|_| counter.next()).collect();
        for window in values.windows(2) {
            assert!(window[1] > window[0], "values must be strictly increasing");
        }
    }

    #[test]
    fn test_current_does_not_advance() {
        let counter = SerialCounter::new();
        counter.next();
        assert_eq!(counter.current(), 1);
        assert_eq!(counter.next(), 2);
    }

    #[test]
    fn test_serial_counter_values_are_unique_across_threads() {
        let counter = Arc::new(SerialCounter::new());
        let thread_count = 8;
        let per_thread = 1000;

        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..per_thread).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        all.sort_unstable();
        all.dedup();
        assert_eq!(
            all.len(),
            thread_count * per_thread,
            "every serial number must be unique across threads"
        );
    }

    #[test]
    fn test_default_matches_new() {
        let counter = SerialCounter::default();
        assert_eq!(counter.next(), 1);
    }
}
