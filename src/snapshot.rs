//! In-memory "latest" snapshot guarded together with the trend state.
//!
//! The current `Reading`, the trends derived for it, and the previous-value
//! map all live behind one mutex. An update computes the new reading from
//! the current one, classifies it, and swaps it in without releasing the
//! lock, so a reader sees either the whole update or none of it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::Reading;
use crate::trend::{flat_trends, TrendMap, TrendTracker};

// ---

#[derive(Debug)]
struct SnapshotState {
    current: Reading,
    trends: TrendMap,
    tracker: TrendTracker,
}

#[derive(Debug)]
pub struct SnapshotStore {
    state: Mutex<SnapshotState>,
}

impl SnapshotStore {
    /// Start from a zero-valued reading for `location`.
    pub fn new(location: &str) -> Self {
        Self {
            state: Mutex::new(SnapshotState {
                current: Reading {
                    location: location.to_string(),
                    ..Reading::default()
                },
                trends: flat_trends(),
                tracker: TrendTracker::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the snapshot with `build(current)` and advance the trends.
    ///
    /// `build` runs under the lock; it must not block.
    pub fn update<F>(&self, build: F) -> Reading
    where
        F: FnOnce(&Reading) -> Reading,
    {
        // ---
        let mut guard = self.lock();
        let state = &mut *guard;
        let next = build(&state.current);
        state.trends = state.tracker.advance(&next);
        state.current = next.clone();
        next
    }

    /// Consistent copy of the latest reading and its trends.
    pub fn read(&self) -> (Reading, TrendMap) {
        let state = self.lock();
        (state.current.clone(), state.trends.clone())
    }
}
