//! Cancellable timer handles owned by a match. The aggregate requests arm and
//! cancel operations through timer commands; the spawned tasks themselves
//! live here as abort handles so that removal and superseding transitions can
//! tear them down explicitly.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::task::AbortHandle;

use crate::state::live::TimerKind;

/// The set of timer tasks a single match owns, at most one per kind.
#[derive(Debug, Default)]
pub struct TimerSet {
    slots: Mutex<HashMap<TimerKind, AbortHandle>>,
}

impl TimerSet {
    /// Store a freshly spawned timer task, aborting any previous task of the
    /// same kind.
    pub fn store(&self, kind: TimerKind, handle: AbortHandle) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slots.insert(kind, handle) {
            previous.abort();
        }
    }

    /// Abort and forget the timer of the given kind, if armed.
    pub fn cancel(&self, kind: TimerKind) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slots.remove(&kind) {
            handle.abort();
        }
    }

    /// Abort every armed timer. Called at `game_end` and on removal.
    pub fn cancel_all(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in slots.drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
