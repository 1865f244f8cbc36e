//! Per-item lifecycle table.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{ItemId, ProcessingState};

use super::Fingerprint;

#[derive(Debug)]
struct Entry {
    state: ProcessingState,
    fingerprint: Fingerprint,
}

/// Tracks the [`ProcessingState`] of every live item.
///
/// An item that is no longer in the table has been withdrawn or cleared;
/// any later transition for it is refused, which is how in-flight work for
/// withdrawn items gets discarded.
#[derive(Debug, Default)]
pub(crate) struct StateTable {
    entries: Mutex<HashMap<ItemId, Entry>>,
}

impl StateTable {
    pub(crate) fn insert(&self, id: ItemId, fingerprint: Fingerprint) {
        self.entries.lock().insert(
            id,
            Entry {
                state: ProcessingState::Pending,
                fingerprint,
            },
        );
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<ProcessingState> {
        self.entries.lock().get(&id).map(|e| e.state.clone())
    }

    /// Move `id` to `next`, running `commit` under the table lock on success.
    ///
    /// Returns `false` without calling `commit` if the item is gone or the
    /// transition would go backwards.
    pub(crate) fn advance_with<F>(&self, id: ItemId, next: ProcessingState, commit: F) -> bool
    where
        F: FnOnce(),
    {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&id) else {
            tracing::debug!("{} no longer tracked, dropping {} transition", id, next.label());
            return false;
        };
        if !entry.state.can_advance_to(&next) {
            tracing::warn!(
                "Rejected transition for {}: {} -> {}",
                id,
                entry.state.label(),
                next.label()
            );
            return false;
        }
        entry.state = next;
        commit();
        true
    }

    pub(crate) fn advance(&self, id: ItemId, next: ProcessingState) -> bool {
        self.advance_with(id, next, || {})
    }

    /// Stop tracking `id`, returning its fingerprint and last state.
    ///
    /// `on_removed` runs under the table lock, so a worker cannot publish
    /// the item between removal and cleanup.
    pub(crate) fn withdraw_with<F>(&self, id: ItemId, on_removed: F) -> Option<(Fingerprint, ProcessingState)>
    where
        F: FnOnce(&ProcessingState),
    {
        let mut entries = self.entries.lock();
        let entry = entries.remove(&id)?;
        on_removed(&entry.state);
        Some((entry.fingerprint, entry.state))
    }

    pub(crate) fn clear_with<F>(&self, on_cleared: F)
    where
        F: FnOnce(),
    {
        let mut entries = self.entries.lock();
        entries.clear();
        on_cleared();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
