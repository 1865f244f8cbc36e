//! Observable collection of completed items.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::types::{ItemId, ProcessedItem, StoreEvent};

/// Completed items in completion order.
///
/// Events are sent while the write lock is held, so subscribers see
/// mutations in exactly the order the store applied them.
#[derive(Debug)]
pub struct ResultStore {
    items: RwLock<Vec<Arc<ProcessedItem>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl ResultStore {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            items: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// A consistent copy of the current contents.
    pub fn snapshot(&self) -> Vec<Arc<ProcessedItem>> {
        self.items.read().clone()
    }

    pub fn get(&self, id: ItemId) -> Option<Arc<ProcessedItem>> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub(crate) fn push(&self, item: Arc<ProcessedItem>) {
        let mut items = self.items.write();
        items.push(Arc::clone(&item));
        // No subscribers is not an error
        let _ = self.events.send(StoreEvent::Added(item));
    }

    pub(crate) fn remove(&self, id: ItemId) -> Option<Arc<ProcessedItem>> {
        let mut items = self.items.write();
        let index = items.iter().position(|item| item.id == id)?;
        let removed = items.remove(index);
        let _ = self.events.send(StoreEvent::Removed(id));
        Some(removed)
    }

    pub(crate) fn clear(&self) {
        let mut items = self.items.write();
        items.clear();
        let _ = self.events.send(StoreEvent::Cleared);
    }
}
