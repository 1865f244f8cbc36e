//! Error notification channel.

use tokio::sync::broadcast;

use crate::error::ErrorKind;
use crate::types::{ErrorEvent, ItemId};

/// Fans item failures out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ErrorNotifier {
    tx: broadcast::Sender<ErrorEvent>,
}

impl ErrorNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, item: Option<ItemId>, kind: ErrorKind, message: impl Into<String>) {
        let event = ErrorEvent {
            item,
            kind,
            message: message.into(),
        };
        match item {
            Some(id) => tracing::warn!("{} failed ({}): {}", id, event.kind, event.message),
            None => tracing::warn!("{}: {}", event.kind, event.message),
        }
        let _ = self.tx.send(event);
    }
}
