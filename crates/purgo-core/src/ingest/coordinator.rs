//! Admission, dispatch and completion of submitted payloads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{Config, DedupStrategy};
use crate::error::{ErrorKind, StripError};
use crate::events::ErrorNotifier;
use crate::store::ResultStore;
use crate::strip::MetadataStripper;
use crate::types::{
    display_name_for, FormatHint, ItemId, ItemOutcome, ProcessedItem, ProcessingState,
    SourceItem, StripOutcome,
};

use super::channel::bounded_channel;
use super::state::StateTable;
use super::{DedupIndex, Fingerprint};

struct Job {
    item: SourceItem,
    reply: oneshot::Sender<ItemOutcome>,
}

enum HandleState {
    Ready(ItemOutcome),
    Waiting(oneshot::Receiver<ItemOutcome>),
}

/// Receipt for one submission.
pub struct ItemHandle {
    id: Option<ItemId>,
    state: HandleState,
}

impl ItemHandle {
    fn ready(id: Option<ItemId>, outcome: ItemOutcome) -> Self {
        Self {
            id,
            state: HandleState::Ready(outcome),
        }
    }

    /// The admitted item's id; `None` for a duplicate or a submission after shutdown.
    pub fn id(&self) -> Option<ItemId> {
        self.id
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.state, HandleState::Ready(ItemOutcome::Ignored))
    }

    /// Wait for the item to reach a final outcome.
    pub async fn wait(self) -> ItemOutcome {
        match self.state {
            HandleState::Ready(outcome) => outcome,
            // The worker went away without answering, e.g. on runtime shutdown.
            HandleState::Waiting(rx) => rx.await.unwrap_or(ItemOutcome::Discarded),
        }
    }
}

struct Shared {
    stripper: MetadataStripper,
    dedup: DedupIndex,
    states: StateTable,
    store: Arc<ResultStore>,
    errors: ErrorNotifier,
}

/// Accepts submissions and runs them through a bounded pool of strip workers.
///
/// Must be created inside a tokio runtime; workers are spawned immediately.
pub struct Coordinator {
    shared: Arc<Shared>,
    queue: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    max_bytes: u64,
}

impl Coordinator {
    pub fn new(config: &Config, store: Arc<ResultStore>, errors: ErrorNotifier) -> Self {
        let shared = Arc::new(Shared {
            stripper: MetadataStripper::new(config.strip.clone()),
            dedup: DedupIndex::new(config.dedup.strategy),
            states: StateTable::default(),
            store,
            errors,
        });

        let (tx, rx) = bounded_channel::<Job>(&config.pipeline);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = (0..config.processing.parallel_workers)
            .map(|index| tokio::spawn(run_worker(index, Arc::clone(&shared), Arc::clone(&rx))))
            .collect();

        tracing::debug!(
            "Started {} strip workers (queue capacity {})",
            config.processing.parallel_workers,
            config.pipeline.buffer_size
        );

        Self {
            shared,
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            next_id: AtomicU64::new(1),
            max_bytes: config.limits.max_bytes(),
        }
    }

    /// Admit a payload for stripping.
    ///
    /// Waits only for queue capacity, never for the strip itself. Capacity is
    /// reserved before the fingerprint is recorded, so dropping this future
    /// while it waits leaves no trace.
    pub async fn submit(&self, filename: String, payload: Bytes) -> ItemHandle {
        let size = payload.len() as u64;
        if size > self.max_bytes {
            return self.reject_too_large(filename, payload);
        }

        let fingerprint = self.shared.dedup.identify(&filename, &payload);
        if self.shared.dedup.is_duplicate(&fingerprint) {
            tracing::debug!("Ignoring duplicate submission {:?}", filename);
            return ItemHandle::ready(None, ItemOutcome::Ignored);
        }

        let queue = self.queue.lock().clone();
        let permit = match queue {
            Some(tx) => tx.reserve_owned().await.ok(),
            None => None,
        };
        let Some(permit) = permit else {
            tracing::warn!("Queue closed, discarding {:?}", filename);
            return ItemHandle::ready(None, ItemOutcome::Discarded);
        };

        // Everything below runs without yielding.
        if !self.shared.dedup.admit(fingerprint.clone()) {
            tracing::debug!("Ignoring duplicate submission {:?}", filename);
            return ItemHandle::ready(None, ItemOutcome::Ignored);
        }

        let id = self.allocate_id();
        self.shared.states.insert(id, fingerprint.clone());
        tracing::debug!("Admitted {:?} as {} ({} bytes)", filename, id, size);

        let (reply, rx) = oneshot::channel();
        permit.send(Job {
            item: SourceItem {
                id,
                filename,
                payload,
                fingerprint,
            },
            reply,
        });

        ItemHandle {
            id: Some(id),
            state: HandleState::Waiting(rx),
        }
    }

    fn reject_too_large(&self, filename: String, payload: Bytes) -> ItemHandle {
        let id = self.allocate_id();
        // Skip content hashing for payloads that will never be processed.
        let fingerprint = Fingerprint::new(DedupStrategy::NameAndSize, &filename, &payload);
        self.shared.states.insert(id, fingerprint);

        let err = StripError::TooLarge {
            size_mb: payload.len() as u64 / (1024 * 1024),
            max_mb: self.max_bytes / (1024 * 1024),
        };
        self.shared
            .states
            .advance(id, ProcessingState::Failed(ErrorKind::TooLarge));
        self.shared
            .errors
            .emit(Some(id), ErrorKind::TooLarge, format!("{filename}: {err}"));
        ItemHandle::ready(Some(id), ItemOutcome::Failed(ErrorKind::TooLarge))
    }

    fn allocate_id(&self) -> ItemId {
        ItemId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn state(&self, id: ItemId) -> Option<ProcessingState> {
        self.shared.states.get(id)
    }

    /// Withdraw an item in any state.
    ///
    /// A completed item leaves the result store; a pending or in-flight item
    /// finishes in the background and its result is thrown away. The
    /// fingerprint is released so the same file can be submitted again.
    pub fn remove(&self, id: ItemId) -> bool {
        let store = &self.shared.store;
        let withdrawn = self.shared.states.withdraw_with(id, |state| {
            if matches!(state, ProcessingState::Completed(_)) {
                store.remove(id);
            }
        });

        match withdrawn {
            Some((fingerprint, state)) => {
                // Failed items released their fingerprint when they failed.
                if !matches!(state, ProcessingState::Failed(_)) {
                    self.shared.dedup.forget(&fingerprint);
                }
                tracing::debug!("Removed {} ({})", id, state.label());
                true
            }
            None => false,
        }
    }

    /// Drop every item, every result and the duplicate index.
    pub fn clear(&self) {
        let shared = &self.shared;
        shared.states.clear_with(|| {
            shared.store.clear();
            shared.dedup.clear();
        });
        tracing::debug!("Session cleared");
    }

    /// Close the queue and wait for workers to drain it.
    pub async fn shutdown(&self) {
        drop(self.queue.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Strip worker ended abnormally: {}", e);
            }
        }
        tracing::debug!("All strip workers stopped");
    }
}

async fn run_worker(
    index: usize,
    shared: Arc<Shared>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
) {
    loop {
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let outcome = shared.process(job.item).await;
        // The submitter may have dropped its handle.
        let _ = job.reply.send(outcome);
    }
    tracing::trace!("Strip worker {} exiting", index);
}

impl Shared {
    async fn process(&self, item: SourceItem) -> ItemOutcome {
        let id = item.id;
        if !self.states.advance(id, ProcessingState::InFlight) {
            return ItemOutcome::Discarded;
        }

        let stripper = self.stripper.clone();
        let payload = item.payload.clone();
        let hint = FormatHint::from_filename(&item.filename);
        let joined = tokio::task::spawn_blocking(move || stripper.strip(&payload, hint)).await;

        let display_name = display_name_for(&item.filename);
        let result = match joined {
            Ok(Ok(stripped)) => Ok(ProcessedItem {
                id,
                display_name,
                sanitized_payload: Bytes::from(stripped.payload),
                format: Some(stripped.format),
                outcome: StripOutcome::Stripped {
                    removed: stripped.removed,
                },
            }),
            // Only payloads with no image signature are delivered unchanged;
            // an image we cannot rewrite would leak its metadata.
            Ok(Err(StripError::NotAnImage { detail }))
                if self.stripper.config().passthrough_unsupported =>
            {
                tracing::debug!("Passing {} through untouched: {}", id, detail);
                Ok(ProcessedItem {
                    id,
                    display_name,
                    sanitized_payload: item.payload.clone(),
                    format: None,
                    outcome: StripOutcome::PassThrough,
                })
            }
            Ok(Err(e)) => Err((e.kind(), format!("{}: {}", item.filename, e))),
            Err(e) => Err((
                ErrorKind::EncodeFailure,
                format!("{}: strip task aborted: {}", item.filename, e),
            )),
        };

        match result {
            Ok(processed) => {
                let processed = Arc::new(processed);
                let store = &self.store;
                let published = self.states.advance_with(
                    id,
                    ProcessingState::Completed(Arc::clone(&processed)),
                    || store.push(Arc::clone(&processed)),
                );
                if published {
                    ItemOutcome::Completed(processed)
                } else {
                    ItemOutcome::Discarded
                }
            }
            Err((kind, message)) => {
                if !self.states.advance(id, ProcessingState::Failed(kind)) {
                    return ItemOutcome::Discarded;
                }
                self.dedup.forget(&item.fingerprint);
                self.errors.emit(Some(id), kind, message);
                ItemOutcome::Failed(kind)
            }
        }
    }
}
