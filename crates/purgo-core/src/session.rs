//! The per-session core object.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::events::ErrorNotifier;
use crate::export::{ExportReport, Exporter, StagedTransfer};
use crate::ingest::{Coordinator, ItemHandle};
use crate::store::ResultStore;
use crate::types::{ErrorEvent, ItemId, ProcessedItem, ProcessingState, StoreEvent};

/// Owns the coordinator, result store, error channel and exporter for one
/// application session. Nothing outlives it and nothing is persisted.
pub struct Session {
    config: Config,
    coordinator: Coordinator,
    store: Arc<ResultStore>,
    errors: ErrorNotifier,
    exporter: Exporter,
}

impl Session {
    /// Start a session. Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Starting Purgo session v{}", crate::VERSION);

        let capacity = config.pipeline.event_capacity;
        let store = Arc::new(ResultStore::new(capacity));
        let errors = ErrorNotifier::new(capacity);
        let coordinator = Coordinator::new(&config, Arc::clone(&store), errors.clone());
        let exporter = Exporter::new(Arc::clone(&store), config.staging_dir());

        Ok(Self {
            config,
            coordinator,
            store,
            errors,
            exporter,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::load()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Admit a dropped file. Resolves once the item is queued, not processed.
    pub async fn submit(&self, filename: impl Into<String>, payload: impl Into<Bytes>) -> ItemHandle {
        self.coordinator.submit(filename.into(), payload.into()).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorEvent> {
        self.errors.subscribe()
    }

    /// Completed items in completion order.
    pub fn snapshot(&self) -> Vec<Arc<ProcessedItem>> {
        self.store.snapshot()
    }

    pub fn get(&self, id: ItemId) -> Option<Arc<ProcessedItem>> {
        self.store.get(id)
    }

    pub fn state(&self, id: ItemId) -> Option<ProcessingState> {
        self.coordinator.state(id)
    }

    pub fn remove(&self, id: ItemId) -> bool {
        self.coordinator.remove(id)
    }

    pub fn clear(&self) {
        self.coordinator.clear()
    }

    /// See [`Exporter::export_one`]. Existing files are overwritten.
    pub fn export_one(&self, id: ItemId, destination: &Path) -> std::result::Result<PathBuf, ExportError> {
        self.exporter.export_one(id, destination)
    }

    /// See [`Exporter::export_many`]. Existing files are overwritten.
    pub fn export_many(
        &self,
        ids: &[ItemId],
        dir: &Path,
    ) -> std::result::Result<ExportReport, ExportError> {
        self.exporter.export_many(ids, dir)
    }

    pub fn stage_for_transfer(&self, ids: &[ItemId]) -> std::result::Result<StagedTransfer, ExportError> {
        self.exporter.stage_for_transfer(ids)
    }

    /// Stop accepting work and wait for queued items to finish.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PurgoError};
    use crate::strip::{exif_absent, inspect};
    use crate::test_support::{tagged_jpeg, tagged_png, tagged_webp};
    use crate::types::ItemOutcome;

    async fn complete(session: &Session, name: &str, payload: Vec<u8>) -> Arc<ProcessedItem> {
        match session.submit(name, payload).await.wait().await {
            ItemOutcome::Completed(item) => item,
            other => panic!("{name}: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_rejects_invalid_config() {
        let mut config = Config::default();
        config.pipeline.buffer_size = 0;
        assert!(matches!(Session::new(config), Err(PurgoError::Config(_))));
    }

    #[tokio::test]
    async fn test_drop_strip_export_round() {
        let session = Session::new(Config::default()).unwrap();
        let mut events = session.subscribe();

        let jpeg = complete(&session, "a.jpg", tagged_jpeg()).await;
        let png = complete(&session, "b.png", tagged_png()).await;
        let webp = complete(&session, "c.webp", tagged_webp()).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.len(), 3);
        for _ in 0..3 {
            assert!(matches!(events.try_recv(), Ok(StoreEvent::Added(_))));
        }

        let out = tempfile::tempdir().unwrap();
        let report = session
            .export_many(&[jpeg.id, png.id, webp.id], out.path())
            .unwrap();
        assert!(report.is_complete());

        for name in ["a.jpg", "b.png", "c.webp"] {
            let bytes = std::fs::read(out.path().join(name)).unwrap();
            assert!(exif_absent(&bytes), "{name} still has EXIF");
            let inventory = inspect(&bytes).unwrap();
            assert!(inventory.is_clean(), "{name}: {:?}", inventory.blocks);
        }

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_reaches_error_channel_only() {
        let session = Session::new(Config::default()).unwrap();
        let mut errors = session.subscribe_errors();

        let handle = session.submit("broken.png", b"\x89PNG\r\n\x1a\nnope".to_vec()).await;
        let id = handle.id().unwrap();
        assert!(matches!(
            handle.wait().await,
            ItemOutcome::Failed(ErrorKind::CorruptSource)
        ));

        assert!(session.snapshot().is_empty());
        assert!(session.get(id).is_none());
        assert_eq!(errors.try_recv().unwrap().item, Some(id));

        let err = session.export_one(id, Path::new("unused")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownItem);
    }

    #[tokio::test]
    async fn test_staging_uses_configured_root() {
        let root = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.export.staging_dir = root.path().to_string_lossy().into_owned();
        let session = Session::new(config).unwrap();

        let item = complete(&session, "a.jpg", tagged_jpeg()).await;
        let staged = session.stage_for_transfer(&[item.id]).unwrap();
        assert!(staged.root().starts_with(root.path()));
        assert_eq!(
            std::fs::read(&staged.paths()[0]).unwrap(),
            item.sanitized_payload.as_ref()
        );
        staged.cancel();
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
