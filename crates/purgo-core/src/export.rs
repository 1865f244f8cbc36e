//! Writing sanitized payloads out of the session.
//!
//! Exports replace existing files; they never rename around a collision.
//! Every write goes to a temporary file in the destination directory first
//! and is renamed into place, so a reader never observes a partial file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;

use crate::error::{ErrorKind, ExportError};
use crate::store::ResultStore;
use crate::types::{ItemId, ProcessedItem};

/// A file written by a batch export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub id: ItemId,
    pub path: PathBuf,
}

/// An item a batch export could not write.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub id: ItemId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of [`Exporter::export_many`]; every requested id appears once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub written: Vec<ExportedFile>,
    pub failed: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sanitized copies staged for an outbound transfer.
///
/// Each item lives in its own sub-directory named after its id, so equal
/// display names never collide. The whole tree is deleted on [`finish`],
/// [`cancel`] or drop.
///
/// [`finish`]: StagedTransfer::finish
/// [`cancel`]: StagedTransfer::cancel
#[derive(Debug)]
pub struct StagedTransfer {
    dir: TempDir,
    paths: Vec<PathBuf>,
}

impl StagedTransfer {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Staged files, in the order their ids were requested.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The transfer completed; remove the staged copies.
    pub fn finish(self) -> std::io::Result<()> {
        tracing::debug!("Transfer finished, removing {:?}", self.dir.path());
        self.dir.close()
    }

    /// The transfer was abandoned; remove the staged copies.
    pub fn cancel(self) {
        tracing::debug!("Transfer cancelled, removing {:?}", self.dir.path());
        if let Err(e) = self.dir.close() {
            tracing::warn!("Failed to remove staged transfer: {}", e);
        }
    }
}

/// Copies completed items to the filesystem.
#[derive(Debug, Clone)]
pub struct Exporter {
    store: Arc<ResultStore>,
    staging_root: Option<PathBuf>,
}

impl Exporter {
    /// `staging_root` of `None` stages under the system temp directory.
    pub fn new(store: Arc<ResultStore>, staging_root: Option<PathBuf>) -> Self {
        Self {
            store,
            staging_root,
        }
    }

    fn lookup(&self, id: ItemId) -> Result<Arc<ProcessedItem>, ExportError> {
        self.store.get(id).ok_or(ExportError::UnknownItem(id))
    }

    /// Write one item to `destination`, replacing any existing file.
    pub fn export_one(&self, id: ItemId, destination: &Path) -> Result<PathBuf, ExportError> {
        let item = self.lookup(id)?;
        write_atomic(destination, &item.sanitized_payload)?;
        tracing::info!("Exported {} to {:?}", id, destination);
        Ok(destination.to_path_buf())
    }

    /// Write every item into `dir` under its display name.
    ///
    /// Per-item failures are collected in the report. Only a destination that
    /// cannot be used as a directory fails the whole call. Display names that
    /// collide within one batch are written in order, so the later one wins.
    pub fn export_many(&self, ids: &[ItemId], dir: &Path) -> Result<ExportReport, ExportError> {
        fs::create_dir_all(dir).map_err(|e| ExportError::from_io(dir, e))?;
        if !dir.is_dir() {
            return Err(ExportError::DestinationConflict {
                path: dir.to_path_buf(),
                message: "not a directory".into(),
            });
        }

        let mut report = ExportReport::default();
        for &id in ids {
            let result = self.lookup(id).and_then(|item| {
                let path = dir.join(&item.display_name);
                write_atomic(&path, &item.sanitized_payload).map(|()| path)
            });
            match result {
                Ok(path) => report.written.push(ExportedFile { id, path }),
                Err(e) => {
                    tracing::warn!("Export of {} failed: {}", id, e);
                    report.failed.push(ExportFailure {
                        id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Exported {}/{} items to {:?}",
            report.written.len(),
            ids.len(),
            dir
        );
        Ok(report)
    }

    /// Copy items into a fresh scoped directory for handing to another process.
    ///
    /// All-or-nothing: any unknown id or write failure removes what was staged.
    pub fn stage_for_transfer(&self, ids: &[ItemId]) -> Result<StagedTransfer, ExportError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("purgo-transfer-");
        let dir = match &self.staging_root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|e| ExportError::from_io(root, e))?;
                builder
                    .tempdir_in(root)
                    .map_err(|e| ExportError::from_io(root, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| ExportError::from_io(std::env::temp_dir(), e))?,
        };

        let mut paths = Vec::with_capacity(ids.len());
        for &id in ids {
            let item = self.lookup(id)?;
            let item_dir = dir.path().join(id.to_string());
            fs::create_dir_all(&item_dir).map_err(|e| ExportError::from_io(&item_dir, e))?;
            let path = item_dir.join(&item.display_name);
            fs::write(&path, &item.sanitized_payload).map_err(|e| ExportError::from_io(&path, e))?;
            paths.push(path);
        }

        tracing::debug!("Staged {} items in {:?}", paths.len(), dir.path());
        Ok(StagedTransfer { dir, paths })
    }
}

fn write_atomic(destination: &Path, data: &[u8]) -> Result<(), ExportError> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".purgo-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| ExportError::from_io(destination, e))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ExportError::from_io(destination, e))?;
    tmp.persist(destination)
        .map_err(|e| ExportError::from_io(destination, e.error))?;
    Ok(())
}
