//! Expanding command-line inputs into the files to submit.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::types::ContainerFormat;

/// A file found under one of the input paths.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Walks input paths for files to strip.
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery {
    /// Include files without a JPEG/PNG/WebP extension
    pub include_all: bool,
}

impl FileDiscovery {
    pub fn new(include_all: bool) -> Self {
        Self { include_all }
    }

    /// Files at `path`: the file itself, or every matching file below a directory.
    ///
    /// An explicitly named file is always returned; the extension filter only
    /// applies while walking directories. Hidden entries are skipped.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return std::fs::metadata(path)
                .map(|meta| {
                    vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        size: meta.len(),
                    }]
                })
                .unwrap_or_default();
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_candidate(e.path()))
            .filter_map(|e| {
                let size = e.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: e.into_path(),
                    size,
                })
            })
            .collect();

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn discover_all<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Vec<DiscoveredFile> {
        paths.into_iter().flat_map(|p| self.discover(p)).collect()
    }

    fn is_candidate(&self, path: &Path) -> bool {
        self.include_all
            || path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ContainerFormat::from_extension)
                .is_some()
    }

    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.'))
}
