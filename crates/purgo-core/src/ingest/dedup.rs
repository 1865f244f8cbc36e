//! Payload fingerprints and the duplicate index.

use std::collections::HashSet;

use blake3::Hasher as Blake3Hasher;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::DedupStrategy;

/// Identity of a submission, used only to reject duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub filename: String,
    pub len: u64,
    /// BLAKE3 hex digest, present under [`DedupStrategy::NameAndContent`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Fingerprint {
    pub fn new(strategy: DedupStrategy, filename: &str, payload: &[u8]) -> Self {
        let digest = match strategy {
            DedupStrategy::NameAndSize => None,
            DedupStrategy::NameAndContent => Some(content_hash(payload)),
        };
        Self {
            filename: filename.to_string(),
            len: payload.len() as u64,
            digest,
        }
    }
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

/// Set of fingerprints admitted in the current session.
///
/// All operations take one short lock, so concurrent admissions of the same
/// file cannot both succeed.
#[derive(Debug)]
pub struct DedupIndex {
    strategy: DedupStrategy,
    seen: Mutex<HashSet<Fingerprint>>,
}

impl DedupIndex {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    pub fn identify(&self, filename: &str, payload: &[u8]) -> Fingerprint {
        Fingerprint::new(self.strategy, filename, payload)
    }

    pub fn is_duplicate(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.lock().contains(fingerprint)
    }

    pub fn record(&self, fingerprint: Fingerprint) {
        self.seen.lock().insert(fingerprint);
    }

    /// Record `fingerprint` unless it is already present.
    ///
    /// Returns `true` when the caller won admission.
    pub fn admit(&self, fingerprint: Fingerprint) -> bool {
        self.seen.lock().insert(fingerprint)
    }

    pub fn forget(&self, fingerprint: &Fingerprint) {
        self.seen.lock().remove(fingerprint);
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
