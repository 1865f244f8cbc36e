//! Purgo Core - Embeddable image metadata stripping library.
//!
//! Purgo removes identifying metadata (EXIF, GPS, XMP, IPTC, comments,
//! text chunks, timestamps) from JPEG, PNG and WebP files without touching
//! their pixel data, then hands the sanitized copies back for export.
//!
//! # Architecture
//!
//! One [`Session`] owns every component; nothing is persisted:
//!
//! ```text
//! submit → Dedup → bounded queue → workers → Strip → ResultStore → Export
//!                                              └── failures → ErrorNotifier
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use purgo_core::{Config, ItemOutcome, Session};
//!
//! #[tokio::main]
//! async fn main() -> purgo_core::Result<()> {
//!     let session = Session::new(Config::load()?)?;
//!
//!     let payload = std::fs::read("./holiday.jpg")?;
//!     if let ItemOutcome::Completed(item) = session.submit("holiday.jpg", payload).await.wait().await {
//!         session.export_one(item.id, "./clean/holiday.jpg".as_ref())?;
//!     }
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod export;
pub mod ingest;
pub mod session;
pub mod store;
pub mod strip;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use config::Config;
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use error::{ConfigError, ErrorKind, ExportError, PurgoError, Result, StripError, StripResult};
pub use events::ErrorNotifier;
pub use export::{ExportFailure, ExportReport, ExportedFile, Exporter, StagedTransfer};
pub use ingest::{Fingerprint, ItemHandle};
pub use session::Session;
pub use store::ResultStore;
pub use strip::{inspect, MetadataInventory, MetadataStripper, Stripped};
pub use types::{
    ContainerFormat, ErrorEvent, FormatHint, ItemId, ItemOutcome, MetadataKind, ProcessedItem,
    ProcessingState, RemovedBlock, StoreEvent, StripOutcome,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_session_new() {
        let session = Session::new(Config::default()).unwrap();
        assert_eq!(session.config().processing.parallel_workers, 4);
        assert!(session.snapshot().is_empty());
    }
}
