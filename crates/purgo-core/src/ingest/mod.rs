//! Ingestion: fingerprinting, duplicate rejection and the strip worker pool.
//!
//! ```text
//! submit → identify → admit? → Pending → queue → worker (InFlight) → strip
//!                                                   ├─ ok    → Completed → ResultStore
//!                                                   └─ error → Failed    → ErrorNotifier
//! ```

mod channel;
mod coordinator;
mod dedup;
mod state;

pub use coordinator::{Coordinator, ItemHandle};
pub use dedup::{DedupIndex, Fingerprint};
