//! File-backed storage for the Mythos ledger.
//!
//! The event log is the source of truth; the snapshot is a cache of the
//! entity store that can always be rebuilt from it; the export is a
//! projection of the snapshot for outside readers.
//!
//! # Architecture
//!
//! ```text
//! MythosEngine
//!     |
//!     +-- append_event ----> EventStore     (JSON Lines, synced per line)
//!     +-- save_snapshot ---> SnapshotStore  (JSON, atomic replace)
//!     |
//! mythos export ----------> export_store    (YAML, atomic replace)
//! ```
//!
//! # Modules
//!
//! - [`storage`] -- [`FileStorage`], the `Persistence` implementation
//! - [`event_store`] -- Append-only event log file
//! - [`snapshot_store`] -- Snapshot file
//! - [`export_store`] -- YAML export reader and writer
//! - [`atomic`] -- Temp file + rename replacement
//! - [`error`] -- Shared error types

pub mod atomic;
pub mod error;
pub mod event_store;
pub mod export_store;
pub mod snapshot_store;
pub mod storage;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_store::EventStore;
pub use export_store::{read_export, write_export};
pub use snapshot_store::SnapshotStore;
pub use storage::FileStorage;
