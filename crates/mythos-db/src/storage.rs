//! [`FileStorage`]: the [`Persistence`] backend over the data directory.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//!   |-- events.jsonl         (EventStore, append + sync per event)
//!   |-- snapshot.json        (SnapshotStore, temp file + rename)
//!   +-- mythos-export.yaml   (export_store, temp file + rename)
//! ```

use std::path::{Path, PathBuf};

use mythos_core::config::StorageConfig;
use mythos_core::{MythosError, Persistence};
use mythos_types::{ExportDocument, InvocationEvent, Snapshot};
use tracing::info;

use crate::error::DbError;
use crate::event_store::EventStore;
use crate::export_store;
use crate::snapshot_store::SnapshotStore;

/// Event log, snapshot and export files under one data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
    events: EventStore,
    snapshots: SnapshotStore,
    export_path: PathBuf,
}

impl FileStorage {
    /// Open the data directory named by `config`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the directory cannot be created.
    pub fn open(config: &StorageConfig) -> Result<Self, DbError> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| DbError::io(&config.data_dir, e))?;
        info!(data_dir = %config.data_dir.display(), "Opened data directory");
        Ok(Self {
            data_dir: config.data_dir.clone(),
            events: EventStore::new(config.events_path()),
            snapshots: SnapshotStore::new(config.snapshot_path()),
            export_path: config.export_path(),
        })
    }

    /// The data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The event log file.
    pub const fn events(&self) -> &EventStore {
        &self.events
    }

    /// The snapshot file.
    pub const fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Where [`Self::write_export`] writes by default.
    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Write `document` to `path`, or to the configured export file.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the document cannot be encoded or written.
    pub fn write_export(
        &self,
        document: &ExportDocument,
        path: Option<&Path>,
    ) -> Result<PathBuf, DbError> {
        let target = path.unwrap_or(&self.export_path);
        export_store::write_export(target, document)?;
        Ok(target.to_path_buf())
    }
}

impl Persistence for FileStorage {
    fn load_events(&self) -> Result<Vec<InvocationEvent>, MythosError> {
        Ok(self.events.load()?)
    }

    fn append_event(&mut self, event: &InvocationEvent) -> Result<(), MythosError> {
        Ok(self.events.append(event)?)
    }

    fn load_snapshot(&self) -> Result<Option<Snapshot>, MythosError> {
        Ok(self.snapshots.load()?)
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), MythosError> {
        Ok(self.snapshots.save(snapshot)?)
    }
}
