//! The snapshot file: the whole entity store as pretty-printed JSON.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mythos_types::Snapshot;
use tracing::debug;

use crate::atomic::write_atomic;
use crate::error::DbError;

/// Snapshot file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// A snapshot file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, or `None` if none has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file cannot be read and
    /// [`DbError::Serialization`] if it is not a valid snapshot.
    pub fn load(&self) -> Result<Option<Snapshot>, DbError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DbError::io(&self.path, e)),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        debug!(
            path = %self.path.display(),
            last_sequence = snapshot.last_sequence,
            "Loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Replace the snapshot with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the write fails. The previous snapshot is
    /// then still intact.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), DbError> {
        let mut bytes = serde_json::to_vec_pretty(snapshot)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use mythos_types::FORMAT_VERSION;

    use super::*;

    #[test]
    fn absent_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn saved_snapshot_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snapshot = Snapshot {
            format_version: FORMAT_VERSION,
            last_sequence: 7,
            entities: BTreeMap::new(),
        };

        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        std::fs::write(store.path(), "{\"format_version\": 1, \"last_seq").unwrap();

        assert!(matches!(store.load(), Err(DbError::Serialization(_))));
    }
}
