//! The storage seam between the engine and wherever state lives.
//!
//! The engine only needs four things from storage: read the whole log,
//! append one event durably, and read or replace the snapshot. Files live
//! in `mythos-db`; [`MemoryPersistence`] serves tests and dry runs.

use mythos_types::{InvocationEvent, Snapshot};

use crate::error::MythosError;

/// Durable storage for the event log and the snapshot.
pub trait Persistence {
    /// Read every persisted event, in log order.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the log cannot be read.
    fn load_events(&self) -> Result<Vec<InvocationEvent>, MythosError>;

    /// Durably append one event. Must not return until the event would
    /// survive a crash.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the write fails. The log
    /// must then be as it was before the call.
    fn append_event(&mut self, event: &InvocationEvent) -> Result<(), MythosError>;

    /// Read the last saved snapshot, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if a snapshot exists but cannot
    /// be read or parsed.
    fn load_snapshot(&self) -> Result<Option<Snapshot>, MythosError>;

    /// Replace the snapshot, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the write fails. The previous
    /// snapshot must then still be readable.
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), MythosError>;
}

/// Storage held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    events: Vec<InvocationEvent>,
    snapshot: Option<Snapshot>,
    /// When set, snapshot reads fail as if the stored copy were corrupt.
    pub corrupt_snapshot: bool,
    /// When set, appends fail as if the disk were full.
    pub fail_appends: bool,
}

impl MemoryPersistence {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage preloaded with `events` and an optional snapshot.
    pub const fn with_contents(events: Vec<InvocationEvent>, snapshot: Option<Snapshot>) -> Self {
        Self {
            events,
            snapshot,
            corrupt_snapshot: false,
            fail_appends: false,
        }
    }

    /// Persisted events.
    pub fn events(&self) -> &[InvocationEvent] {
        &self.events
    }

    /// The stored snapshot.
    pub const fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Replace the stored snapshot directly.
    pub fn set_snapshot(&mut self, snapshot: Option<Snapshot>) {
        self.snapshot = snapshot;
    }
}

impl Persistence for MemoryPersistence {
    fn load_events(&self) -> Result<Vec<InvocationEvent>, MythosError> {
        Ok(self.events.clone())
    }

    fn append_event(&mut self, event: &InvocationEvent) -> Result<(), MythosError> {
        if self.fail_appends {
            return Err(MythosError::Persistence {
                message: "append rejected: storage unavailable".to_owned(),
            });
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<Snapshot>, MythosError> {
        if self.corrupt_snapshot {
            return Err(MythosError::Persistence {
                message: "snapshot unreadable".to_owned(),
            });
        }
        Ok(self.snapshot.clone())
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), MythosError> {
        self.snapshot = Some(snapshot.clone());
        self.corrupt_snapshot = false;
        Ok(())
    }
}
