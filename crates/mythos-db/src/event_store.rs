//! The event log file: one JSON object per line, append-only.
//!
//! Each append writes a single line and syncs it before returning, so an
//! acknowledged event survives a crash. Bytes after the last newline belong
//! to a write that never completed: load ignores them with a warning and
//! the next append cuts them off before writing. Any other unparseable line
//! is corruption and fails the load.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use mythos_types::InvocationEvent;
use tracing::{debug, warn};

use crate::error::DbError;

/// Append-only JSON Lines event log.
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    /// An event log at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete event in file order. A missing file is an
    /// empty log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file cannot be read and
    /// [`DbError::CorruptLog`] for a line that is not a valid event.
    pub fn load(&self) -> Result<Vec<InvocationEvent>, DbError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::io(&self.path, e)),
        };

        let cut = raw.rfind('\n').map_or(0, |i| i.saturating_add(1));
        let (body, torn) = raw.split_at_checked(cut).unwrap_or((raw.as_str(), ""));
        if !torn.trim().is_empty() {
            warn!(
                path = %self.path.display(),
                bytes = torn.len(),
                "Ignoring unterminated trailing event"
            );
        }

        let mut events = Vec::new();
        for (index, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str::<InvocationEvent>(line).map_err(|e| {
                DbError::CorruptLog {
                    path: self.path.clone(),
                    line: index.saturating_add(1),
                    message: e.to_string(),
                }
            })?;
            events.push(event);
        }

        debug!(path = %self.path.display(), events = events.len(), "Loaded event log");
        Ok(events)
    }

    /// Append `event` as one line and sync it to disk.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the event cannot be encoded and
    /// [`DbError::Io`] if the write or sync fails. A failed write is
    /// truncated away so the file holds only complete events.
    pub fn append(&self, event: &InvocationEvent) -> Result<(), DbError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DbError::io(&self.path, e))?;
        let original_len = self.discard_torn_tail(&mut file)?;

        let written = file
            .write_all(line.as_bytes())
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            if let Err(truncate) = file.set_len(original_len) {
                warn!(
                    path = %self.path.display(),
                    error = %truncate,
                    "Could not roll back partial append"
                );
            }
            return Err(DbError::io(&self.path, e));
        }

        debug!(sequence = event.sequence, entity_id = event.entity_id, "Appended event");
        Ok(())
    }

    /// Cut the file back to its last newline. Returns the resulting length.
    fn discard_torn_tail(&self, file: &mut File) -> Result<u64, DbError> {
        let io = |e| DbError::io(&self.path, e);

        let len = file.metadata().map_err(io)?.len();
        if len == 0 {
            return Ok(0);
        }
        let mut last = [0_u8; 1];
        file.seek(SeekFrom::End(-1)).map_err(io)?;
        file.read_exact(&mut last).map_err(io)?;
        if last == [b'\n'] {
            return Ok(len);
        }

        let mut contents = Vec::new();
        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.read_to_end(&mut contents).map_err(io)?;
        let keep = contents
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i.saturating_add(1));
        let keep = u64::try_from(keep).map_err(|e| io(std::io::Error::other(e)))?;

        file.set_len(keep).map_err(io)?;
        file.sync_all().map_err(io)?;
        warn!(
            path = %self.path.display(),
            discarded = len.saturating_sub(keep),
            "Discarded unterminated trailing event"
        );
        Ok(keep)
    }
}
