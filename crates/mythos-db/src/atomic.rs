//! All-or-nothing file replacement.
//!
//! The new contents go to a temporary file in the target's directory, are
//! synced, then renamed over the target. A reader sees either the old file
//! or the new one, never a mix.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::DbError;

/// Replace `path` with `contents` atomically.
///
/// # Errors
///
/// Returns [`DbError::Io`] if the temporary file cannot be created, written,
/// synced or renamed. The previous file is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), DbError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| DbError::io(dir, e))?;
    file.write_all(contents)
        .map_err(|e| DbError::io(file.path(), e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| DbError::io(file.path(), e))?;
    file.persist(path).map_err(|e| DbError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "Replaced file");
    Ok(())
}
