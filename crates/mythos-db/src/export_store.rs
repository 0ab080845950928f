//! The export document as YAML, for tools outside the ledger.

use std::io::ErrorKind;
use std::path::Path;

use mythos_types::ExportDocument;
use tracing::info;

use crate::atomic::write_atomic;
use crate::error::DbError;

/// Write `document` to `path` as YAML, replacing any previous export.
///
/// # Errors
///
/// Returns [`DbError::Yaml`] if the document cannot be encoded and
/// [`DbError::Io`] if the write fails.
pub fn write_export(path: &Path, document: &ExportDocument) -> Result<(), DbError> {
    let yaml = serde_yml::to_string(document)?;
    write_atomic(path, yaml.as_bytes())?;
    info!(
        path = %path.display(),
        entities = document.entities.len(),
        "Wrote export"
    );
    Ok(())
}

/// Read an export document from `path`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the file does not exist,
/// [`DbError::Io`] if it cannot be read and [`DbError::Yaml`] if it is not
/// a valid export document.
pub fn read_export(path: &Path) -> Result<ExportDocument, DbError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(DbError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(DbError::io(path, e)),
    };
    Ok(serde_yml::from_str(&raw)?)
}
