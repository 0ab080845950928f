//! Event identifiers.
//!
//! Events carry a UUID v7 identifier so that ids sort in creation order
//! even when two events share a timestamp. Ordering inside the log is still
//! decided by the sequence number; the id exists for external references
//! and duplicate detection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for an event in the invocation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub Uuid);

impl EventId {
    /// A fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_and_not_nil() {
        let first = EventId::generate();
        let second = EventId::generate();
        assert_ne!(first.0, Uuid::nil());
        assert_ne!(first, second);
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = EventId::generate();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
