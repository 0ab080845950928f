//! Append-only invocation log for the Mythos persona ledger.
//!
//! Every invocation of a persona is individually recorded here. The log is
//! the source of truth: persona state is a fold over it and can always be
//! rebuilt from it. Events are never reordered, coalesced, edited or
//! deleted.
//!
//! # Architecture
//!
//! The ledger crate provides three modules:
//!
//! - [`log`] -- The [`EventLog`] struct: append-only sequence with
//!   sequence-number and timestamp assignment.
//! - [`draft`] -- The [`EventDraft`] builder for validated event construction.
//! - [`integrity`] -- Integrity verification of persisted event sequences.
//!
//! # Ordering
//!
//! Sequence numbers start at 1 and increase by exactly 1 per event.
//! Timestamps never decrease; when the wall clock steps backwards the
//! previous event's timestamp is reused and the sequence number breaks
//! the tie.
//!
//! # Usage
//!
//! ```
//! use mythos_ledger::{EventDraft, EventLog};
//!
//! let mut log = EventLog::new();
//! let event = log
//!     .append(EventDraft::invocation("ORION").context("Reviewing premises").weight(8))
//!     .ok();
//!
//! assert_eq!(event.map(|e| e.sequence), Some(1));
//! assert_eq!(log.events_for("ORION").len(), 1);
//! ```

pub mod draft;
pub mod integrity;
pub mod log;

// Re-export primary types at crate root.
pub use draft::EventDraft;
pub use integrity::IntegrityResult;
pub use log::EventLog;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Weight bounds
// ---------------------------------------------------------------------------

/// Inclusive range accepted for `emotional_weight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Smallest accepted weight.
    pub min: u8,
    /// Largest accepted weight.
    pub max: u8,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::SCALE
    }
}

impl WeightBounds {
    /// The whole weight scale. Configured bounds narrow it for new
    /// invocations; every recorded event lies inside it.
    pub const SCALE: Self = Self { min: 0, max: 10 };

    /// Whether `weight` lies inside the bounds.
    pub fn contains(self, weight: i64) -> bool {
        weight >= i64::from(self.min) && weight <= i64::from(self.max)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when appending to or loading the log.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The entity id was empty or whitespace.
    #[error("entity id must not be empty")]
    EmptyEntityId,

    /// The emotional weight was outside the configured bounds.
    #[error("emotional weight {weight} outside {min}..={max}")]
    WeightOutOfRange {
        /// The rejected weight.
        weight: i64,
        /// Smallest accepted weight.
        min: u8,
        /// Largest accepted weight.
        max: u8,
    },

    /// A tag was empty or whitespace.
    #[error("tags must not be empty")]
    EmptyTag,

    /// Seed attributes were supplied without a role.
    #[error("seed attributes for {entity_id} must include a role")]
    InvalidSeed {
        /// The entity being declared.
        entity_id: String,
    },

    /// The sequence counter cannot advance further.
    #[error("sequence counter overflow")]
    SequenceOverflow,

    /// A persisted event sequence failed verification.
    #[error("{0}")]
    Integrity(IntegrityAnomaly),
}

impl LedgerError {
    /// Whether the error describes malformed caller input rather than a
    /// broken log.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyEntityId
                | Self::WeightOutOfRange { .. }
                | Self::EmptyTag
                | Self::InvalidSeed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A violation found while verifying a persisted event sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityAnomaly {
    /// Sequence number of the first offending event.
    pub sequence: u64,
    /// Human-readable description of the violation.
    pub message: String,
}

impl core::fmt::Display for IntegrityAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_zero_to_ten() {
        let bounds = WeightBounds::default();
        assert!(bounds.contains(0));
        assert!(bounds.contains(10));
        assert!(!bounds.contains(11));
        assert!(!bounds.contains(-1));
    }

    #[test]
    fn validation_errors_are_classified() {
        assert!(LedgerError::EmptyEntityId.is_validation());
        assert!(!LedgerError::SequenceOverflow.is_validation());
    }
}
