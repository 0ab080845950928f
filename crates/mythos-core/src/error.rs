//! Error types for the Mythos engine.

use mythos_ledger::LedgerError;

use crate::config::ConfigError;

/// Errors that can occur while invoking, evolving or persisting personas.
#[derive(Debug, thiserror::Error)]
pub enum MythosError {
    /// Malformed input. Nothing was mutated.
    #[error("validation error: {reason}")]
    Validation {
        /// What was wrong with the input.
        reason: String,
    },

    /// The entity is neither known nor declared with seed attributes.
    #[error("unknown entity: {entity_id}")]
    UnknownEntity {
        /// The id that was looked up.
        entity_id: String,
    },

    /// A registration named an entity that already exists.
    #[error("entity already exists: {entity_id}")]
    DuplicateEntity {
        /// The id that was registered twice.
        entity_id: String,
    },

    /// Stored state could not be read or written.
    #[error("persistence error: {message}")]
    Persistence {
        /// What failed.
        message: String,
    },

    /// Snapshot and log disagree after reconciling them.
    #[error("consistency error: {message} (entities: {})", entity_ids.join(", "))]
    Consistency {
        /// Entities whose stored state differs from the replayed state.
        entity_ids: Vec<String>,
        /// What disagreed.
        message: String,
    },

    /// A phrase template failed to compile or render.
    #[error("template error: {0}")]
    Template(String),

    /// A counter would overflow.
    #[error("counter overflow: {0}")]
    Overflow(String),

    /// Invalid configuration.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },
}

impl MythosError {
    /// Wrap any displayable persistence failure.
    pub fn persistence(err: impl core::fmt::Display) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<LedgerError> for MythosError {
    fn from(err: LedgerError) -> Self {
        if err.is_validation() {
            return Self::Validation {
                reason: err.to_string(),
            };
        }
        match err {
            LedgerError::SequenceOverflow => Self::Overflow(err.to_string()),
            other => Self::Persistence {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_validation_maps_to_validation() {
        let err = MythosError::from(LedgerError::WeightOutOfRange {
            weight: 15,
            min: 0,
            max: 10,
        });
        assert!(matches!(err, MythosError::Validation { .. }));
        assert!(err.to_string().contains("15"));
    }

    #[test]
    fn ledger_integrity_maps_to_persistence() {
        let err = MythosError::from(LedgerError::Integrity(mythos_ledger::IntegrityAnomaly {
            sequence: 3,
            message: "LOG_INTEGRITY: gap".to_owned(),
        }));
        assert!(matches!(err, MythosError::Persistence { .. }));
    }

    #[test]
    fn consistency_lists_entities() {
        let err = MythosError::Consistency {
            entity_ids: vec!["Nova".to_owned(), "ORION".to_owned()],
            message: "replay differs".to_owned(),
        };
        assert!(err.to_string().contains("Nova, ORION"));
    }
}
