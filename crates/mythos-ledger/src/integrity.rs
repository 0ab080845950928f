//! Integrity verification for persisted invocation logs.
//!
//! A log loaded from disk must look exactly like one the [`EventLog`]
//! could have produced:
//!
//! ```text
//! events[0].sequence == 1
//! events[i].sequence == events[i - 1].sequence + 1
//! events[i].timestamp >= events[i - 1].timestamp
//! ```
//!
//! plus every event's entity id is non-blank, its weight lies on
//! [`WeightBounds::SCALE`] and no event id repeats. Configured bounds only
//! gate new invocations, so narrowing them never invalidates a recorded
//! log. A violation produces an
//! [`IntegrityAnomaly`]; verification never panics.
//!
//! [`EventLog`]: crate::EventLog

use std::collections::BTreeSet;

use mythos_types::InvocationEvent;

use crate::{IntegrityAnomaly, WeightBounds};

/// The result of an integrity check over an event sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityResult {
    /// Every invariant holds.
    Intact,
    /// The first violation found.
    Anomaly(IntegrityAnomaly),
}

/// Verify ordering and field invariants over `events`.
pub fn verify_integrity(events: &[InvocationEvent]) -> IntegrityResult {
    let scale = WeightBounds::SCALE;
    let mut previous: Option<&InvocationEvent> = None;
    let mut seen_ids = BTreeSet::new();

    for event in events {
        let expected = previous.map_or(Some(1), |p| p.sequence.checked_add(1));
        if expected != Some(event.sequence) {
            return anomaly(
                event.sequence,
                format!(
                    "LOG_INTEGRITY: sequence {} follows {}",
                    event.sequence,
                    previous.map_or(0, |p| p.sequence)
                ),
            );
        }

        if let Some(prev) = previous {
            if event.timestamp < prev.timestamp {
                return anomaly(
                    event.sequence,
                    format!(
                        "LOG_INTEGRITY: event {} is timestamped before event {}",
                        event.sequence, prev.sequence
                    ),
                );
            }
        }

        if event.entity_id.trim().is_empty() {
            return anomaly(
                event.sequence,
                format!("LOG_INTEGRITY: event {} has no entity id", event.sequence),
            );
        }

        if !scale.contains(i64::from(event.emotional_weight)) {
            return anomaly(
                event.sequence,
                format!(
                    "LOG_INTEGRITY: event {} has weight {} outside {}..={}",
                    event.sequence, event.emotional_weight, scale.min, scale.max
                ),
            );
        }

        if !seen_ids.insert(event.id) {
            return anomaly(
                event.sequence,
                format!("LOG_INTEGRITY: event id {} appears twice", event.id),
            );
        }

        previous = Some(event);
    }

    IntegrityResult::Intact
}

fn anomaly(sequence: u64, message: String) -> IntegrityResult {
    IntegrityResult::Anomaly(IntegrityAnomaly { sequence, message })
}
