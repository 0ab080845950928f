//! The invocation log: an append-only sequence of persona events.
//!
//! The [`EventLog`] struct is the in-memory representation of the log.
//! It assigns sequence numbers and timestamps, validates drafts before
//! accepting them, and answers per-persona queries.
//!
//! # Design
//!
//! - **Append-only**: events are never modified or deleted.
//! - **Ordered**: sequence numbers increase by exactly 1 per event.
//! - **Monotonic time**: a timestamp is never earlier than its predecessor.
//! - **Two-phase append**: [`EventLog::prepare`] builds the next event
//!   without recording it, so a caller can make it durable first and then
//!   [`EventLog::commit`] it.

use chrono::{DateTime, Utc};
use mythos_types::InvocationEvent;
use tracing::debug;

use crate::draft::EventDraft;
use crate::integrity::{verify_integrity, IntegrityResult};
use crate::{IntegrityAnomaly, LedgerError, WeightBounds};

/// Append-only log of every persona event.
#[derive(Debug, Default)]
pub struct EventLog {
    /// All events, in sequence order.
    events: Vec<InvocationEvent>,
    /// Accepted weight range for new events.
    bounds: WeightBounds,
}

impl EventLog {
    /// Create a new empty log with the default weight bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted events. `bounds` gates new invocations
    /// only; recorded weights are checked against the whole scale.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Integrity`] if the events are out of order,
    /// carry off-scale weights or have blank entity ids.
    pub fn from_events(
        events: Vec<InvocationEvent>,
        bounds: WeightBounds,
    ) -> Result<Self, LedgerError> {
        if let IntegrityResult::Anomaly(anomaly) = verify_integrity(&events) {
            return Err(LedgerError::Integrity(anomaly));
        }
        debug!(events = events.len(), "Loaded invocation log");
        Ok(Self { events, bounds })
    }

    /// Return the number of events in the log.
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Return whether the log has no events.
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Accepted weight range.
    pub const fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    /// Sequence number of the last event, or 0 for an empty log.
    pub fn last_sequence(&self) -> u64 {
        self.events.last().map_or(0, |e| e.sequence)
    }

    /// Validate a draft and build the event that would be appended next,
    /// without recording it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the draft fails validation or the
    /// sequence counter would overflow.
    pub fn prepare(&self, draft: EventDraft) -> Result<InvocationEvent, LedgerError> {
        let sequence = self
            .last_sequence()
            .checked_add(1)
            .ok_or(LedgerError::SequenceOverflow)?;
        draft.build(sequence, self.next_timestamp(Utc::now()), self.bounds)
    }

    /// Record an event produced by [`EventLog::prepare`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Integrity`] if the event is not the direct
    /// successor of the current last event.
    pub fn commit(&mut self, event: InvocationEvent) -> Result<&InvocationEvent, LedgerError> {
        let expected = self
            .last_sequence()
            .checked_add(1)
            .ok_or(LedgerError::SequenceOverflow)?;
        if event.sequence != expected {
            return Err(LedgerError::Integrity(IntegrityAnomaly {
                sequence: event.sequence,
                message: format!(
                    "event {} committed out of order: expected sequence {expected}",
                    event.sequence
                ),
            }));
        }

        debug!(
            sequence = event.sequence,
            entity_id = event.entity_id,
            kind = ?event.kind,
            "Appended event"
        );
        self.events.push(event);

        self.events
            .last()
            .ok_or(LedgerError::Integrity(IntegrityAnomaly {
                sequence: expected,
                message: "failed to retrieve event after append".to_owned(),
            }))
    }

    /// Validate a draft, assign its sequence number and timestamp, and
    /// append it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the draft fails validation. The log is
    /// unchanged on error.
    pub fn append(&mut self, draft: EventDraft) -> Result<&InvocationEvent, LedgerError> {
        let event = self.prepare(draft)?;
        self.commit(event)
    }

    /// Return every event attributed to `entity_id`, in sequence order.
    pub fn events_for(&self, entity_id: &str) -> Vec<&InvocationEvent> {
        self.events
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .collect()
    }

    /// Return all events with a sequence number greater than `sequence`.
    pub fn events_after(&self, sequence: u64) -> &[InvocationEvent] {
        let start = self.events.partition_point(|e| e.sequence <= sequence);
        self.events.get(start..).unwrap_or_default()
    }

    /// Return all events, in sequence order.
    pub fn all_events(&self) -> &[InvocationEvent] {
        &self.events
    }

    /// Verify the log's ordering and field invariants.
    pub fn verify_integrity(&self) -> IntegrityResult {
        verify_integrity(&self.events)
    }

    /// Timestamp for the next event: `now`, unless that is earlier than the
    /// last event's timestamp.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.events.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }
}
