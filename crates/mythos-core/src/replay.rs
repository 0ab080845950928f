//! Replay and consistency checks.
//!
//! Persona state is a fold over the log:
//!
//! ```text
//! store == fold(apply_event, initial_roster, events)
//! ```
//!
//! [`replay`] computes the right-hand side from scratch, [`roll_forward`]
//! continues a fold from a snapshot, and [`compare`] and
//! [`check_invariants`] report where a live store and its log disagree.
//! Divergence is reported, never patched.

use std::collections::BTreeMap;

use mythos_types::{EventKind, InvocationEvent};
use tracing::debug;

use crate::error::MythosError;
use crate::evolution::EvolutionEngine;
use crate::store::EntityStore;

/// The result of comparing a store against its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyResult {
    /// Store and log agree.
    Consistent,
    /// These entities differ, ordered by id.
    Divergent(Vec<String>),
}

impl ConsistencyResult {
    /// Turn a divergence into [`MythosError::Consistency`].
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Consistency`] naming the diverging entities.
    pub fn into_result(self, message: &str) -> Result<(), MythosError> {
        match self {
            Self::Consistent => Ok(()),
            Self::Divergent(entity_ids) => Err(MythosError::Consistency {
                entity_ids,
                message: message.to_owned(),
            }),
        }
    }
}

/// Fold every event in `events` into `initial`.
///
/// # Errors
///
/// Returns [`MythosError::Consistency`] if an event cannot be applied
/// (for example it names a persona the log never declared).
pub fn replay(
    events: &[InvocationEvent],
    engine: &EvolutionEngine,
    initial: EntityStore,
) -> Result<EntityStore, MythosError> {
    let mut store = initial;
    let applied = roll_forward(&mut store, events, engine)?;
    debug!(events = applied, entities = store.len(), "Replayed log");
    Ok(store)
}

/// Apply `events` to `store` in order. Returns how many were applied.
///
/// # Errors
///
/// Returns [`MythosError::Consistency`] naming the entity of the first
/// event that cannot be applied. Events before it stay applied.
pub fn roll_forward(
    store: &mut EntityStore,
    events: &[InvocationEvent],
    engine: &EvolutionEngine,
) -> Result<usize, MythosError> {
    for event in events {
        store.apply_event(event, engine).map_err(|e| match e {
            MythosError::UnknownEntity { .. } | MythosError::DuplicateEntity { .. } => {
                MythosError::Consistency {
                    entity_ids: vec![event.entity_id.clone()],
                    message: format!("event {} cannot be replayed: {e}", event.sequence),
                }
            }
            other => other,
        })?;
    }
    Ok(events.len())
}

/// Entities whose state differs between `live` and `replayed`.
pub fn compare(live: &EntityStore, replayed: &EntityStore) -> ConsistencyResult {
    let mut divergent: Vec<String> = Vec::new();

    for state in live.iter() {
        if replayed.get(&state.entity_id) != Some(state) {
            divergent.push(state.entity_id.clone());
        }
    }
    for state in replayed.iter() {
        if !live.contains(&state.entity_id) {
            divergent.push(state.entity_id.clone());
        }
    }

    if divergent.is_empty() {
        ConsistencyResult::Consistent
    } else {
        divergent.sort();
        divergent.dedup();
        ConsistencyResult::Divergent(divergent)
    }
}

/// Cheap structural check of `store` against `events`, without replaying.
///
/// For every persona: its invocation count equals the number of
/// invocation events naming it, its stage equals
/// `max(stage_for(count), forced_stage)`, and it has not folded in an
/// event newer than the log. Every persona the log names must exist.
pub fn check_invariants(
    store: &EntityStore,
    events: &[InvocationEvent],
    engine: &EvolutionEngine,
) -> ConsistencyResult {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for event in events {
        let count = counts.entry(event.entity_id.as_str()).or_insert(0);
        if event.kind == EventKind::Invocation {
            *count = count.saturating_add(1);
        }
    }
    let last_sequence = events.last().map_or(0, |e| e.sequence);
    let thresholds = engine.thresholds();

    let mut divergent: Vec<String> = Vec::new();
    for state in store.iter() {
        let logged = counts.get(state.entity_id.as_str()).copied().unwrap_or(0);
        let expected_stage = thresholds
            .stage_for(state.invocation_count)
            .max(state.forced_stage);
        if state.invocation_count != logged
            || state.evolution_stage != expected_stage
            || state.last_sequence > last_sequence
        {
            divergent.push(state.entity_id.clone());
        }
    }
    for id in counts.keys() {
        if !store.contains(id) {
            divergent.push((*id).to_owned());
        }
    }

    if divergent.is_empty() {
        ConsistencyResult::Consistent
    } else {
        divergent.sort();
        divergent.dedup();
        ConsistencyResult::Divergent(divergent)
    }
}
