//! The Mythos engine: one logical transaction per invocation.
//!
//! [`MythosEngine`] owns the event log, the entity store, the evolution
//! engine and a [`Persistence`] backend. Every mutating operation follows
//! the same order:
//!
//! 1. Validate the request. Nothing is touched on failure.
//! 2. Build the next event and compute its effect on a copy of the persona.
//! 3. Make the event durable.
//! 4. Record it in the in-memory log and swap in the new persona state.
//! 5. Save the snapshot. A failure here is logged; the log still holds the
//!    event and the next open rebuilds the snapshot from it.
//!
//! # Recovery
//!
//! [`MythosEngine::open`] loads the log (fatal if unreadable or out of
//! order), then the snapshot. A missing, unreadable or outdated snapshot is
//! replaced by replaying the log from the initial roster. A usable snapshot
//! is rolled forward over newer events. A snapshot ahead of the log, or a
//! store that fails the consistency check afterwards, is surfaced as
//! [`MythosError::Consistency`].

use chrono::Utc;
use mythos_ledger::{EventDraft, EventLog, IntegrityResult};
use mythos_types::{
    BaseAttributes, EmergenceSuggestion, ExportDocument, InvocationEvent, PersonaState,
    PersonaSummary,
};
use tracing::{debug, info, warn};

use crate::config::EvolutionConfig;
use crate::emergence;
use crate::error::MythosError;
use crate::evolution::{EvolutionEngine, EvolutionRecord};
use crate::persistence::{MemoryPersistence, Persistence};
use crate::replay::{self, ConsistencyResult};
use crate::report::{self, Report};
use crate::store::EntityStore;

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// One invocation, as submitted by a caller.
///
/// Each field is validated on [`MythosEngine::invoke`] before anything is
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// The persona being invoked.
    pub entity_id: String,
    /// Free-text context. May be empty.
    pub context: String,
    /// Tags. Must not be blank.
    pub tags: Vec<String>,
    /// Emotional weight, checked against the configured bounds.
    pub emotional_weight: i64,
    /// Attributes declaring the persona if it is not yet known.
    pub seed: Option<BaseAttributes>,
}

impl InvocationRequest {
    /// A request for `entity_id` with default weight and no context.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            context: String::new(),
            tags: Vec::new(),
            emotional_weight: mythos_ledger::draft::DEFAULT_WEIGHT,
            seed: None,
        }
    }

    /// Set the context.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set the emotional weight.
    #[must_use]
    pub const fn weight(mut self, weight: i64) -> Self {
        self.emotional_weight = weight;
        self
    }

    /// Declare the persona with `seed` if it is new.
    #[must_use]
    pub fn seed(mut self, seed: BaseAttributes) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl From<InvocationRequest> for EventDraft {
    fn from(request: InvocationRequest) -> Self {
        let draft = Self::invocation(request.entity_id)
            .context(request.context)
            .tags(request.tags)
            .weight(request.emotional_weight);
        match request.seed {
            Some(seed) => draft.seed(seed),
            None => draft,
        }
    }
}

/// What a mutating operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// The persona after the operation.
    pub state: PersonaState,
    /// The recorded event, or `None` when nothing was logged.
    pub sequence: Option<u64>,
    /// Stages reached by the operation, in ascending order.
    pub evolutions: Vec<EvolutionRecord>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the log, the store and the storage backend.
#[derive(Debug)]
pub struct MythosEngine<P: Persistence> {
    config: EvolutionConfig,
    evolution: EvolutionEngine,
    log: EventLog,
    store: EntityStore,
    storage: P,
}

impl MythosEngine<MemoryPersistence> {
    /// An engine over fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Config`] for invalid thresholds.
    pub fn in_memory(config: &EvolutionConfig) -> Result<Self, MythosError> {
        Self::open(config, MemoryPersistence::new())
    }
}

impl<P: Persistence> MythosEngine<P> {
    /// Open `storage`, recovering the store from the snapshot and the log.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the log cannot be read or
    /// fails its integrity check, [`MythosError::Consistency`] if snapshot
    /// and log cannot be reconciled and [`MythosError::Config`] for an
    /// invalid threshold table.
    pub fn open(config: &EvolutionConfig, storage: P) -> Result<Self, MythosError> {
        let evolution = EvolutionEngine::from_config(config)?;
        let log = EventLog::from_events(storage.load_events()?, config.weight_bounds())?;

        let (store, rebuilt) = match storage.load_snapshot() {
            Ok(Some(snapshot)) if snapshot.last_sequence > log.last_sequence() => {
                return Err(MythosError::Consistency {
                    entity_ids: Vec::new(),
                    message: format!(
                        "snapshot covers event {} but the log ends at {}",
                        snapshot.last_sequence,
                        log.last_sequence()
                    ),
                });
            }
            Ok(Some(snapshot)) => {
                let covered = snapshot.last_sequence;
                match EntityStore::from_snapshot(snapshot, config.context_window) {
                    Ok(mut store) => {
                        let newer = log.events_after(covered);
                        replay::roll_forward(&mut store, newer, &evolution)?;
                        debug!(
                            snapshot_sequence = covered,
                            rolled_forward = newer.len(),
                            "Restored store from snapshot"
                        );
                        (store, !newer.is_empty())
                    }
                    Err(e) => {
                        warn!(error = %e, "Snapshot unusable, replaying log");
                        (Self::replay_log(config, &log, &evolution)?, true)
                    }
                }
            }
            Ok(None) => (Self::replay_log(config, &log, &evolution)?, true),
            Err(e) => {
                warn!(error = %e, "Snapshot unreadable, replaying log");
                (Self::replay_log(config, &log, &evolution)?, true)
            }
        };

        replay::check_invariants(&store, log.all_events(), &evolution)
            .into_result("store disagrees with the log")?;

        let mut engine = Self {
            config: config.clone(),
            evolution,
            log,
            store,
            storage,
        };

        if engine.config.verify_on_open {
            engine.verify()?;
        }
        if rebuilt {
            engine.save_snapshot()?;
        }

        info!(
            events = engine.log.len(),
            entities = engine.store.len(),
            "Mythos store opened"
        );
        Ok(engine)
    }

    fn replay_log(
        config: &EvolutionConfig,
        log: &EventLog,
        evolution: &EvolutionEngine,
    ) -> Result<EntityStore, MythosError> {
        let initial = if config.seed_roster {
            EntityStore::seeded(config.context_window)
        } else {
            EntityStore::new(config.context_window)
        };
        replay::replay(log.all_events(), evolution, initial)
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Record an invocation and apply it.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Validation`] for malformed input,
    /// [`MythosError::UnknownEntity`] for an undeclared persona and
    /// [`MythosError::Persistence`] if the event cannot be made durable.
    /// Neither the log nor the store changes on error.
    pub fn invoke(&mut self, request: InvocationRequest) -> Result<InvocationOutcome, MythosError> {
        let draft = EventDraft::from(request);
        draft.validate(self.log.bounds())?;

        if !self.store.contains(draft.entity_id()) && draft.seed_attributes().is_none() {
            return Err(MythosError::UnknownEntity {
                entity_id: draft.entity_id().to_owned(),
            });
        }

        let outcome = self.record(draft)?;
        info!(
            entity_id = outcome.state.entity_id,
            invocation_count = outcome.state.invocation_count,
            evolution_stage = outcome.state.evolution_stage,
            "Logged invocation"
        );
        Ok(outcome)
    }

    /// Advance a persona one stage regardless of its count.
    ///
    /// At the final stage nothing is logged and the current state is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::UnknownEntity`] if the persona does not exist
    /// and [`MythosError::Persistence`] if the event cannot be made durable.
    pub fn force_evolve(&mut self, entity_id: &str) -> Result<InvocationOutcome, MythosError> {
        let entity_id = entity_id.trim();
        let current = self
            .store
            .get(entity_id)
            .ok_or_else(|| MythosError::UnknownEntity {
                entity_id: entity_id.to_owned(),
            })?;

        if current.evolution_stage >= self.evolution.max_stage() {
            info!(
                entity_id,
                stage = current.evolution_stage,
                "Already at final stage"
            );
            return Ok(InvocationOutcome {
                state: current.clone(),
                sequence: None,
                evolutions: Vec::new(),
            });
        }

        let target = current.evolution_stage.saturating_add(1);
        let outcome = self.record(EventDraft::forced_evolution(entity_id, target))?;
        warn!(
            entity_id,
            stage = outcome.state.evolution_stage,
            "Forced evolution"
        );
        Ok(outcome)
    }

    /// Declare a persona outside the seed roster without invoking it.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Validation`] for a blank id or role,
    /// [`MythosError::DuplicateEntity`] if the persona exists and
    /// [`MythosError::Persistence`] if the event cannot be made durable.
    pub fn register(
        &mut self,
        entity_id: &str,
        attributes: BaseAttributes,
    ) -> Result<PersonaState, MythosError> {
        let draft = EventDraft::registration(entity_id, attributes);
        draft.validate(self.log.bounds())?;
        if self.store.contains(draft.entity_id()) {
            return Err(MythosError::DuplicateEntity {
                entity_id: draft.entity_id().to_owned(),
            });
        }

        let outcome = self.record(draft)?;
        info!(entity_id = outcome.state.entity_id, "Registered persona");
        Ok(outcome.state)
    }

    /// Prepare, persist, commit, snapshot.
    fn record(&mut self, draft: EventDraft) -> Result<InvocationOutcome, MythosError> {
        let event = self.log.prepare(draft)?;
        let applied = self.store.prepare_event(&event, &self.evolution)?;

        self.storage.append_event(&event)?;
        let sequence = event.sequence;
        self.log.commit(event)?;
        self.store.commit(applied.state.clone());

        if let Err(e) = self.save_snapshot() {
            warn!(error = %e, sequence, "Snapshot not saved; it will be rebuilt from the log");
        }

        Ok(InvocationOutcome {
            state: applied.state,
            sequence: Some(sequence),
            evolutions: applied.evolutions,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Report on one persona, or on all of them.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::UnknownEntity`] if `entity_id` is unknown.
    pub fn report(&self, entity_id: Option<&str>) -> Result<Report, MythosError> {
        report::build_report(
            &self.store,
            self.log.all_events(),
            self.evolution.thresholds(),
            entity_id.map(str::trim),
        )
    }

    /// Roster listing ordered by entity id.
    pub fn list_entities(&self) -> Vec<(String, PersonaSummary)> {
        self.store.list()
    }

    /// Suggest a persona for an uncovered need.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Validation`] if `need` is blank.
    pub fn emerge(&self, need: &str) -> Result<EmergenceSuggestion, MythosError> {
        let suggestion = emergence::suggest(need, self.store.iter())?;
        info!(
            uncovered = suggestion.uncovered_terms.len(),
            closest = suggestion.closest_match.as_ref().map(|m| m.entity_id.as_str()),
            "Emergence suggested"
        );
        Ok(suggestion)
    }

    /// Evolved presets for every persona.
    pub fn export(&self) -> ExportDocument {
        self.store.export(Utc::now())
    }

    /// Every event naming `entity_id`, in sequence order.
    pub fn events_for(&self, entity_id: &str) -> Vec<&InvocationEvent> {
        self.log.events_for(entity_id.trim())
    }

    /// Current state of one persona.
    pub fn get(&self, entity_id: &str) -> Option<&PersonaState> {
        self.store.get(entity_id.trim())
    }

    /// The live entity store.
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The event log.
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// The storage backend.
    pub const fn storage(&self) -> &P {
        &self.storage
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Replay the log from scratch and compare with the live store.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Consistency`] naming every persona whose live
    /// state differs from the replayed one, or [`MythosError::Persistence`]
    /// if the log fails its integrity check.
    pub fn verify(&self) -> Result<(), MythosError> {
        if let IntegrityResult::Anomaly(anomaly) = self.log.verify_integrity() {
            return Err(MythosError::Persistence {
                message: anomaly.to_string(),
            });
        }
        let replayed = Self::replay_log(&self.config, &self.log, &self.evolution)?;
        let result = replay::compare(&self.store, &replayed);
        if let ConsistencyResult::Divergent(ids) = &result {
            warn!(entities = ids.join(","), "Store diverges from replay");
        }
        result.into_result("live store differs from log replay")
    }

    /// Discard the store, rebuild it from the log and save a new snapshot.
    /// Returns how many events were replayed.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Consistency`] if the log cannot be replayed
    /// and [`MythosError::Persistence`] if the snapshot cannot be written.
    pub fn rebuild(&mut self) -> Result<usize, MythosError> {
        self.store = Self::replay_log(&self.config, &self.log, &self.evolution)?;
        self.save_snapshot()?;
        info!(events = self.log.len(), "Rebuilt store from log");
        Ok(self.log.len())
    }

    /// Write the current store as the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the write fails.
    pub fn save_snapshot(&mut self) -> Result<(), MythosError> {
        let snapshot = self.store.snapshot(self.log.last_sequence());
        self.storage.save_snapshot(&snapshot)
    }

    /// Save the snapshot and hand back the storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the final snapshot cannot be
    /// written.
    pub fn close(mut self) -> Result<P, MythosError> {
        self.save_snapshot()?;
        Ok(self.storage)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn engine() -> MythosEngine<MemoryPersistence> {
        MythosEngine::in_memory(&EvolutionConfig::default()).unwrap()
    }

    #[test]
    fn invoke_persists_then_snapshots() {
        let mut engine = engine();
        let outcome = engine
            .invoke(InvocationRequest::new("Nova").context("structure"))
            .unwrap();

        assert_eq!(outcome.sequence, Some(1));
        assert_eq!(outcome.state.invocation_count, 1);
        assert_eq!(engine.storage().events().len(), 1);
        assert_eq!(
            engine.storage().snapshot().map(|s| s.last_sequence),
            Some(1)
        );
    }

    #[test]
    fn failed_append_changes_nothing() {
        let mut storage = MemoryPersistence::new();
        storage.fail_appends = true;
        let mut engine = MythosEngine::open(&EvolutionConfig::default(), storage).unwrap();
        let before = engine.store().clone();

        assert!(matches!(
            engine.invoke(InvocationRequest::new("Nova")),
            Err(MythosError::Persistence { .. })
        ));
        assert!(engine.log().is_empty());
        assert_eq!(engine.store(), &before);
    }

    #[test]
    fn force_evolve_unknown_entity_fails() {
        let mut engine = engine();
        assert!(matches!(
            engine.force_evolve("Nobody"),
            Err(MythosError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn register_then_invoke() {
        let mut engine = engine();
        let state = engine
            .register("Vesper", BaseAttributes::with_role("Night archivist"))
            .unwrap();
        assert_eq!(state.invocation_count, 0);
        assert!(matches!(
            engine.register("Vesper", BaseAttributes::with_role("Again")),
            Err(MythosError::DuplicateEntity { .. })
        ));

        let outcome = engine.invoke(InvocationRequest::new("Vesper")).unwrap();
        assert_eq!(outcome.state.invocation_count, 1);
        assert_eq!(engine.events_for("Vesper").len(), 2);
    }

    #[test]
    fn register_requires_role() {
        let mut engine = engine();
        assert!(matches!(
            engine.register("Vesper", BaseAttributes::with_role(" ")),
            Err(MythosError::Validation { .. })
        ));
        assert!(engine.log().is_empty());
    }

    #[test]
    fn request_converts_to_draft() {
        let draft = EventDraft::from(
            InvocationRequest::new(" Lent ")
                .context("return")
                .tag("home")
                .weight(6),
        );
        assert_eq!(draft.entity_id(), "Lent");
        assert!(draft.seed_attributes().is_none());
    }
}
