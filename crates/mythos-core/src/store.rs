//! The entity store: current derived state of every persona.
//!
//! The store is an explicit value owned by whoever drives it. It has no
//! global registry and no I/O; it can be seeded with the canonical roster,
//! restored from a [`Snapshot`] or an [`ExportDocument`], and advanced one
//! event at a time.
//!
//! Applying an event is all-or-nothing: the new persona state is computed
//! on a copy and swapped in only when every step succeeded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mythos_types::{
    BaseAttributes, EventKind, ExportDocument, ExportedPersona, FORMAT_VERSION, InvocationEvent,
    PersonaState, PersonaSummary, Snapshot,
};
use tracing::debug;

use crate::error::MythosError;
use crate::evolution::{EvolutionEngine, EvolutionRecord};
use crate::seed;

/// The result of applying one event to one persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEvent {
    /// The persona after the event.
    pub state: PersonaState,
    /// Stages reached because of the event, in ascending order.
    pub evolutions: Vec<EvolutionRecord>,
}

/// Current state of every persona, keyed by entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStore {
    entities: BTreeMap<String, PersonaState>,
    context_window: usize,
}

impl EntityStore {
    /// Create an empty store whose context windows hold `context_window`
    /// entries.
    pub fn new(context_window: usize) -> Self {
        Self {
            entities: BTreeMap::new(),
            context_window: context_window.max(1),
        }
    }

    /// Create a store holding the canonical roster at stage 0.
    pub fn seeded(context_window: usize) -> Self {
        let mut store = Self::new(context_window);
        for (id, base) in seed::canonical_roster() {
            store
                .entities
                .insert(id.clone(), PersonaState::new(id, base));
        }
        store
    }

    /// Restore a store from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Persistence`] if the snapshot was written in
    /// another format version.
    pub fn from_snapshot(snapshot: Snapshot, context_window: usize) -> Result<Self, MythosError> {
        if snapshot.format_version != FORMAT_VERSION {
            return Err(MythosError::Persistence {
                message: format!(
                    "snapshot format version {} is not {FORMAT_VERSION}",
                    snapshot.format_version
                ),
            });
        }
        Ok(Self {
            entities: snapshot.entities,
            context_window: context_window.max(1),
        })
    }

    /// Restore a store from an export document.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Validation`] for an unsupported format version.
    pub fn from_export(document: ExportDocument, context_window: usize) -> Result<Self, MythosError> {
        let mut store = Self::new(context_window);
        store.import(document)?;
        Ok(store)
    }

    /// Capacity of each persona's context window.
    pub const fn context_window(&self) -> usize {
        self.context_window
    }

    /// Number of personas.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store has no personas.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `entity_id` is known.
    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// Look up a persona.
    pub fn get(&self, entity_id: &str) -> Option<&PersonaState> {
        self.entities.get(entity_id)
    }

    /// Every persona, ordered by entity id.
    pub fn iter(&self) -> impl Iterator<Item = &PersonaState> {
        self.entities.values()
    }

    /// Roster listing ordered by entity id.
    pub fn list(&self) -> Vec<(String, PersonaSummary)> {
        self.entities
            .iter()
            .map(|(id, state)| (id.clone(), state.summary()))
            .collect()
    }

    /// Sum of every persona's invocation count.
    pub fn total_invocations(&self) -> u64 {
        self.entities
            .values()
            .fold(0_u64, |acc, s| acc.saturating_add(s.invocation_count))
    }

    /// Return the persona, creating it from `seed` if it is new.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::UnknownEntity`] if the persona is new and no
    /// seed attributes were given.
    pub fn get_or_create(
        &mut self,
        entity_id: &str,
        seed: Option<&BaseAttributes>,
    ) -> Result<&PersonaState, MythosError> {
        if !self.entities.contains_key(entity_id) {
            let base = seed.cloned().ok_or_else(|| MythosError::UnknownEntity {
                entity_id: entity_id.to_owned(),
            })?;
            debug!(entity_id, role = base.role, "Declared persona");
            self.entities
                .insert(entity_id.to_owned(), PersonaState::new(entity_id, base));
        }
        self.entities
            .get(entity_id)
            .ok_or_else(|| MythosError::UnknownEntity {
                entity_id: entity_id.to_owned(),
            })
    }

    /// Compute the effect of `event` without changing the store.
    ///
    /// An invocation increments the count, pushes its context into the
    /// window (dropping the oldest entry when full) and evolves the persona
    /// to whatever stage the count has earned. A forced evolution advances
    /// the persona one stage, unless it is already at the final stage. A
    /// registration declares the persona.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::UnknownEntity`] for an undeclared persona,
    /// [`MythosError::DuplicateEntity`] for a registration of a known one,
    /// [`MythosError::Overflow`] if the count cannot grow and
    /// [`MythosError::Template`] if phrase rendering fails.
    pub fn prepare_event(
        &self,
        event: &InvocationEvent,
        engine: &EvolutionEngine,
    ) -> Result<AppliedEvent, MythosError> {
        let existing = self.entities.get(&event.entity_id);
        let mut state = match (existing, &event.seed, event.kind) {
            (Some(_), Some(_), EventKind::Registration) => {
                return Err(MythosError::DuplicateEntity {
                    entity_id: event.entity_id.clone(),
                });
            }
            (Some(state), _, _) => state.clone(),
            (None, Some(seed), EventKind::Invocation | EventKind::Registration) => {
                PersonaState::new(event.entity_id.clone(), seed.clone())
            }
            (None, _, _) => {
                return Err(MythosError::UnknownEntity {
                    entity_id: event.entity_id.clone(),
                });
            }
        };

        let evolutions = match event.kind {
            EventKind::Invocation => {
                state.invocation_count = state.invocation_count.checked_add(1).ok_or_else(|| {
                    MythosError::Overflow(format!("invocation count of {}", event.entity_id))
                })?;
                self.push_context(&mut state, &event.context);
                engine.check(&mut state)?
            }
            EventKind::ForcedEvolution => {
                let target = state.evolution_stage.saturating_add(1);
                if target > engine.max_stage() {
                    Vec::new()
                } else {
                    state.forced_stage = state.forced_stage.max(target);
                    engine.evolve_to(&mut state, target)?
                }
            }
            EventKind::Registration => Vec::new(),
        };

        state.last_sequence = event.sequence;
        Ok(AppliedEvent { state, evolutions })
    }

    /// Store a persona state produced by [`EntityStore::prepare_event`].
    pub fn commit(&mut self, state: PersonaState) {
        self.entities.insert(state.entity_id.clone(), state);
    }

    /// Apply `event` to the persona it names.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`EntityStore::prepare_event`]. The store
    /// is unchanged on error.
    pub fn apply_event(
        &mut self,
        event: &InvocationEvent,
        engine: &EvolutionEngine,
    ) -> Result<Vec<EvolutionRecord>, MythosError> {
        let applied = self.prepare_event(event, engine)?;
        self.commit(applied.state);
        Ok(applied.evolutions)
    }

    /// Snapshot of every persona as of `last_sequence`.
    pub fn snapshot(&self, last_sequence: u64) -> Snapshot {
        Snapshot {
            format_version: FORMAT_VERSION,
            last_sequence,
            entities: self.entities.clone(),
        }
    }

    /// Export every persona as an evolved preset.
    pub fn export(&self, generated_at: DateTime<Utc>) -> ExportDocument {
        ExportDocument {
            format_version: FORMAT_VERSION,
            generated_at,
            entities: self
                .entities
                .iter()
                .map(|(id, state)| (id.clone(), ExportedPersona::from(state)))
                .collect(),
        }
    }

    /// Replace or add every persona in `document`. Returns how many were
    /// imported.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Validation`] for an unsupported format version
    /// or a blank entity id. Nothing is imported on error.
    pub fn import(&mut self, document: ExportDocument) -> Result<usize, MythosError> {
        if document.format_version != FORMAT_VERSION {
            return Err(MythosError::Validation {
                reason: format!(
                    "export format version {} is not {FORMAT_VERSION}",
                    document.format_version
                ),
            });
        }
        if document.entities.keys().any(|id| id.trim().is_empty()) {
            return Err(MythosError::Validation {
                reason: "export contains a persona with a blank id".to_owned(),
            });
        }

        let count = document.entities.len();
        for (id, preset) in document.entities {
            let state = preset.into_state(id.clone());
            self.entities.insert(id, state);
        }
        debug!(count, "Imported personas");
        Ok(count)
    }

    fn push_context(&self, state: &mut PersonaState, context: &str) {
        let context = context.trim();
        if context.is_empty() {
            return;
        }
        state.accumulated_context.push(context.to_owned());
        let excess = state
            .accumulated_context
            .len()
            .saturating_sub(self.context_window);
        if excess > 0 {
            state.accumulated_context.drain(..excess);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mythos_ledger::{EventDraft, EventLog};

    use super::*;
    use crate::threshold::Thresholds;

    fn engine() -> EvolutionEngine {
        EvolutionEngine::new(Thresholds::default(), 10).unwrap()
    }

    fn event(log: &mut EventLog, draft: EventDraft) -> InvocationEvent {
        log.append(draft).unwrap().clone()
    }

    #[test]
    fn seeded_store_has_roster_at_stage_zero() {
        let store = EntityStore::seeded(20);
        assert_eq!(store.len(), 5);
        let orion = store.get("ORION").unwrap();
        assert_eq!(orion.invocation_count, 0);
        assert_eq!(orion.evolution_stage, 0);
    }

    #[test]
    fn get_or_create_requires_seed_for_unknown() {
        let mut store = EntityStore::new(20);
        assert!(matches!(
            store.get_or_create("Vesper", None),
            Err(MythosError::UnknownEntity { .. })
        ));
        assert!(store.is_empty());

        let seed = BaseAttributes::with_role("Night archivist");
        assert_eq!(
            store.get_or_create("Vesper", Some(&seed)).unwrap().base.role,
            "Night archivist"
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invocation_increments_count_and_records_context() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);

        for i in 0..3 {
            let e = event(&mut log, EventDraft::invocation("Nova").context(format!("ctx {i}")));
            store.apply_event(&e, &engine).unwrap();
        }

        let nova = store.get("Nova").unwrap();
        assert_eq!(nova.invocation_count, 3);
        assert_eq!(nova.accumulated_context, vec!["ctx 0", "ctx 1", "ctx 2"]);
        assert_eq!(nova.last_sequence, 3);
    }

    #[test]
    fn context_window_drops_oldest() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(3);

        for i in 0..5 {
            let e = event(&mut log, EventDraft::invocation("Lent").context(format!("visit {i}")));
            store.apply_event(&e, &engine).unwrap();
        }

        assert_eq!(
            store.get("Lent").unwrap().accumulated_context,
            vec!["visit 2", "visit 3", "visit 4"]
        );
    }

    #[test]
    fn blank_context_is_not_recorded() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);
        let e = event(&mut log, EventDraft::invocation("Lent").context("   "));
        store.apply_event(&e, &engine).unwrap();

        let lent = store.get("Lent").unwrap();
        assert_eq!(lent.invocation_count, 1);
        assert!(lent.accumulated_context.is_empty());
    }

    #[test]
    fn unknown_entity_leaves_store_unchanged() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);
        let before = store.clone();

        let e = event(&mut log, EventDraft::invocation("Nobody"));
        assert!(matches!(
            store.apply_event(&e, &engine),
            Err(MythosError::UnknownEntity { .. })
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn seeded_invocation_declares_entity() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::new(20);

        let e = event(
            &mut log,
            EventDraft::invocation("Vesper").seed(BaseAttributes::with_role("Night archivist")),
        );
        store.apply_event(&e, &engine).unwrap();
        assert_eq!(store.get("Vesper").unwrap().invocation_count, 1);
    }

    #[test]
    fn registration_declares_without_counting() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::new(20);
        let seed = BaseAttributes::with_role("Night archivist");

        let e = event(&mut log, EventDraft::registration("Vesper", seed.clone()));
        store.apply_event(&e, &engine).unwrap();
        assert_eq!(store.get("Vesper").unwrap().invocation_count, 0);

        let again = event(&mut log, EventDraft::registration("Vesper", seed));
        assert!(matches!(
            store.apply_event(&again, &engine),
            Err(MythosError::DuplicateEntity { .. })
        ));
    }

    #[test]
    fn forced_evolution_advances_one_stage_without_counting() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);

        let e = event(&mut log, EventDraft::forced_evolution("Redid", 1));
        let records = store.apply_event(&e, &engine).unwrap();

        let redid = store.get("Redid").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(redid.evolution_stage, 1);
        assert_eq!(redid.forced_stage, 1);
        assert_eq!(redid.invocation_count, 0);
        assert_eq!(redid.developed_traits.len(), 1);
    }

    #[test]
    fn forced_evolution_at_final_stage_changes_nothing_but_sequence() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);
        for stage in 1..=6 {
            let e = event(&mut log, EventDraft::forced_evolution("Nova", stage));
            store.apply_event(&e, &engine).unwrap();
        }
        let nova = store.get("Nova").unwrap();
        assert_eq!(nova.evolution_stage, 5);
        assert_eq!(nova.developed_traits.len(), 5);
        assert_eq!(nova.last_sequence, 6);
    }

    #[test]
    fn threshold_crossing_unlocks_trait_once() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);

        for _ in 0..12 {
            let e = event(&mut log, EventDraft::invocation("ORION").weight(8));
            store.apply_event(&e, &engine).unwrap();
        }

        let orion = store.get("ORION").unwrap();
        assert_eq!(orion.evolution_stage, 1);
        assert_eq!(orion.developed_traits.len(), 1);
        assert_eq!(orion.learned_phrases.len(), 1);
    }

    #[test]
    fn export_import_reproduces_state() {
        let engine = engine();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);
        for i in 0..26 {
            let e = event(&mut log, EventDraft::invocation("Redid").context(format!("verse {i}")));
            store.apply_event(&e, &engine).unwrap();
        }

        let document = store.export(Utc::now());
        let restored = EntityStore::from_export(document, 20).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn import_rejects_other_format_versions() {
        let mut document = EntityStore::seeded(20).export(Utc::now());
        document.format_version = 99;
        let mut store = EntityStore::new(20);
        assert!(matches!(
            store.import(document),
            Err(MythosError::Validation { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_round_trips() {
        let store = EntityStore::seeded(20);
        let snapshot = store.snapshot(0);
        assert_eq!(EntityStore::from_snapshot(snapshot, 20).unwrap(), store);
    }

    #[test]
    fn list_is_ordered_by_id() {
        let ids: Vec<String> = EntityStore::seeded(20)
            .list()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["Lent", "Nova", "ORION", "Redid", "The Fuckface"]);
    }
}
