//! Core structs for the Mythos persona ledger.
//!
//! Covers the immutable [`InvocationEvent`], the derived [`PersonaState`],
//! the persisted [`Snapshot`], the external [`ExportDocument`] and the
//! transient [`EmergenceSuggestion`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Archetype, EventKind};
use crate::ids::EventId;

/// Current on-disk format version for [`Snapshot`] and [`ExportDocument`].
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Base attributes
// ---------------------------------------------------------------------------

/// Immutable attributes fixed when a persona is created.
///
/// Seed roster personas carry these from initialization; personas declared
/// on first reference carry them on the declaring invocation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BaseAttributes {
    /// What the persona is for.
    pub role: String,
    /// How the persona sounds.
    pub voice: String,
    /// Comma-separated domains the persona covers.
    pub essence: String,
    /// Generation family used to pick phrase templates and trait unlocks.
    #[serde(default)]
    pub archetype: Archetype,
    /// Behavioral constraints carried into the export document.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Phrases the persona starts with.
    #[serde(default)]
    pub sample_phrases: Vec<String>,
}

impl BaseAttributes {
    /// Minimal attributes for a persona declared with only a role.
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            voice: String::new(),
            essence: String::new(),
            archetype: Archetype::Wanderer,
            constraints: Vec::new(),
            sample_phrases: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation event
// ---------------------------------------------------------------------------

/// A single immutable record in the invocation log.
///
/// Created only by the log on append. Never edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InvocationEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// Strictly increasing position in the log, starting at 1.
    pub sequence: u64,
    /// The persona this event is attributed to.
    pub entity_id: String,
    /// What kind of record this is.
    #[serde(default)]
    pub kind: EventKind,
    /// Free-text context of the invocation. May be empty.
    #[serde(default)]
    pub context: String,
    /// Tags attached to the invocation.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Emotional weight of the invocation.
    pub emotional_weight: u8,
    /// Ingestion time. Never earlier than the previous event's timestamp.
    pub timestamp: DateTime<Utc>,
    /// Attributes declaring the persona, present on the event that first
    /// referenced a persona outside the seed roster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<BaseAttributes>,
}

impl InvocationEvent {
    /// Whether this event increments the invocation count.
    pub const fn is_invocation(&self) -> bool {
        matches!(self.kind, EventKind::Invocation)
    }
}

// ---------------------------------------------------------------------------
// Persona state
// ---------------------------------------------------------------------------

/// Derived state of a persona: a fold over its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonaState {
    /// Unique persona name.
    pub entity_id: String,
    /// Attributes fixed at creation.
    pub base: BaseAttributes,
    /// Number of `Invocation` events folded into this state.
    pub invocation_count: u64,
    /// Current evolution stage. Never decreases.
    pub evolution_stage: u32,
    /// Highest stage reached through a forced evolution, 0 if none.
    #[serde(default)]
    pub forced_stage: u32,
    /// Sliding window of the most recent invocation contexts, oldest first.
    pub accumulated_context: Vec<String>,
    /// Traits in order of discovery. No duplicates.
    pub developed_traits: Vec<String>,
    /// Phrases learned through evolution, in order.
    pub learned_phrases: Vec<String>,
    /// Sequence number of the last event folded into this state.
    #[serde(default)]
    pub last_sequence: u64,
}

impl PersonaState {
    /// Create a persona at stage 0 with no history.
    pub fn new(entity_id: impl Into<String>, base: BaseAttributes) -> Self {
        Self {
            entity_id: entity_id.into(),
            base,
            invocation_count: 0,
            evolution_stage: 0,
            forced_stage: 0,
            accumulated_context: Vec::new(),
            developed_traits: Vec::new(),
            learned_phrases: Vec::new(),
            last_sequence: 0,
        }
    }

    /// Short roster entry for listings.
    pub fn summary(&self) -> PersonaSummary {
        PersonaSummary {
            role: self.base.role.clone(),
            archetype: self.base.archetype,
            invocation_count: self.invocation_count,
            evolution_stage: self.evolution_stage,
            trait_count: self.developed_traits.len(),
            phrase_count: self.learned_phrases.len(),
        }
    }
}

/// One row of the roster listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonaSummary {
    /// The persona's role.
    pub role: String,
    /// The persona's archetype.
    pub archetype: Archetype,
    /// Invocations so far.
    pub invocation_count: u64,
    /// Current stage.
    pub evolution_stage: u32,
    /// Number of developed traits.
    pub trait_count: usize,
    /// Number of learned phrases.
    pub phrase_count: usize,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Persisted derived state of every persona.
///
/// Contains no wall-clock data, so a snapshot rebuilt by replaying the log
/// serializes to the same bytes as the one written at log time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Format version, see [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Sequence number of the last event folded into this snapshot.
    pub last_sequence: u64,
    /// Persona states keyed by entity id.
    pub entities: BTreeMap<String, PersonaState>,
}

// ---------------------------------------------------------------------------
// Export document
// ---------------------------------------------------------------------------

/// Evolved presets for external consumers.
///
/// Importing this document reproduces every exported [`PersonaState`]
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExportDocument {
    /// Format version, see [`FORMAT_VERSION`].
    pub format_version: u32,
    /// When the document was produced.
    pub generated_at: DateTime<Utc>,
    /// Evolved presets keyed by entity id.
    pub entities: BTreeMap<String, ExportedPersona>,
}

/// One evolved preset in an [`ExportDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExportedPersona {
    /// The persona's role.
    pub role: String,
    /// The persona's voice.
    pub voice: String,
    /// The persona's essence.
    pub essence: String,
    /// The persona's archetype.
    pub archetype: Archetype,
    /// Current evolution stage.
    pub evolution_stage: u32,
    /// Invocations so far.
    pub invocation_count: u64,
    /// Highest forced stage, 0 if none.
    #[serde(default)]
    pub forced_stage: u32,
    /// Behavioral constraints.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Phrases the persona started with.
    #[serde(default)]
    pub sample_phrases: Vec<String>,
    /// Phrases learned through evolution.
    #[serde(default)]
    pub learned_phrases: Vec<String>,
    /// Developed traits in discovery order.
    #[serde(default)]
    pub developed_traits: Vec<String>,
    /// Recent context window, oldest first.
    #[serde(default)]
    pub accumulated_context: Vec<String>,
    /// Sequence number of the last event folded into the persona.
    #[serde(default)]
    pub last_sequence: u64,
}

impl From<&PersonaState> for ExportedPersona {
    fn from(state: &PersonaState) -> Self {
        Self {
            role: state.base.role.clone(),
            voice: state.base.voice.clone(),
            essence: state.base.essence.clone(),
            archetype: state.base.archetype,
            evolution_stage: state.evolution_stage,
            invocation_count: state.invocation_count,
            forced_stage: state.forced_stage,
            constraints: state.base.constraints.clone(),
            sample_phrases: state.base.sample_phrases.clone(),
            learned_phrases: state.learned_phrases.clone(),
            developed_traits: state.developed_traits.clone(),
            accumulated_context: state.accumulated_context.clone(),
            last_sequence: state.last_sequence,
        }
    }
}

impl ExportedPersona {
    /// Rebuild the persona state this preset was exported from.
    pub fn into_state(self, entity_id: impl Into<String>) -> PersonaState {
        PersonaState {
            entity_id: entity_id.into(),
            base: BaseAttributes {
                role: self.role,
                voice: self.voice,
                essence: self.essence,
                archetype: self.archetype,
                constraints: self.constraints,
                sample_phrases: self.sample_phrases,
            },
            invocation_count: self.invocation_count,
            evolution_stage: self.evolution_stage,
            forced_stage: self.forced_stage,
            accumulated_context: self.accumulated_context,
            developed_traits: self.developed_traits,
            learned_phrases: self.learned_phrases,
            last_sequence: self.last_sequence,
        }
    }
}

// ---------------------------------------------------------------------------
// Emergence suggestion
// ---------------------------------------------------------------------------

/// A roster persona that partially covers a need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CoverageMatch {
    /// The persona with the largest overlap.
    pub entity_id: String,
    /// Need terms the persona's role, voice or essence mention.
    pub shared_terms: Vec<String>,
}

/// Placeholder proposal for a new persona. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmergenceSuggestion {
    /// The need as described by the caller, trimmed.
    pub need: String,
    /// Placeholder name.
    pub suggested_name: String,
    /// Placeholder role.
    pub role: String,
    /// Placeholder voice.
    pub voice: String,
    /// Placeholder essence.
    pub essence: String,
    /// Starting constraints for the new persona.
    pub constraints: Vec<String>,
    /// Need terms no roster persona covers.
    pub uncovered_terms: Vec<String>,
    /// Closest existing persona, if any shares a term with the need.
    pub closest_match: Option<CoverageMatch>,
    /// Why the suggestion was made.
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evolved() -> PersonaState {
        let mut state = PersonaState::new(
            "ORION",
            BaseAttributes {
                role: "Logical Reckoning Engine".to_owned(),
                voice: "professorial".to_owned(),
                essence: "coherence".to_owned(),
                archetype: Archetype::Logician,
                constraints: vec!["Prepend nametag".to_owned()],
                sample_phrases: vec!["ORION: Sit down.".to_owned()],
            },
        );
        state.invocation_count = 12;
        state.evolution_stage = 1;
        state.accumulated_context = vec!["a".to_owned(), "b".to_owned()];
        state.developed_traits = vec!["Develops deeper pattern recognition".to_owned()];
        state.learned_phrases = vec!["ORION: 10 times.".to_owned()];
        state.last_sequence = 40;
        state
    }

    #[test]
    fn exported_persona_restores_state() {
        let state = evolved();
        let restored = ExportedPersona::from(&state).into_state("ORION");
        assert_eq!(restored, state);
    }

    #[test]
    fn summary_counts_traits_and_phrases() {
        let summary = evolved().summary();
        assert_eq!(summary.invocation_count, 12);
        assert_eq!(summary.trait_count, 1);
        assert_eq!(summary.phrase_count, 1);
        assert_eq!(summary.archetype, Archetype::Logician);
    }

    #[test]
    fn event_without_seed_omits_field() {
        let event = InvocationEvent {
            id: EventId::generate(),
            sequence: 1,
            entity_id: "Nova".to_owned(),
            kind: EventKind::Invocation,
            context: String::new(),
            tags: BTreeSet::new(),
            emotional_weight: 5,
            timestamp: Utc::now(),
            seed: None,
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(!json.contains("seed"));
        assert!(event.is_invocation());
    }
}
