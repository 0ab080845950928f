//! Event drafts and validation for the invocation log.
//!
//! An [`EventDraft`] carries everything the caller decides about an event.
//! The log decides the rest (id, sequence number, timestamp) when the draft
//! is appended. Validation runs before the log is touched, so a rejected
//! draft never changes the log.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use mythos_types::{BaseAttributes, EventId, EventKind, InvocationEvent};

use crate::{LedgerError, WeightBounds};

/// Weight recorded on forced evolution events. Checked against
/// [`WeightBounds::SCALE`], never against configured bounds.
pub const FORCED_EVOLUTION_WEIGHT: i64 = 10;

/// Default weight for invocations that do not set one.
pub const DEFAULT_WEIGHT: i64 = 5;

// ---------------------------------------------------------------------------
// Event draft
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`InvocationEvent`] values.
///
/// # Examples
///
/// ```
/// use mythos_ledger::{EventDraft, WeightBounds};
///
/// let draft = EventDraft::invocation("Nova")
///     .context("Architecting the overlay")
///     .tag("systems")
///     .weight(7);
///
/// assert!(draft.validate(WeightBounds::default()).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventDraft {
    entity_id: String,
    kind: EventKind,
    context: String,
    tags: BTreeSet<String>,
    emotional_weight: i64,
    seed: Option<BaseAttributes>,
}

impl EventDraft {
    /// Start a draft for an ordinary invocation.
    pub fn invocation(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: EventKind::Invocation,
            context: String::new(),
            tags: BTreeSet::new(),
            emotional_weight: DEFAULT_WEIGHT,
            seed: None,
        }
    }

    /// Start a draft for an administrative stage override.
    pub fn forced_evolution(entity_id: impl Into<String>, target_stage: u32) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: EventKind::ForcedEvolution,
            context: format!("Forced evolution to stage {target_stage}"),
            tags: ["evolution".to_owned(), "forced".to_owned()].into_iter().collect(),
            emotional_weight: FORCED_EVOLUTION_WEIGHT,
            seed: None,
        }
    }

    /// Start a draft declaring a new persona with `seed` attributes.
    pub fn registration(entity_id: impl Into<String>, seed: BaseAttributes) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: EventKind::Registration,
            context: String::new(),
            tags: BTreeSet::new(),
            emotional_weight: DEFAULT_WEIGHT,
            seed: Some(seed),
        }
    }

    /// Set the free-text context.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Add one tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add several tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the emotional weight. Range is checked on validation.
    #[must_use]
    pub const fn weight(mut self, weight: i64) -> Self {
        self.emotional_weight = weight;
        self
    }

    /// Attach attributes declaring a persona outside the seed roster.
    #[must_use]
    pub fn seed(mut self, seed: BaseAttributes) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The entity id as given, trimmed.
    pub fn entity_id(&self) -> &str {
        self.entity_id.trim()
    }

    /// The kind of event this draft will produce.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Seed attributes, if any.
    pub const fn seed_attributes(&self) -> Option<&BaseAttributes> {
        self.seed.as_ref()
    }

    /// Range the weight must lie in: `bounds` for invocations, the whole
    /// scale for events the engine writes itself.
    pub const fn allowed_weights(&self, bounds: WeightBounds) -> WeightBounds {
        match self.kind {
            EventKind::Invocation => bounds,
            EventKind::ForcedEvolution | EventKind::Registration => WeightBounds::SCALE,
        }
    }

    /// Check every field against its rule.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmptyEntityId`] for a blank entity id,
    /// [`LedgerError::WeightOutOfRange`] for an invocation weight outside
    /// `bounds` (see [`EventDraft::allowed_weights`]),
    /// [`LedgerError::EmptyTag`] for a blank tag and
    /// [`LedgerError::InvalidSeed`] for seed attributes without a role.
    pub fn validate(&self, bounds: WeightBounds) -> Result<(), LedgerError> {
        if self.entity_id.trim().is_empty() {
            return Err(LedgerError::EmptyEntityId);
        }

        let allowed = self.allowed_weights(bounds);
        if !allowed.contains(self.emotional_weight) {
            return Err(LedgerError::WeightOutOfRange {
                weight: self.emotional_weight,
                min: allowed.min,
                max: allowed.max,
            });
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(LedgerError::EmptyTag);
        }

        if self.kind == EventKind::Registration && self.seed.is_none() {
            return Err(LedgerError::InvalidSeed {
                entity_id: self.entity_id.trim().to_owned(),
            });
        }

        if let Some(seed) = &self.seed {
            if seed.role.trim().is_empty() {
                return Err(LedgerError::InvalidSeed {
                    entity_id: self.entity_id.trim().to_owned(),
                });
            }
        }

        Ok(())
    }

    /// Validate and produce the event at the given log position.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`EventDraft::validate`].
    pub fn build(
        self,
        sequence: u64,
        timestamp: DateTime<Utc>,
        bounds: WeightBounds,
    ) -> Result<InvocationEvent, LedgerError> {
        self.validate(bounds)?;

        let allowed = self.allowed_weights(bounds);
        let emotional_weight = u8::try_from(self.emotional_weight).ok().ok_or(
            LedgerError::WeightOutOfRange {
                weight: self.emotional_weight,
                min: allowed.min,
                max: allowed.max,
            },
        )?;

        Ok(InvocationEvent {
            id: EventId::generate(),
            sequence,
            entity_id: self.entity_id.trim().to_owned(),
            kind: self.kind,
            context: self.context.trim().to_owned(),
            tags: self.tags.iter().map(|t| t.trim().to_owned()).collect(),
            emotional_weight,
            timestamp,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn build(draft: EventDraft) -> Result<InvocationEvent, LedgerError> {
        draft.build(1, Utc::now(), WeightBounds::default())
    }

    #[test]
    fn valid_draft_builds() {
        let event = build(
            EventDraft::invocation("  ORION ")
                .context(" Checking premises ")
                .tags(["academic", " logic "])
                .weight(8),
        )
        .unwrap();
        assert_eq!(event.entity_id, "ORION");
        assert_eq!(event.context, "Checking premises");
        assert!(event.tags.contains("logic"));
        assert_eq!(event.emotional_weight, 8);
        assert_eq!(event.kind, EventKind::Invocation);
    }

    #[test]
    fn empty_entity_rejected() {
        assert!(matches!(
            build(EventDraft::invocation("   ")),
            Err(LedgerError::EmptyEntityId)
        ));
    }

    #[test]
    fn weight_above_range_rejected() {
        assert!(matches!(
            build(EventDraft::invocation("Nova").weight(15)),
            Err(LedgerError::WeightOutOfRange { weight: 15, .. })
        ));
    }

    #[test]
    fn negative_weight_rejected() {
        assert!(build(EventDraft::invocation("Nova").weight(-1)).is_err());
    }

    #[test]
    fn blank_tag_rejected() {
        assert!(matches!(
            build(EventDraft::invocation("Nova").tag(" ")),
            Err(LedgerError::EmptyTag)
        ));
    }

    #[test]
    fn seed_without_role_rejected() {
        let draft = EventDraft::invocation("Vesper").seed(BaseAttributes::with_role(""));
        assert!(matches!(build(draft), Err(LedgerError::InvalidSeed { .. })));
    }

    #[test]
    fn duplicate_tags_collapse() {
        let event = build(EventDraft::invocation("Nova").tags(["a", "a", "b"]));
        assert_eq!(event.map(|e| e.tags.len()).ok(), Some(2));
    }

    #[test]
    fn registration_carries_seed() {
        let event = build(EventDraft::registration(
            "Vesper",
            BaseAttributes::with_role("Night archivist"),
        ))
        .unwrap();
        assert_eq!(event.kind, EventKind::Registration);
        assert_eq!(event.seed.map(|s| s.role), Some("Night archivist".to_owned()));
    }

    #[test]
    fn narrowed_bounds_gate_only_invocations() {
        let narrow = WeightBounds { min: 6, max: 9 };

        assert!(matches!(
            EventDraft::invocation("Nova").weight(10).validate(narrow),
            Err(LedgerError::WeightOutOfRange { min: 6, max: 9, .. })
        ));
        assert!(EventDraft::forced_evolution("Nova", 1).validate(narrow).is_ok());
        let registration =
            EventDraft::registration("Vesper", BaseAttributes::with_role("Night archivist"));
        assert!(registration.validate(narrow).is_ok());
        assert_eq!(
            registration.build(1, Utc::now(), narrow).unwrap().emotional_weight,
            5
        );
    }

    #[test]
    fn forced_evolution_draft_is_tagged() {
        let event = build(EventDraft::forced_evolution("Lent", 2)).unwrap();
        assert_eq!(event.kind, EventKind::ForcedEvolution);
        assert!(event.tags.contains("forced"));
        assert_eq!(event.context, "Forced evolution to stage 2");
    }
}
