//! Reports: a read-only projection of the store and the log.
//!
//! A [`Report`] serializes for machine consumers and implements
//! [`Display`](core::fmt::Display) as a plain-text chronicle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mythos_types::{Archetype, InvocationEvent, PersonaState};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::MythosError;
use crate::store::EntityStore;
use crate::threshold::{Threshold, Thresholds};

const RULE: &str = "============================================================";
const DIVIDER: &str = "------------------------------------------------------------";

/// Report over one persona or the whole roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Invocations across every persona, not just those reported.
    pub total_invocations: u64,
    /// Sequence number of the last event reflected.
    pub last_sequence: u64,
    /// Reported personas, ordered by entity id.
    pub entities: Vec<EntityReport>,
}

/// Report section for one persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    /// The persona.
    pub entity_id: String,
    /// Its role.
    pub role: String,
    /// Its archetype.
    pub archetype: Archetype,
    /// Invocations so far.
    pub invocation_count: u64,
    /// Current stage.
    pub evolution_stage: u32,
    /// Highest forced stage, 0 if none.
    pub forced_stage: u32,
    /// The next threshold to cross, if any remain.
    pub next_threshold: Option<Threshold>,
    /// Developed traits in discovery order.
    pub developed_traits: Vec<String>,
    /// Learned phrases in discovery order.
    pub learned_phrases: Vec<String>,
    /// Statistics derived from the log.
    pub statistics: EntityStatistics,
}

/// Statistics derived from a persona's invocation events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityStatistics {
    /// Percentage of all invocations attributed to this persona, two places.
    pub share_of_invocations: Decimal,
    /// How often each tag was used.
    pub tag_frequency: BTreeMap<String, u64>,
    /// Mean emotional weight, two places. `None` before the first invocation.
    pub average_weight: Option<Decimal>,
    /// Timestamp of the most recent invocation.
    pub last_invoked_at: Option<DateTime<Utc>>,
}

/// Build a report for `entity_id`, or for every persona when `None`.
///
/// # Errors
///
/// Returns [`MythosError::UnknownEntity`] if `entity_id` is not in the store.
pub fn build_report(
    store: &EntityStore,
    events: &[InvocationEvent],
    thresholds: &Thresholds,
    entity_id: Option<&str>,
) -> Result<Report, MythosError> {
    let selected: Vec<&PersonaState> = match entity_id {
        Some(id) => vec![store.get(id).ok_or_else(|| MythosError::UnknownEntity {
            entity_id: id.to_owned(),
        })?],
        None => store.iter().collect(),
    };

    let total_invocations = store.total_invocations();
    let entities = selected
        .into_iter()
        .map(|state| EntityReport {
            entity_id: state.entity_id.clone(),
            role: state.base.role.clone(),
            archetype: state.base.archetype,
            invocation_count: state.invocation_count,
            evolution_stage: state.evolution_stage,
            forced_stage: state.forced_stage,
            next_threshold: thresholds.next_after(state.evolution_stage),
            developed_traits: state.developed_traits.clone(),
            learned_phrases: state.learned_phrases.clone(),
            statistics: statistics(state, events, total_invocations),
        })
        .collect();

    Ok(Report {
        total_invocations,
        last_sequence: events.last().map_or(0, |e| e.sequence),
        entities,
    })
}

fn statistics(state: &PersonaState, events: &[InvocationEvent], total: u64) -> EntityStatistics {
    let mut tag_frequency: BTreeMap<String, u64> = BTreeMap::new();
    let mut weight_sum = 0_u64;
    let mut invocations = 0_u64;
    let mut last_invoked_at = None;

    for event in events
        .iter()
        .filter(|e| e.is_invocation() && e.entity_id == state.entity_id)
    {
        for tag in &event.tags {
            let count = tag_frequency.entry(tag.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
        weight_sum = weight_sum.saturating_add(u64::from(event.emotional_weight));
        invocations = invocations.saturating_add(1);
        last_invoked_at = Some(event.timestamp);
    }

    EntityStatistics {
        share_of_invocations: percentage(state.invocation_count, total),
        tag_frequency,
        average_weight: ratio(weight_sum, invocations),
        last_invoked_at,
    }
}

/// `part / whole * 100`, rounded to two places. Zero when `whole` is zero.
fn percentage(part: u64, whole: u64) -> Decimal {
    Decimal::from(part)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(Decimal::from(whole)))
        .map_or_else(|| two_places(Decimal::ZERO), two_places)
}

fn ratio(sum: u64, count: u64) -> Option<Decimal> {
    Decimal::from(sum)
        .checked_div(Decimal::from(count))
        .map(two_places)
}

fn two_places(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

impl core::fmt::Display for Report {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "MYTHOS CHRONICLE")?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{} invocations across the constellation (through event {})",
            self.total_invocations, self.last_sequence
        )?;

        for entity in &self.entities {
            writeln!(f)?;
            write!(f, "{entity}")?;
            writeln!(f, "{DIVIDER}")?;
        }
        Ok(())
    }
}

impl core::fmt::Display for EntityReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let stats = &self.statistics;

        writeln!(f, "## {} ({}): {}", self.entity_id, self.archetype, self.role)?;
        write!(f, "Evolution Stage: {}", self.evolution_stage)?;
        match self.next_threshold {
            Some(next) => writeln!(
                f,
                " (stage {} at {} invocations)",
                next.stage, next.required_count
            )?,
            None => writeln!(f, " (final)")?,
        }
        if self.forced_stage > 0 {
            writeln!(f, "Forced To Stage: {}", self.forced_stage)?;
        }
        writeln!(
            f,
            "Invocations: {} ({}% of all)",
            self.invocation_count, stats.share_of_invocations
        )?;
        if let Some(average) = stats.average_weight {
            writeln!(f, "Average Weight: {average}")?;
        }
        if let Some(at) = stats.last_invoked_at {
            writeln!(f, "Last Invoked: {}", at.to_rfc3339())?;
        }
        if !stats.tag_frequency.is_empty() {
            let tags: Vec<String> = stats
                .tag_frequency
                .iter()
                .map(|(tag, n)| format!("{tag} x{n}"))
                .collect();
            writeln!(f, "Tags: {}", tags.join(", "))?;
        }

        if !self.developed_traits.is_empty() {
            writeln!(f, "\nDeveloped Traits:")?;
            for t in &self.developed_traits {
                writeln!(f, "  • {t}")?;
            }
        }
        if !self.learned_phrases.is_empty() {
            writeln!(f, "\nLearned Phrases:")?;
            for p in &self.learned_phrases {
                writeln!(f, "  • {p}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mythos_ledger::{EventDraft, EventLog};

    use super::*;
    use crate::evolution::EvolutionEngine;

    fn populated() -> (EntityStore, EventLog) {
        let engine = EvolutionEngine::new(Thresholds::default(), 10).unwrap();
        let mut log = EventLog::new();
        let mut store = EntityStore::seeded(20);

        for i in 0..10 {
            let draft = EventDraft::invocation("ORION")
                .context(format!("proof {i}"))
                .tag("logic")
                .weight(8);
            let event = log.append(draft).unwrap().clone();
            store.apply_event(&event, &engine).unwrap();
        }
        for weight in [3, 4, 5, 6, 7, 8, 9, 10, 2, 1] {
            let draft = EventDraft::invocation("Lent").tag("return").weight(weight);
            let event = log.append(draft).unwrap().clone();
            store.apply_event(&event, &engine).unwrap();
        }
        (store, log)
    }

    #[test]
    fn single_entity_report() {
        let (store, log) = populated();
        let report =
            build_report(&store, log.all_events(), &Thresholds::default(), Some("ORION")).unwrap();

        assert_eq!(report.total_invocations, 20);
        assert_eq!(report.entities.len(), 1);
        let orion = report.entities.first().unwrap();
        assert_eq!(orion.invocation_count, 10);
        assert_eq!(orion.evolution_stage, 1);
        assert_eq!(orion.next_threshold.map(|t| t.required_count), Some(25));
        assert_eq!(orion.statistics.share_of_invocations, Decimal::new(5000, 2));
        assert_eq!(orion.statistics.average_weight, Some(Decimal::new(800, 2)));
        assert_eq!(orion.statistics.tag_frequency.get("logic"), Some(&10));
        assert!(orion.statistics.last_invoked_at.is_some());
    }

    #[test]
    fn full_roster_report_is_ordered() {
        let (store, log) = populated();
        let report = build_report(&store, log.all_events(), &Thresholds::default(), None).unwrap();
        let ids: Vec<&str> = report.entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["Lent", "Nova", "ORION", "Redid", "The Fuckface"]);

        let nova = report.entities.get(1).unwrap();
        assert_eq!(nova.statistics.average_weight, None);
        assert_eq!(nova.statistics.share_of_invocations, Decimal::ZERO);
    }

    #[test]
    fn average_weight_rounds_to_two_places() {
        let (store, log) = populated();
        let report =
            build_report(&store, log.all_events(), &Thresholds::default(), Some("Lent")).unwrap();
        let lent = report.entities.first().unwrap();
        assert_eq!(lent.statistics.average_weight, Some(Decimal::new(550, 2)));
    }

    #[test]
    fn unknown_entity_report_fails() {
        let (store, log) = populated();
        assert!(matches!(
            build_report(&store, log.all_events(), &Thresholds::default(), Some("Nobody")),
            Err(MythosError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn empty_roster_shares_are_zero() {
        assert_eq!(percentage(0, 0), Decimal::ZERO);
        assert_eq!(percentage(1, 3), Decimal::new(3333, 2));
        assert_eq!(percentage(1, 4).to_string(), "25.00");
    }

    #[test]
    fn chronicle_lists_traits_and_phrases() {
        let (store, log) = populated();
        let text = build_report(&store, log.all_events(), &Thresholds::default(), Some("ORION"))
            .unwrap()
            .to_string();

        assert!(text.contains("MYTHOS CHRONICLE"));
        assert!(text.contains("## ORION (logician)"));
        assert!(text.contains("Invocations: 10 (50.00% of all)"));
        assert!(text.contains("Developed Traits:"));
        assert!(text.contains("ORION: Fuck. We've been over this 10 times."));
        assert!(text.contains("Tags: logic x10"));
    }
}
