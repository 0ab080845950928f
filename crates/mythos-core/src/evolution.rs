//! Evolution: threshold checks and the phrases and traits each stage unlocks.
//!
//! The [`EvolutionEngine`] owns the threshold table and a `minijinja`
//! environment with every phrase template pre-loaded. Generation is a pure
//! function of the persona's id, archetype, count, recent context and the
//! target stage, so replaying the log renders the same phrases again.
//!
//! # Mutation order
//!
//! When a persona jumps more than one stage at once (forced evolution, a
//! lowered threshold, an import) every intermediate stage is generated and
//! applied in ascending order. Phrases and traits already present are never
//! appended twice.

use minijinja::{Environment, UndefinedBehavior, context};
use mythos_types::PersonaState;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EvolutionConfig;
use crate::error::MythosError;
use crate::lore;
use crate::terms;
use crate::threshold::Thresholds;

/// Shown in place of a context fragment when a persona has none.
const NO_CONTEXT: &str = "the quiet work";

/// Longest context fragment quoted in a phrase, in words.
const MAX_FRAGMENT_WORDS: usize = 12;

/// What one stage of evolution added to a persona.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    /// The stage reached.
    pub stage: u32,
    /// Phrases learned at this stage.
    pub new_phrases: Vec<String>,
    /// Traits unlocked at this stage.
    pub new_traits: Vec<String>,
}

impl EvolutionRecord {
    /// Whether the stage added nothing new.
    pub fn is_empty(&self) -> bool {
        self.new_phrases.is_empty() && self.new_traits.is_empty()
    }
}

/// Evaluates thresholds and generates stage mutations.
pub struct EvolutionEngine {
    thresholds: Thresholds,
    phrase_window: usize,
    env: Environment<'static>,
}

impl core::fmt::Debug for EvolutionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EvolutionEngine")
            .field("thresholds", &self.thresholds)
            .field("phrase_window", &self.phrase_window)
            .finish_non_exhaustive()
    }
}

impl EvolutionEngine {
    /// Build an engine with every lore template compiled.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Template`] if a template fails to compile.
    pub fn new(thresholds: Thresholds, phrase_window: usize) -> Result<Self, MythosError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        for (name, source) in lore::all_templates() {
            env.add_template_owned(name.clone(), source.to_owned())
                .map_err(|e| MythosError::Template(format!("failed to add {name}: {e}")))?;
        }

        Ok(Self {
            thresholds,
            phrase_window: phrase_window.max(1),
            env,
        })
    }

    /// Build an engine from the evolution section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Config`] for an invalid threshold table and
    /// [`MythosError::Template`] if a template fails to compile.
    pub fn from_config(config: &EvolutionConfig) -> Result<Self, MythosError> {
        Self::new(config.threshold_table()?, config.phrase_window)
    }

    /// The threshold table in use.
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Highest stage a persona can reach.
    pub fn max_stage(&self) -> u32 {
        self.thresholds.max_stage()
    }

    /// Generate the phrases and traits `entity` gains on reaching `stage`.
    ///
    /// Does not modify the persona. Anything it already has is left out of
    /// the result, so generating the same stage twice yields an empty
    /// record the second time.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Template`] if rendering fails.
    pub fn generate_evolution(
        &self,
        entity: &PersonaState,
        stage: u32,
    ) -> Result<EvolutionRecord, MythosError> {
        let archetype = entity.base.archetype;
        let name = lore::template_name(archetype, stage);
        let template = self
            .env
            .get_template(&name)
            .map_err(|e| MythosError::Template(format!("missing template {name}: {e}")))?;

        let recent = self.recent_context(entity);
        let latest = recent
            .iter()
            .rev()
            .find(|c| !c.trim().is_empty())
            .map_or_else(|| NO_CONTEXT.to_owned(), |c| fragment(c));
        let theme = terms::dominant_term(recent.iter().map(String::as_str))
            .unwrap_or_else(|| NO_CONTEXT.to_owned());

        let phrase = template
            .render(context! {
                name => entity.entity_id,
                count => entity.invocation_count,
                stage => stage,
                latest => latest,
                theme => theme,
                window => recent.len(),
            })
            .map_err(|e| MythosError::Template(format!("{name} render failed: {e}")))?;

        let unlocked = lore::trait_for(archetype, stage);

        Ok(EvolutionRecord {
            stage,
            new_phrases: if entity.learned_phrases.contains(&phrase) {
                Vec::new()
            } else {
                vec![phrase]
            },
            new_traits: if entity.developed_traits.contains(&unlocked) {
                Vec::new()
            } else {
                vec![unlocked]
            },
        })
    }

    /// Advance `entity` to `target`, applying every stage in between.
    ///
    /// Does nothing when the persona is already at or past `target`.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Template`] if rendering fails. The persona may
    /// then be partially advanced; callers work on a copy.
    pub fn evolve_to(
        &self,
        entity: &mut PersonaState,
        target: u32,
    ) -> Result<Vec<EvolutionRecord>, MythosError> {
        let mut records = Vec::new();
        let first = entity.evolution_stage.saturating_add(1);

        for stage in first..=target {
            let record = self.generate_evolution(entity, stage)?;
            apply(entity, &record);
            info!(
                entity_id = entity.entity_id,
                stage,
                invocation_count = entity.invocation_count,
                phrases = record.new_phrases.len(),
                traits = record.new_traits.len(),
                "Evolution event"
            );
            records.push(record);
        }

        Ok(records)
    }

    /// Evolve `entity` to whatever stage its count has earned.
    ///
    /// Idempotent: a second call at the same count changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MythosError::Template`] if rendering fails.
    pub fn check(&self, entity: &mut PersonaState) -> Result<Vec<EvolutionRecord>, MythosError> {
        match self
            .thresholds
            .evaluate(entity.invocation_count, entity.evolution_stage)
        {
            Some(target) => self.evolve_to(entity, target),
            None => Ok(Vec::new()),
        }
    }

    fn recent_context<'a>(&self, entity: &'a PersonaState) -> &'a [String] {
        let skip = entity
            .accumulated_context
            .len()
            .saturating_sub(self.phrase_window);
        entity.accumulated_context.get(skip..).unwrap_or_default()
    }
}

fn apply(entity: &mut PersonaState, record: &EvolutionRecord) {
    for phrase in &record.new_phrases {
        if !entity.learned_phrases.contains(phrase) {
            entity.learned_phrases.push(phrase.clone());
        }
    }
    for unlocked in &record.new_traits {
        if !entity.developed_traits.contains(unlocked) {
            entity.developed_traits.push(unlocked.clone());
        }
    }
    entity.evolution_stage = entity.evolution_stage.max(record.stage);
}

/// The first few words of a context string.
fn fragment(context: &str) -> String {
    let words: Vec<&str> = context.split_whitespace().collect();
    if words.len() <= MAX_FRAGMENT_WORDS {
        return words.join(" ");
    }
    let head = words.get(..MAX_FRAGMENT_WORDS).unwrap_or_default().join(" ");
    format!("{head}...")
}
