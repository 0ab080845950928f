//! Gap analysis: suggest a new persona for a need the roster does not cover.
//!
//! Matching is term overlap between the need and each persona's declared
//! coverage (role, voice, essence). The analyzer never invents a persona;
//! it returns a placeholder whose details are left to be determined by use.

use mythos_types::{CoverageMatch, EmergenceSuggestion, PersonaState};

use crate::error::MythosError;
use crate::terms::significant_terms;

/// Placeholder for every attribute of a suggested persona.
pub const TO_BE_DETERMINED: &str = "To be determined";

/// Suggest a persona for `need`, citing the closest partial match in
/// `roster`.
///
/// # Errors
///
/// Returns [`MythosError::Validation`] if `need` is blank.
pub fn suggest<'a>(
    need: &str,
    roster: impl IntoIterator<Item = &'a PersonaState>,
) -> Result<EmergenceSuggestion, MythosError> {
    let need = need.trim();
    if need.is_empty() {
        return Err(MythosError::Validation {
            reason: "need description must not be empty".to_owned(),
        });
    }

    let wanted = significant_terms(need);
    let mut covered: Vec<&String> = Vec::new();
    let mut closest: Option<CoverageMatch> = None;

    for persona in roster {
        let coverage = significant_terms(&format!(
            "{} {} {}",
            persona.base.role, persona.base.voice, persona.base.essence
        ));
        let shared: Vec<String> = wanted
            .iter()
            .filter(|term| coverage.contains(term))
            .cloned()
            .collect();
        if shared.is_empty() {
            continue;
        }

        for term in &wanted {
            if coverage.contains(term) && !covered.contains(&term) {
                covered.push(term);
            }
        }
        if closest
            .as_ref()
            .is_none_or(|best| shared.len() > best.shared_terms.len())
        {
            closest = Some(CoverageMatch {
                entity_id: persona.entity_id.clone(),
                shared_terms: shared,
            });
        }
    }

    let uncovered_terms: Vec<String> = wanted
        .iter()
        .filter(|term| !covered.contains(term))
        .cloned()
        .collect();

    let rationale = rationale(need, &uncovered_terms, closest.as_ref());

    Ok(EmergenceSuggestion {
        need: need.to_owned(),
        suggested_name: TO_BE_DETERMINED.to_owned(),
        role: TO_BE_DETERMINED.to_owned(),
        voice: TO_BE_DETERMINED.to_owned(),
        essence: TO_BE_DETERMINED.to_owned(),
        constraints: vec![
            "Prepend nametag".to_owned(),
            "Undefined until needed".to_owned(),
        ],
        uncovered_terms,
        closest_match: closest,
        rationale,
    })
}

fn rationale(need: &str, uncovered: &[String], closest: Option<&CoverageMatch>) -> String {
    let gap = if uncovered.is_empty() {
        format!("Current constellation touches every term of \"{need}\" but no persona holds it as a whole")
    } else {
        format!(
            "Current constellation lacks coverage for: {}",
            uncovered.join(", ")
        )
    };
    match closest {
        Some(m) => format!(
            "{gap}. Closest partial match is {} (shares: {}).",
            m.entity_id,
            m.shared_terms.join(", ")
        ),
        None => format!("{gap}. No existing persona shares any of its terms."),
    }
}
