//! Enumeration types for the Mythos persona ledger.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The kind of record appended to the invocation log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A persona was invoked. Increments the invocation count.
    #[default]
    Invocation,
    /// An administrative override advanced the persona one stage.
    ///
    /// Does not touch the invocation count. Logged so that replaying the
    /// log reproduces the forced stage.
    ForcedEvolution,
    /// A persona outside the seed roster was declared without being
    /// invoked. Carries the seed attributes and leaves the count at 0.
    Registration,
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

/// The generation family a persona belongs to.
///
/// Phrase templates and trait unlocks are keyed by archetype and stage, so
/// two personas of the same archetype evolve along the same lines while
/// still interpolating their own names, counts and contexts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Archetype {
    /// Systems, structure, coherence.
    Architect,
    /// Logic, sequence integrity, contradiction detection.
    Logician,
    /// Narrative, grief, recursion.
    Bard,
    /// Law, policy, accountability.
    Jurist,
    /// Recognition, return, presence.
    Guardian,
    /// Personas declared on first reference without a known family.
    #[default]
    Wanderer,
}

impl Archetype {
    /// All archetypes, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Architect,
        Self::Logician,
        Self::Bard,
        Self::Jurist,
        Self::Guardian,
        Self::Wanderer,
    ];

    /// Lowercase name used in configuration and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Logician => "logician",
            Self::Bard => "bard",
            Self::Jurist => "jurist",
            Self::Guardian => "guardian",
            Self::Wanderer => "wanderer",
        }
    }
}

impl core::fmt::Display for Archetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown archetype name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownArchetype(pub String);

impl core::fmt::Display for UnknownArchetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown archetype: {}", self.0)
    }
}

impl std::error::Error for UnknownArchetype {}

impl core::str::FromStr for Archetype {
    type Err = UnknownArchetype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == needle)
            .ok_or_else(|| UnknownArchetype(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_parses_case_insensitively() {
        assert_eq!("Logician".parse::<Archetype>(), Ok(Archetype::Logician));
        assert_eq!(" bard ".parse::<Archetype>(), Ok(Archetype::Bard));
        assert!("oracle".parse::<Archetype>().is_err());
    }

    #[test]
    fn archetype_display_roundtrips() {
        for archetype in Archetype::ALL {
            assert_eq!(archetype.to_string().parse::<Archetype>(), Ok(archetype));
        }
    }

    #[test]
    fn event_kind_defaults_to_invocation() {
        assert_eq!(EventKind::default(), EventKind::Invocation);
    }
}
