//! Shared type definitions for the Mythos persona ledger.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: the invocation log, the persona store, persistence and the
//! command line all speak in these terms. Types are exported to `TypeScript`
//! via `ts-rs` for external consumers of the export document.
//!
//! # Modules
//!
//! - [`ids`] -- Event identifiers
//! - [`enums`] -- Event kinds and persona archetypes
//! - [`structs`] -- Events, persona state, snapshots, exports, suggestions

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Archetype, EventKind, UnknownArchetype};
pub use ids::EventId;
pub use structs::{
    BaseAttributes, CoverageMatch, EmergenceSuggestion, ExportDocument, ExportedPersona,
    FORMAT_VERSION, InvocationEvent, PersonaState, PersonaSummary, Snapshot,
};
