//! Persona store, evolution engine and orchestration for the Mythos ledger.
//!
//! Personas evolve through use. Every invocation is appended to the log;
//! the store folds each event into the persona it names, and crossing an
//! invocation threshold unlocks a stage with its own phrases and traits.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `mythos-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- [`MythosEngine`]: invoke, report, emerge, export,
//!   force-evolve, verify and rebuild over a [`Persistence`] backend.
//! - [`store`] -- The [`EntityStore`] of derived persona state.
//! - [`threshold`] -- Pure stage evaluation over an ascending threshold table.
//! - [`evolution`] -- Phrase and trait generation per stage.
//! - [`lore`] -- Templates and trait unlocks keyed by archetype and stage.
//! - [`seed`] -- The canonical roster.
//! - [`report`] -- Read-only reports and the text chronicle.
//! - [`emergence`] -- Gap analysis for uncovered needs.
//! - [`replay`] -- Log replay and consistency checks.
//! - [`persistence`] -- The storage trait and an in-memory backend.
//! - [`error`] -- [`MythosError`].
//!
//! [`MythosEngine`]: engine::MythosEngine
//! [`Persistence`]: persistence::Persistence
//! [`EntityStore`]: store::EntityStore
//! [`MythosError`]: error::MythosError

pub mod config;
pub mod emergence;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod lore;
pub mod persistence;
pub mod replay;
pub mod report;
pub mod seed;
pub mod store;
pub mod terms;
pub mod threshold;

pub use config::{ConfigError, MythosConfig};
pub use engine::{InvocationOutcome, InvocationRequest, MythosEngine};
pub use error::MythosError;
pub use evolution::{EvolutionEngine, EvolutionRecord};
pub use persistence::{MemoryPersistence, Persistence};
pub use report::Report;
pub use store::EntityStore;
