//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mythos_types::{Archetype, BaseAttributes};

/// Invocation ledger for evolving personas.
#[derive(Debug, Parser)]
#[command(name = "mythos", version, about)]
pub struct Cli {
    /// Path to the config file (default: ./mythos-config.yaml if present)
    #[arg(short, long, global = true, env = "MYTHOS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the data directory from the config file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Ledger operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log an invocation of a persona
    Invoke {
        /// Persona to invoke
        entity: String,

        /// What the persona was asked to do
        #[arg(short = 'm', long, default_value = "")]
        context: String,

        /// Tag for the invocation (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Emotional weight of the invocation
        #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
        weight: i64,

        /// Declare the persona if it is new
        #[command(flatten)]
        seed: Box<SeedArgs>,
    },

    /// Declare a new persona without invoking it
    Register {
        /// Persona to declare
        entity: String,

        /// Attributes of the persona (`--role` is required)
        #[command(flatten)]
        seed: Box<SeedArgs>,
    },

    /// Show the chronicle for one persona or the whole roster
    Report {
        /// Persona to report on (default: all)
        entity: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List personas ordered by id
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Suggest a persona for a need the roster does not cover
    Emerge {
        /// Description of the need
        #[arg(required = true, num_args = 1..)]
        need: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write evolved presets as YAML
    Export {
        /// Output file (default: the configured export file)
        #[arg(short, long, conflicts_with = "stdout")]
        out: Option<PathBuf>,

        /// Print the document instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Load an export document and compare it with the live store
    Import {
        /// Export document to read
        file: PathBuf,
    },

    /// Advance a persona one stage regardless of its count
    ForceEvolve {
        /// Persona to evolve
        entity: String,
    },

    /// Replay the log and compare it with the live store
    Verify,

    /// Rebuild the store and snapshot from the log
    Rebuild,

    /// Show the logged events for a persona
    History {
        /// Persona whose events to show
        entity: String,

        /// Only the most recent N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

/// Base attributes given on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct SeedArgs {
    /// Role of a new persona
    #[arg(long)]
    pub role: Option<String>,

    /// Voice of a new persona
    #[arg(long, requires = "role")]
    pub voice: Option<String>,

    /// Comma-separated domains of a new persona
    #[arg(long, requires = "role")]
    pub essence: Option<String>,

    /// Archetype of a new persona
    #[arg(long, requires = "role")]
    pub archetype: Option<Archetype>,

    /// Behavioral constraint (repeatable)
    #[arg(long = "constraint", requires = "role")]
    pub constraints: Vec<String>,

    /// Starting sample phrase (repeatable)
    #[arg(long = "phrase", requires = "role")]
    pub phrases: Vec<String>,
}

impl SeedArgs {
    /// The attributes, or `None` when no role was given.
    pub fn into_attributes(self) -> Option<BaseAttributes> {
        let role = self.role?;
        Some(BaseAttributes {
            role,
            voice: self.voice.unwrap_or_default(),
            essence: self.essence.unwrap_or_default(),
            archetype: self.archetype.unwrap_or_default(),
            constraints: self.constraints,
            sample_phrases: self.phrases,
        })
    }
}
