//! Subcommand handlers.
//!
//! Each handler writes its result to `out` so the same code serves the
//! terminal and the tests.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use mythos_core::replay::{self, ConsistencyResult};
use mythos_core::{EntityStore, InvocationOutcome, InvocationRequest, MythosEngine, MythosError};
use mythos_db::{FileStorage, read_export};
use mythos_types::{EmergenceSuggestion, PersonaSummary};
use tracing::info;

use crate::cli::{Command, SeedArgs};
use crate::error::CliError;

type Engine = MythosEngine<FileStorage>;

/// Run one subcommand against `engine`.
pub fn run(command: Command, engine: &mut Engine, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Invoke {
            entity,
            context,
            tags,
            weight,
            seed,
        } => invoke(engine, out, entity, context, tags, weight, *seed),
        Command::Register { entity, seed } => register(engine, out, &entity, *seed),
        Command::Report { entity, json } => report(engine, out, entity.as_deref(), json),
        Command::List { json } => list(engine, out, json),
        Command::Emerge { need, json } => emerge(engine, out, &need.join(" "), json),
        Command::Export { out: path, stdout } => export(engine, out, path.as_deref(), stdout),
        Command::Import { file } => import(engine, out, &file),
        Command::ForceEvolve { entity } => force_evolve(engine, out, &entity),
        Command::Verify => verify(engine, out),
        Command::Rebuild => rebuild(engine, out),
        Command::History { entity, limit } => history(engine, out, &entity, limit),
    }
}

fn invoke(
    engine: &mut Engine,
    out: &mut impl Write,
    entity: String,
    context: String,
    tags: Vec<String>,
    weight: i64,
    seed: SeedArgs,
) -> Result<(), CliError> {
    let mut request = InvocationRequest::new(entity).context(context).weight(weight);
    for tag in tags {
        request = request.tag(tag);
    }
    if let Some(attributes) = seed.into_attributes() {
        request = request.seed(attributes);
    }

    let outcome = engine.invoke(request)?;
    writeln!(
        out,
        "{} invoked: {} total, stage {}",
        outcome.state.entity_id, outcome.state.invocation_count, outcome.state.evolution_stage
    )?;
    write_evolutions(out, &outcome)
}

fn register(
    engine: &mut Engine,
    out: &mut impl Write,
    entity: &str,
    seed: SeedArgs,
) -> Result<(), CliError> {
    let attributes = seed.into_attributes().ok_or_else(|| CliError::Usage {
        message: "register needs --role".to_owned(),
    })?;
    let state = engine.register(entity, attributes)?;
    writeln!(
        out,
        "{} registered as {} ({})",
        state.entity_id, state.base.role, state.base.archetype
    )?;
    Ok(())
}

fn report(
    engine: &Engine,
    out: &mut impl Write,
    entity: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let report = engine.report(entity)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    Ok(())
}

fn list(engine: &Engine, out: &mut impl Write, json: bool) -> Result<(), CliError> {
    let roster = engine.list_entities();
    if json {
        let keyed: BTreeMap<String, PersonaSummary> = roster.into_iter().collect();
        serde_json::to_writer_pretty(&mut *out, &keyed)?;
        writeln!(out)?;
        return Ok(());
    }
    write_roster(out, &roster)
}

fn emerge(engine: &Engine, out: &mut impl Write, need: &str, json: bool) -> Result<(), CliError> {
    let suggestion = engine.emerge(need)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &suggestion)?;
        writeln!(out)?;
        return Ok(());
    }
    write_suggestion(out, &suggestion)
}

fn export(
    engine: &Engine,
    out: &mut impl Write,
    path: Option<&Path>,
    stdout: bool,
) -> Result<(), CliError> {
    let document = engine.export();
    if stdout {
        write!(out, "{}", serde_yml::to_string(&document)?)?;
        return Ok(());
    }
    let written = engine.storage().write_export(&document, path)?;
    writeln!(
        out,
        "Exported {} personas to {}",
        document.entities.len(),
        written.display()
    )?;
    Ok(())
}

fn import(engine: &Engine, out: &mut impl Write, file: &Path) -> Result<(), CliError> {
    let document = read_export(file)?;
    let imported = EntityStore::from_export(document, engine.store().context_window())?;
    info!(file = %file.display(), personas = imported.len(), "Imported export");

    write_roster(out, &imported.list())?;
    match replay::compare(engine.store(), &imported) {
        ConsistencyResult::Consistent => writeln!(out, "Matches the live store.")?,
        ConsistencyResult::Divergent(ids) => {
            writeln!(out, "Differs from the live store: {}", ids.join(", "))?;
        }
    }
    Ok(())
}

fn force_evolve(engine: &mut Engine, out: &mut impl Write, entity: &str) -> Result<(), CliError> {
    let outcome = engine.force_evolve(entity)?;
    if outcome.sequence.is_none() {
        writeln!(
            out,
            "{} is already at the final stage ({})",
            outcome.state.entity_id, outcome.state.evolution_stage
        )?;
        return Ok(());
    }
    writeln!(
        out,
        "{} forced to stage {}",
        outcome.state.entity_id, outcome.state.evolution_stage
    )?;
    write_evolutions(out, &outcome)
}

fn verify(engine: &Engine, out: &mut impl Write) -> Result<(), CliError> {
    engine.verify()?;
    writeln!(
        out,
        "Consistent: {} events, {} personas",
        engine.log().len(),
        engine.store().len()
    )?;
    Ok(())
}

fn rebuild(engine: &mut Engine, out: &mut impl Write) -> Result<(), CliError> {
    let replayed = engine.rebuild()?;
    writeln!(out, "Rebuilt store from {replayed} events")?;
    Ok(())
}

fn history(
    engine: &Engine,
    out: &mut impl Write,
    entity: &str,
    limit: Option<usize>,
) -> Result<(), CliError> {
    if engine.get(entity).is_none() {
        return Err(MythosError::UnknownEntity {
            entity_id: entity.trim().to_owned(),
        }
        .into());
    }
    let events = engine.events_for(entity);
    let skip = limit.map_or(0, |n| events.len().saturating_sub(n));

    for event in events.iter().skip(skip) {
        let tags: Vec<&str> = event.tags.iter().map(String::as_str).collect();
        writeln!(
            out,
            "#{:<5} {} {:?} weight {} [{}] {}",
            event.sequence,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            event.emotional_weight,
            tags.join(", "),
            event.context
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn write_evolutions(out: &mut impl Write, outcome: &InvocationOutcome) -> Result<(), CliError> {
    for record in &outcome.evolutions {
        writeln!(out, "  evolved to stage {}", record.stage)?;
        for phrase in &record.new_phrases {
            writeln!(out, "    + phrase: {phrase}")?;
        }
        for developed in &record.new_traits {
            writeln!(out, "    + trait: {developed}")?;
        }
    }
    Ok(())
}

fn write_roster(out: &mut impl Write, roster: &[(String, PersonaSummary)]) -> Result<(), CliError> {
    for (id, summary) in roster {
        writeln!(
            out,
            "{id:<16} {:<10} stage {}  {:>6} invocations  {} traits  {} phrases",
            summary.archetype.as_str(),
            summary.evolution_stage,
            summary.invocation_count,
            summary.trait_count,
            summary.phrase_count
        )?;
    }
    Ok(())
}

fn write_suggestion(out: &mut impl Write, suggestion: &EmergenceSuggestion) -> Result<(), CliError> {
    writeln!(out, "Need: {}", suggestion.need)?;
    writeln!(out, "Suggested persona: {}", suggestion.suggested_name)?;
    writeln!(out, "Role: {}", suggestion.role)?;
    writeln!(out, "Voice: {}", suggestion.voice)?;
    writeln!(out, "Essence: {}", suggestion.essence)?;
    writeln!(out, "Constraints: {}", suggestion.constraints.join("; "))?;
    writeln!(out, "Uncovered: {}", suggestion.uncovered_terms.join(", "))?;
    match &suggestion.closest_match {
        Some(closest) => writeln!(
            out,
            "Closest match: {} (shares {})",
            closest.entity_id,
            closest.shared_terms.join(", ")
        )?,
        None => writeln!(out, "Closest match: none")?,
    }
    writeln!(out, "Rationale: {}", suggestion.rationale)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mythos_core::config::{EvolutionConfig, StorageConfig};

    use super::*;

    fn engine(dir: &Path) -> Engine {
        let config = StorageConfig {
            data_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        };
        let storage = FileStorage::open(&config).unwrap();
        MythosEngine::open(&EvolutionConfig::default(), storage).unwrap()
    }

    fn run_to_string(engine: &mut Engine, command: Command) -> Result<String, CliError> {
        let mut out = Vec::new();
        run(command, engine, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn invoke_command(entity: &str) -> Command {
        Command::Invoke {
            entity: entity.to_owned(),
            context: "checking the sequence".to_owned(),
            tags: vec!["work".to_owned()],
            weight: 8,
            seed: Box::default(),
        }
    }

    #[test]
    fn tenth_invocation_prints_evolution() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        for _ in 0..9 {
            run_to_string(&mut engine, invoke_command("ORION")).unwrap();
        }

        let text = run_to_string(&mut engine, invoke_command("ORION")).unwrap();
        assert!(text.starts_with("ORION invoked: 10 total, stage 1"));
        assert!(text.contains("evolved to stage 1"));
        assert!(text.contains("+ phrase:"));
    }

    #[test]
    fn register_without_role_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let result = run_to_string(
            &mut engine,
            Command::Register {
                entity: "Vesper".to_owned(),
                seed: Box::default(),
            },
        );
        assert!(matches!(result, Err(CliError::Usage { .. })));
    }

    #[test]
    fn list_is_ordered_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let text = run_to_string(&mut engine, Command::List { json: false }).unwrap();

        let ids: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split("  ").next())
            .map(str::trim)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn export_then_import_matches() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        run_to_string(&mut engine, invoke_command("Nova")).unwrap();

        let target = dir.path().join("presets.yaml");
        let text = run_to_string(
            &mut engine,
            Command::Export {
                out: Some(target.clone()),
                stdout: false,
            },
        )
        .unwrap();
        assert!(text.starts_with("Exported 5 personas"));

        let text = run_to_string(&mut engine, Command::Import { file: target }).unwrap();
        assert!(text.ends_with("Matches the live store.\n"));
    }

    #[test]
    fn history_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        for _ in 0..4 {
            run_to_string(&mut engine, invoke_command("Lent")).unwrap();
        }

        let text = run_to_string(
            &mut engine,
            Command::History {
                entity: "Lent".to_owned(),
                limit: Some(2),
            },
        )
        .unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("#3"));

        assert!(matches!(
            run_to_string(
                &mut engine,
                Command::History {
                    entity: "Nobody".to_owned(),
                    limit: None,
                },
            ),
            Err(CliError::Mythos {
                source: MythosError::UnknownEntity { .. }
            })
        ));
    }

    #[test]
    fn verify_and_rebuild_report_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        run_to_string(&mut engine, invoke_command("Redid")).unwrap();

        let text = run_to_string(&mut engine, Command::Verify).unwrap();
        assert_eq!(text, "Consistent: 1 events, 5 personas\n");
        let text = run_to_string(&mut engine, Command::Rebuild).unwrap();
        assert_eq!(text, "Rebuilt store from 1 events\n");
    }
}
