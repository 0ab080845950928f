//! The engine over real files: durability, recovery and export.

#![allow(clippy::unwrap_used)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use mythos_core::config::{EvolutionConfig, StorageConfig};
use mythos_core::{EntityStore, InvocationRequest, MythosEngine, MythosError};
use mythos_db::{FileStorage, read_export};

fn storage_config(dir: &Path) -> StorageConfig {
    StorageConfig {
        data_dir: dir.join("data"),
        ..StorageConfig::default()
    }
}

fn open(config: &StorageConfig) -> MythosEngine<FileStorage> {
    let storage = FileStorage::open(config).unwrap();
    MythosEngine::open(&EvolutionConfig::default(), storage).unwrap()
}

fn invoke_n(engine: &mut MythosEngine<FileStorage>, entity: &str, n: usize) {
    for i in 0..n {
        engine
            .invoke(
                InvocationRequest::new(entity)
                    .context(format!("{entity} review {i}"))
                    .tag("review")
                    .weight(6),
            )
            .unwrap();
    }
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "ORION", 12);
    let expected = engine.store().clone();
    engine.close().unwrap();

    let reopened = open(&config);
    assert_eq!(reopened.store(), &expected);
    assert_eq!(reopened.log().len(), 12);
    assert_eq!(reopened.get("ORION").unwrap().evolution_stage, 1);
}

#[test]
fn deleted_snapshot_is_rebuilt_from_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "Redid", 26);
    let expected = engine.store().clone();
    engine.close().unwrap();

    std::fs::remove_file(config.snapshot_path()).unwrap();

    let reopened = open(&config);
    assert_eq!(reopened.store(), &expected);
    assert!(config.snapshot_path().exists());
}

#[test]
fn corrupt_snapshot_is_replaced_by_replay() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "Nova", 5);
    let expected = engine.store().clone();
    engine.close().unwrap();

    std::fs::write(config.snapshot_path(), "{ not a snapshot").unwrap();

    let reopened = open(&config);
    assert_eq!(reopened.store(), &expected);
}

#[test]
fn torn_append_survives_later_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "Nova", 1);
    engine.close().unwrap();

    let mut file = OpenOptions::new()
        .append(true)
        .open(config.events_path())
        .unwrap();
    file.write_all(b"{\"id\":\"0190").unwrap();
    drop(file);

    let mut engine = open(&config);
    assert_eq!(engine.log().len(), 1);
    invoke_n(&mut engine, "Nova", 1);
    engine.close().unwrap();

    let reopened = open(&config);
    assert_eq!(reopened.log().len(), 2);
    assert_eq!(reopened.get("Nova").unwrap().invocation_count, 2);
    assert!(reopened.verify().is_ok());
}

#[test]
fn corrupt_log_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "Lent", 3);
    engine.close().unwrap();

    let raw = std::fs::read_to_string(config.events_path()).unwrap();
    let broken = raw.replacen("\"sequence\"", "\"sequense\"", 1);
    std::fs::write(config.events_path(), broken).unwrap();

    let storage = FileStorage::open(&config).unwrap();
    assert!(matches!(
        MythosEngine::open(&EvolutionConfig::default(), storage),
        Err(MythosError::Persistence { .. })
    ));
}

#[test]
fn export_file_imports_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage_config(dir.path());

    let mut engine = open(&config);
    invoke_n(&mut engine, "The Fuckface", 11);
    let written = engine
        .storage()
        .write_export(&engine.export(), None)
        .unwrap();
    assert_eq!(written, config.export_path());

    let document = read_export(&written).unwrap();
    let imported = EntityStore::from_export(document, 20).unwrap();
    assert_eq!(imported.get("The Fuckface"), engine.get("The Fuckface"));
}
