//! Tests for snapshot persistence and the surface fallback path


use chrono::{Duration, Utc};
use element_hunter::error::HunterError;
use element_hunter::hunter::{query_with_fallback, Command, Reply};
use element_hunter::storage::{JsonFileStore, MemoryStore, PersistedSnapshot, SnapshotStore};
use fixtures::{click_on, engine_with, engine_with_store, shop_page, PAGE_ORIGIN};
use std::path::PathBuf;
use std::sync::Arc;

/// Helper to create temp directory for test artifacts
fn create_temp_test_dir(test_name: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir()
        .join("element-hunter-storage-tests")
        .join(format!("{}-{}", test_name, std::process::id()));
    let _ = std::fs::remove_dir_all(&temp_dir);
    temp_dir
}

fn snapshot_with_counter(element_counter: u32) -> PersistedSnapshot {
    PersistedSnapshot {
        is_active: false,
        elements: Vec::new(),
        element_counter,
        capture_and_click: false,
        url: PAGE_ORIGIN.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    }
}

#[test]
fn test_json_file_store_survives_restart() -> anyhow::Result<()> {
    let path = create_temp_test_dir("restart").join("nested").join("snapshot.json");
    let page = shop_page();

    {
        let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&path));
        let mut engine = engine_with_store(store);
        engine.toggle();
        click_on(&mut engine, &page.doc, page.submit_button);
    }
    assert!(path.exists());

    let store = JsonFileStore::new(&path);
    let saved = store.load("elementHunterData")?.expect("snapshot on disk");
    assert!(saved.is_active);
    assert_eq!(saved.url, PAGE_ORIGIN);
    assert_eq!(saved.elements[0].selector, "#submit-btn");
    assert_eq!(store.load("someOtherKey")?, None);

    let mut reloaded = engine_with_store(Arc::new(store));
    assert!(reloaded.restore_at(Utc::now()));
    assert_eq!(reloaded.elements().len(), 1);
    println!("✅ Snapshot persisted at {}", path.display());
    Ok(())
}

#[test]
fn test_missing_file_loads_nothing() -> anyhow::Result<()> {
    let path = create_temp_test_dir("missing").join("snapshot.json");
    let store = JsonFileStore::new(&path);
    assert_eq!(store.load("elementHunterData")?, None);
    Ok(())
}

#[test]
fn test_corrupt_file_is_an_error() -> anyhow::Result<()> {
    let dir = create_temp_test_dir("corrupt");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("snapshot.json");
    std::fs::write(&path, "[1, 2, 3]")?;

    let result = JsonFileStore::new(&path).load("elementHunterData");
    assert!(matches!(result, Err(HunterError::Storage(_))));
    Ok(())
}

#[test]
fn test_save_replaces_corrupt_file() -> anyhow::Result<()> {
    let dir = create_temp_test_dir("truncated");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("snapshot.json");
    std::fs::write(&path, r#"{"elementHunterData": {"trunc"#)?;

    let store = JsonFileStore::new(&path);
    store.save("elementHunterData", &snapshot_with_counter(7))?;

    let saved = store.load("elementHunterData")?.expect("snapshot after save");
    assert_eq!(saved.element_counter, 7);
    println!("✅ Truncated snapshot file replaced on save");
    Ok(())
}

#[tokio::test]
async fn test_saves_in_runtime_keep_latest() -> anyhow::Result<()> {
    let path = create_temp_test_dir("in-runtime").join("snapshot.json");
    let store = JsonFileStore::new(&path);

    for counter in 1..=5 {
        store.save("elementHunterData", &snapshot_with_counter(counter))?;
    }
    store.flush().await;

    let saved = store.load("elementHunterData")?.expect("snapshot after flush");
    assert_eq!(saved.element_counter, 5);
    println!("✅ Background writes settle on the newest snapshot");
    Ok(())
}

#[test]
fn test_fallback_answers_queries_from_snapshot() -> anyhow::Result<()> {
    let page = shop_page();
    let store = MemoryStore::new();
    {
        let mut engine = engine_with(&store);
        engine.toggle();
        engine.set_capture_mode(true);
        click_on(&mut engine, &page.doc, page.login_link);
    }
    let ttl = Duration::hours(1);
    let now = Utc::now();

    let reply = query_with_fallback(None, &store, "elementHunterData", ttl, Command::GetStatus, now)?;
    assert_eq!(reply, Reply::Status { is_active: true });

    let reply = query_with_fallback(None, &store, "elementHunterData", ttl, Command::GetMode, now)?;
    assert_eq!(reply, Reply::Mode { capture_and_click: true });

    match query_with_fallback(None, &store, "elementHunterData", ttl, Command::GetElements, now)? {
        Reply::Elements { elements } => assert_eq!(elements[0].name, "NAV_LOGIN_LINK"),
        other => panic!("unexpected reply {:?}", other),
    }

    let later = now + Duration::hours(2);
    let reply = query_with_fallback(None, &store, "elementHunterData", ttl, Command::GetElements, later)?;
    assert_eq!(reply, Reply::Elements { elements: vec![] });

    let result = query_with_fallback(None, &store, "elementHunterData", ttl, Command::Toggle, now);
    assert!(matches!(result, Err(HunterError::EngineNotLoaded)));
    println!("✅ Surface fallback reads the persisted session");
    Ok(())
}

#[test]
fn test_fallback_prefers_live_engine() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut engine = engine_with(&store);

    let reply = query_with_fallback(
        Some(&mut engine),
        &store,
        "elementHunterData",
        Duration::hours(1),
        Command::Toggle,
        Utc::now(),
    )?;
    assert_eq!(reply, Reply::Toggled { status: "toggled", active: true });
    assert!(engine.is_active());
    Ok(())
}
