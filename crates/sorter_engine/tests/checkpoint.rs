use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sorter_core::CheckpointState;
use sorter_engine::{CheckpointError, CheckpointStore};
use tempfile::tempdir;

#[test]
fn missing_file_loads_empty_state() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let state = store.load().unwrap();
    assert_eq!(state.settled_count(), 0);
    assert!(store.info().unwrap().is_none());
}

#[test]
fn save_then_load_round_trips_and_uses_documented_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    let store = CheckpointStore::new(&path);

    let mut state = CheckpointState::new();
    state.mark_processed("a.md");
    state.mark_processed("b.md");
    state.mark_failed("c.md");
    let saved_at = store.save(&state).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded, state);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["processed_files"], serde_json::json!(["a.md", "b.md"]));
    assert_eq!(raw["failed_files"], serde_json::json!(["c.md"]));
    assert_eq!(raw["total_processed"], 3);
    assert!(raw["last_save_time"].is_string());

    let info = store.info().unwrap().unwrap();
    assert_eq!(info.processed, 2);
    assert_eq!(info.failed, 1);
    assert_eq!(info.saved_at, Some(saved_at));
}

#[test]
fn corrupt_file_is_reported_not_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "{ not json").unwrap();
    let store = CheckpointStore::new(&path);

    assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn overlapping_ids_on_disk_resolve_to_processed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(
        &path,
        r#"{"processed_files":["a.md"],"failed_files":["a.md","b.md"]}"#,
    )
    .unwrap();
    let state = CheckpointStore::new(&path).load().unwrap();
    assert!(state.processed().contains("a.md"));
    assert_eq!(state.failed().len(), 1);
    assert!(state.is_disjoint());
}

#[test]
fn clear_removes_the_file_and_tolerates_absence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    let store = CheckpointStore::new(&path);
    store.save(&CheckpointState::new()).unwrap();
    assert!(path.exists());

    store.clear().unwrap();
    assert!(!path.exists());
    store.clear().unwrap();
}

#[test]
fn concurrent_saves_leave_a_valid_document() {
    let dir = tempdir().unwrap();
    let store = Arc::new(CheckpointStore::new(dir.path().join("checkpoint.json")));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for round in 0..10 {
                    let mut state = CheckpointState::new();
                    for n in 0..=round {
                        state.mark_processed(&format!("w{worker}-{n}.md"));
                    }
                    store.save(&state).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state = store.load().unwrap();
    assert_eq!(state.processed().len(), 10);
    assert!(state.failed().is_empty());
}
