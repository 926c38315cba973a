//! Integration test: every backend honours the same log store contract
//! when driven through `dyn LogStore`.

use std::sync::Arc;

use atomlog_core::{LogStore, LogStoreConfig, LogStoreError, ObjectStoreClient};
use atomlog_storage::{ConditionalLogStore, LocalStore, MemoryStore, ObjectStoreBackend};
use object_store::memory::InMemory;
use tempfile::TempDir;

fn backends() -> (Vec<(&'static str, Arc<dyn ObjectStoreClient>)>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let backends: Vec<(&'static str, Arc<dyn ObjectStoreClient>)> = vec![
        ("memory", Arc::new(MemoryStore::new())),
        ("local", Arc::new(LocalStore::new(tmp.path()).unwrap())),
        (
            "object_store",
            Arc::new(ObjectStoreBackend::new(Arc::new(InMemory::new()), "").unwrap()),
        ),
    ];
    (backends, tmp)
}

fn log_store(client: Arc<dyn ObjectStoreClient>) -> Box<dyn LogStore> {
    let config = LogStoreConfig::new("test://").with_atomic_writes(true);
    Box::new(ConditionalLogStore::try_new(client, &config).unwrap())
}

fn write(store: &dyn LogStore, key: &str, lines: &[&str], overwrite: bool) -> atomlog_core::Result<u64> {
    let mut actions = lines.iter().map(|l| l.to_string());
    store.write(key, &mut actions, overwrite)
}

#[test]
fn test_fresh_write_stores_terminated_lines() {
    let (backends, _tmp) = backends();
    for (name, client) in backends {
        let store = log_store(client.clone());

        let written = write(store.as_ref(), "t/_log/0.json", &["a", "b"], false).unwrap();

        assert_eq!(written, 4, "{name}");
        assert!(client.exists("t/_log/0.json").unwrap(), "{name}");
        assert_eq!(&client.get("t/_log/0.json").unwrap()[..], b"a\nb\n", "{name}");
    }
}

#[test]
fn test_exclusive_write_to_existing_key_does_not_mutate() {
    let (backends, _tmp) = backends();
    for (name, client) in backends {
        let store = log_store(client.clone());
        write(store.as_ref(), "k", &["original"], false).unwrap();

        let err = write(store.as_ref(), "k", &["replacement"], false).unwrap_err();

        assert!(matches!(err, LogStoreError::AlreadyExists { .. }), "{name}: {err:?}");
        assert_eq!(store.read("k").unwrap(), vec!["original"], "{name}");
    }
}

#[test]
fn test_overwrite_always_succeeds() {
    let (backends, _tmp) = backends();
    for (name, client) in backends {
        let store = log_store(client);
        write(store.as_ref(), "absent", &["x"], true).unwrap();
        write(store.as_ref(), "absent", &["y", "z"], true).unwrap();
        assert_eq!(store.read("absent").unwrap(), vec!["y", "z"], "{name}");
    }
}

#[test]
fn test_hooks() {
    let (backends, _tmp) = backends();
    for (name, client) in backends {
        let store = log_store(client);
        write(store.as_ref(), "k", &["a"], false).unwrap();
        store.invalidate_cache();
        assert!(!store.is_partial_write_visible("k"), "{name}");
        assert_eq!(store.read("k").unwrap(), vec!["a"], "{name}");
    }
}

#[test]
fn test_list_from_and_missing_reads() {
    let (backends, _tmp) = backends();
    for (name, client) in backends {
        let store = log_store(client);
        for version in 0..4 {
            write(store.as_ref(), &format!("t/_log/{version:05}.json"), &["{}"], false).unwrap();
        }
        write(store.as_ref(), "t/_log/_checkpoint/00002.json", &["{}"], false).unwrap();

        assert_eq!(
            store.list_from("t/_log/00002.json").unwrap(),
            vec!["t/_log/00002.json", "t/_log/00003.json"],
            "{name}"
        );
        assert!(
            matches!(store.read("t/_log/00009.json"), Err(LogStoreError::NotFound { .. })),
            "{name}"
        );
    }
}
