//! Local Backend Tests
//!
//! The filesystem backend behind a real directory: key layout on disk,
//! persistence across engine instances, and config loading.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use kek::document::attributes;
use kek::space::{Kekspace, SpaceConfig};
use kek::storage::{LocalBackend, StorageBackend, StorageError};
use kek::{DocQuery, DocumentEngine, KekConfig, QueryEngine};

// =============================================================================
// Helper Functions
// =============================================================================

fn init_store(dir: &TempDir) -> KekConfig {
    let config = KekConfig::new(dir.path().join("data"));
    let backend = LocalBackend::new(config.data_dir.clone());
    Kekspace::create(&backend, SpaceConfig::default()).unwrap();
    config
}

// =============================================================================
// Backend
// =============================================================================

#[test]
fn test_keys_map_to_files() {
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path().to_path_buf());

    backend.write("f/color/red/dd1", b"").unwrap();
    assert!(dir.path().join("f").join("color").join("red").join("dd1").is_file());

    let listed = backend.list("f/color").unwrap();
    assert_eq!(listed, vec!["f/color/red".to_string()]);
    assert!(backend.list("f/absent").unwrap().is_empty());
}

#[test]
fn test_missing_and_invalid_keys() {
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path().to_path_buf());

    assert!(matches!(backend.read("d/none"), Err(StorageError::NotFound(_))));
    assert!(matches!(backend.delete("d/none"), Err(StorageError::NotFound(_))));
    assert!(!backend.exists("d/none").unwrap());
    assert!(matches!(
        backend.write("d/../escape", b"x"),
        Err(StorageError::InvalidKey(_))
    ));
}

// =============================================================================
// Engine over the filesystem
// =============================================================================

/// Documents written by one engine are visible to a fresh one.
#[tokio::test]
async fn test_documents_persist_across_engines() {
    let dir = TempDir::new().unwrap();
    let config = init_store(&dir);

    let id = {
        let engine = DocumentEngine::open(&config);
        let doc = engine
            .create("a", attributes([("color", "red")]))
            .await
            .unwrap();
        engine
            .update(&doc.id, attributes([("size", "m")]), true)
            .await
            .unwrap();
        doc.id
    };

    let engine = DocumentEngine::open(&config);
    let chain = engine.verify(&id).await.unwrap();
    assert_eq!(chain.len(), 2);

    let queries = QueryEngine::new(engine.clone(), &config);
    let found = queries
        .find(&DocQuery::new().where_eq("size", "m").limit(5))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
}

/// Field names and values containing `/` stay inside their segment.
#[tokio::test]
async fn test_slashes_in_attributes() {
    let dir = TempDir::new().unwrap();
    let config = init_store(&dir);
    let backend: Arc<dyn StorageBackend> = Arc::new(LocalBackend::new(config.data_dir.clone()));
    let engine = DocumentEngine::new(backend, &config);

    let doc = engine
        .create("a", attributes([("path/segment", "a/b")]))
        .await
        .unwrap();

    let found = engine
        .index()
        .find_by_equal("path/segment", "a/b")
        .await
        .unwrap();
    assert!(found.contains(&doc.id));

    engine.delete(&doc.id).await.unwrap();
    assert!(engine
        .index()
        .find_by_equal("path/segment", "a/b")
        .await
        .unwrap()
        .is_empty());
}

/// Values too long for a file name still index, match and clean up.
#[tokio::test]
async fn test_long_values_on_disk() {
    let dir = TempDir::new().unwrap();
    let config = init_store(&dir);
    let engine = DocumentEngine::open(&config);
    let queries = QueryEngine::new(engine.clone(), &config);
    let bio = "x".repeat(300);

    let doc = engine
        .create("a", attributes([("bio", bio.as_str())]))
        .await
        .unwrap();
    let found = queries
        .find(&DocQuery::new().where_eq("bio", &bio).limit(5))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, doc.id);

    engine
        .update(&doc.id, attributes([("bio", "short")]), true)
        .await
        .unwrap();
    assert!(queries
        .find(&DocQuery::new().where_eq("bio", &bio).limit(5))
        .await
        .unwrap()
        .is_empty());

    let report = engine.repair(&doc.id).await.unwrap();
    assert_eq!(report.stale_markers_removed, 0);
    engine.delete(&doc.id).await.unwrap();
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_file_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kek.json");
    fs::write(&path, r#"{"data_dir": "/var/lib/kek"}"#).unwrap();

    let config = KekConfig::load(&path).unwrap();
    assert_eq!(config.default_limit, 20);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_config_rejects_zero_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kek.json");
    fs::write(&path, r#"{"data_dir": "d", "default_limit": 0}"#).unwrap();

    let err = KekConfig::load(&path).unwrap_err();
    assert_eq!(err.code(), "KEK_CONFIG_ERROR");
}
