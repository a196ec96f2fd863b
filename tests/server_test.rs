//! Integration tests for the settings API routes over a file store

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use betterhub::registry::FeatureRegistry;
use betterhub::server::{route, ApiState};
use betterhub::settings::SettingsManager;
use betterhub::store::{FileStore, StorageArea};

fn state(dir: &TempDir) -> ApiState {
    let manager = SettingsManager::new(Arc::new(FileStore::open(dir.path(), StorageArea::Sync)));
    ApiState::new(manager, FeatureRegistry::with_builtin())
}

#[test]
fn test_patch_is_persisted() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let response = route(
        &state(&dir),
        "PATCH",
        "/settings",
        r#"{"aliasing":{"users":[{"original":"octocat","alias":"Octo","enabled":true}]}}"#,
    );
    assert_eq!(response.status, 200);

    // A fresh state reads the same file
    let response = route(&state(&dir), "GET", "/settings", "");
    assert_eq!(
        response.body["settings"]["aliasing"]["users"][0]["alias"],
        json!("Octo")
    );
}

#[test]
fn test_lenient_patch_keeps_good_fields() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let response = route(
        &state(&dir),
        "PATCH",
        "/settings",
        r#"{"theme":"purple","language":"ja"}"#,
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.body["settings"]["theme"], json!("light"));
    assert_eq!(response.body["settings"]["language"], json!("ja"));
}

#[test]
fn test_corrupt_storage_is_a_server_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("sync.json"), "[]").unwrap();
    let response = route(&state(&dir), "GET", "/settings", "");
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], json!("storage"));
}
