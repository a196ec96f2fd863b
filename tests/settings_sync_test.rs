//! Integration tests for settings persistence and cross-context sync

use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use betterhub::settings::{
    AliasItem, AliasKind, AliasingPatch, EnableMode, SettingsError, SettingsManager, SettingsPatch,
    Theme, SETTINGS_KEY,
};
use betterhub::store::{set_one, FileStore, KeyValueStore, MemoryStore, StorageArea, StoreError};

fn file_manager(dir: &TempDir) -> SettingsManager {
    SettingsManager::new(Arc::new(FileStore::open(dir.path(), StorageArea::Sync)))
}

#[test]
fn test_settings_survive_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    {
        let manager = file_manager(&dir);
        manager.initialize().unwrap();
        let mut patch = SettingsPatch::default();
        patch.theme = Some(Theme::Dark);
        patch.allowlist = Some(vec!["rust-lang".into()]);
        manager.update_settings(patch).unwrap();
    }

    let reopened = file_manager(&dir);
    let settings = reopened.initialize().unwrap();
    assert_eq!(settings.theme, Theme::Dark);
    assert_eq!(settings.allowlist, vec!["rust-lang".to_string()]);
    assert!(dir.path().join("sync.json").exists());
}

#[test]
fn test_legacy_document_is_migrated_on_disk() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::open(dir.path(), StorageArea::Sync);
    set_one(
        &store,
        SETTINGS_KEY,
        json!({ "enabled": false, "language": "de", "features": { "copy-path": false } }),
    )
    .unwrap();

    let manager = SettingsManager::new(Arc::new(store));
    let settings = manager.initialize().unwrap();
    assert_eq!(settings.enable_mode, EnableMode::Off);
    assert_eq!(settings.language, "de");
    assert!(!settings.feature_enabled("copy-path"));
    assert!(settings.feature_enabled("aliasing"));

    let raw = manager.store().get(SETTINGS_KEY).unwrap().unwrap();
    assert!(raw.get("enabled").is_none());
    assert_eq!(raw["enableMode"], json!("off"));
}

#[test]
fn test_second_context_sees_updates() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new(StorageArea::Sync));
    let options = SettingsManager::new(store.clone());
    let page = SettingsManager::new(store);
    options.initialize().unwrap();
    page.get_settings().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = page
        .subscribe(move |settings| {
            sink.lock().unwrap().push(settings.aliasing.users.len());
            Ok(())
        })
        .unwrap();

    options
        .update_settings(
            AliasingPatch::with_list(AliasKind::User, vec![AliasItem::new("octocat", "Octo")])
                .into(),
        )
        .unwrap();

    // Immediate call on subscribe, then the change from the other context
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    assert_eq!(page.cached().unwrap().aliasing.users[0].alias, "Octo");
}

#[test]
fn test_export_import_between_stores() {
    let source_dir = TempDir::new().expect("Failed to create temp dir");
    let source = file_manager(&source_dir);
    let mut patch = SettingsPatch::default();
    patch.language = Some("fr".into());
    source.update_settings(patch).unwrap();
    let file = source.export_settings().unwrap().to_json_pretty().unwrap();

    let target_dir = TempDir::new().expect("Failed to create temp dir");
    let target = file_manager(&target_dir);
    let imported = target.import_settings(&file).unwrap();
    assert_eq!(imported.language, "fr");

    // A rejected file leaves the target untouched
    assert!(target.import_settings(r#"{"version":"1.0.0","settings":[]}"#).is_err());
    assert_eq!(file_manager(&target_dir).get_settings().unwrap().language, "fr");
}

#[test]
fn test_corrupt_store_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("sync.json"), "{ not json").unwrap();
    let manager = file_manager(&dir);
    let err = manager.initialize().unwrap_err();
    assert!(
        matches!(err, SettingsError::Store(StoreError::Corrupt { .. })),
        "got: {}",
        err
    );
    // Never silently replaced
    assert_eq!(
        std::fs::read_to_string(dir.path().join("sync.json")).unwrap(),
        "{ not json"
    );
}
