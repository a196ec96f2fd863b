//! File-backed storage area
//!
//! Each area is one JSON object stored at `<dir>/<area>.json`. Writes take an
//! exclusive lock on a sibling lock file and replace the data file through a
//! temp file + rename, so a CLI invocation and a running `serve` process never
//! interleave partial writes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    diff_remove, diff_set, dispatch, KeyValueStore, ListenerId, Listeners, StorageArea,
    StorageChange, StorageListener, StoreError,
};

/// Storage area persisted as a JSON file
pub struct FileStore {
    area: StorageArea,
    path: PathBuf,
    listeners: Mutex<Listeners>,
}

impl FileStore {
    /// Open (without creating) the file for `area` inside `dir`
    pub fn open(dir: &Path, area: StorageArea) -> Self {
        Self {
            area,
            path: dir.join(format!("{}.json", area.as_str())),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    /// Path of the backing JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_err(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str::<Map<String, Value>>(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn lock(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(parent, e))?;
        }
        let lock_path = self.path.with_extension("json.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| self.io_err(&lock_path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| self.io_err(&lock_path, e))?;
        Ok(lock_file)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| self.io_err(&temp_path, e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| self.io_err(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| self.io_err(&temp_path, e))?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| self.io_err(&self.path, e))?;
        Ok(())
    }

    /// Read-modify-write under the lock, then notify listeners
    fn modify<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>) -> std::collections::BTreeMap<String, super::ValueChange>,
    {
        let changes = {
            // Released when dropped at the end of this block
            let _lock = self.lock()?;
            let mut map = self.read_map()?;
            let changes = f(&mut map);
            if !changes.is_empty() {
                self.write_map(&map)?;
                debug!(
                    area = %self.area,
                    keys = changes.len(),
                    path = %self.path.display(),
                    "storage area written"
                );
            }
            changes
        };
        dispatch(
            &self.listeners,
            StorageChange {
                area: self.area,
                changes,
            },
        );
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn area(&self) -> StorageArea {
        self.area
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_map()?.remove(key))
    }

    fn get_all(&self) -> Result<Map<String, Value>, StoreError> {
        self.read_map()
    }

    fn set(&self, items: Map<String, Value>) -> Result<(), StoreError> {
        self.modify(|map| {
            let changes = diff_set(map, &items);
            for (key, value) in items {
                map.insert(key, value);
            }
            changes
        })
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.modify(|map| {
            let changes = diff_remove(map, keys);
            for key in keys {
                map.remove(*key);
            }
            changes
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.modify(|map| {
            let keys: Vec<String> = map.keys().cloned().collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let changes = diff_remove(map, &key_refs);
            map.clear();
            changes
        })
    }

    fn add_listener(&self, listener: StorageListener) -> ListenerId {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::set_one;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), StorageArea::Sync);
        assert_eq!(store.get("settings").unwrap(), None);
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), StorageArea::Sync);
        set_one(&store, "settings", json!({"debug": true})).unwrap();

        assert!(dir.path().join("sync.json").exists());

        let reopened = FileStore::open(dir.path(), StorageArea::Sync);
        assert_eq!(reopened.get("settings").unwrap(), Some(json!({"debug": true})));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("local.json"), "[1, 2").unwrap();
        let store = FileStore::open(dir.path(), StorageArea::Local);
        let err = store.get("x").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_notifies_listeners_after_write() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), StorageArea::Local);
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        store.add_listener(Arc::new(move |_change: &StorageChange| {
            *counter.lock().unwrap() += 1;
        }));

        set_one(&store, "k", json!(1)).unwrap();
        set_one(&store, "k", json!(1)).unwrap();
        store.remove(&["k"]).unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }
}
