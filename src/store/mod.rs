//! Key-value storage areas
//!
//! A thin adapter over the host's storage areas. The `sync` area holds the
//! single `"settings"` document and is shared by every context (options page,
//! background worker, page tabs). The `local` area is unsynced and holds
//! ephemeral per-item counters for the read-comments tracker.
//!
//! Every write that changes at least one key is reported to the registered
//! listeners as one [`StorageChange`], after the write has been persisted.

mod comments;
mod file;
mod memory;

pub use comments::{comment_count_key, CommentCounts};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage area a store instance represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Synchronized across contexts, small quota
    Sync,
    /// Unsynced, larger quota
    Local,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }
}

impl std::fmt::Display for StorageArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Old and new value of one key
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Change notification delivered to store listeners
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub area: StorageArea,
    pub changes: BTreeMap<String, ValueChange>,
}

impl StorageChange {
    pub fn get(&self, key: &str) -> Option<&ValueChange> {
        self.changes.get(key)
    }
}

/// Handle returned by [`KeyValueStore::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type StorageListener = Arc<dyn Fn(&StorageChange) + Send + Sync>;

/// Errors raised by storage I/O
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize storage contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A host storage area
///
/// Failures are reported to the caller; there is no retry.
pub trait KeyValueStore: Send + Sync {
    /// The area this store represents
    fn area(&self) -> StorageArea;

    /// Read a single key
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Read every key in the area
    fn get_all(&self) -> Result<Map<String, Value>, StoreError>;

    /// Write several keys at once
    fn set(&self, items: Map<String, Value>) -> Result<(), StoreError>;

    /// Remove keys; missing keys are ignored
    fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Remove every key in the area
    fn clear(&self) -> Result<(), StoreError>;

    /// Register a change listener
    fn add_listener(&self, listener: StorageListener) -> ListenerId;

    /// Remove a change listener; returns false if it was not registered
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Convenience for writing one key
pub fn set_one(store: &dyn KeyValueStore, key: &str, value: Value) -> Result<(), StoreError> {
    let mut items = Map::new();
    items.insert(key.to_string(), value);
    store.set(items)
}

/// Listener bookkeeping shared by the store implementations
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, StorageListener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: StorageListener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn snapshot(&self) -> Vec<StorageListener> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

/// Deliver a change to a snapshot of the listeners.
///
/// The listener lock is released before any callback runs, so listeners may
/// read from or write to the store again.
pub(crate) fn dispatch(listeners: &Mutex<Listeners>, change: StorageChange) {
    if change.changes.is_empty() {
        return;
    }
    let snapshot = listeners
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .snapshot();
    for listener in snapshot {
        listener(&change);
    }
}

/// Compute the change set produced by writing `items` over `current`
pub(crate) fn diff_set(
    current: &Map<String, Value>,
    items: &Map<String, Value>,
) -> BTreeMap<String, ValueChange> {
    items
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(*value))
        .map(|(key, value)| {
            (
                key.clone(),
                ValueChange {
                    old_value: current.get(key).cloned(),
                    new_value: Some(value.clone()),
                },
            )
        })
        .collect()
}

/// Compute the change set produced by removing `keys` from `current`
pub(crate) fn diff_remove(
    current: &Map<String, Value>,
    keys: &[&str],
) -> BTreeMap<String, ValueChange> {
    keys.iter()
        .filter_map(|key| {
            current.get(*key).map(|old| {
                (
                    key.to_string(),
                    ValueChange {
                        old_value: Some(old.clone()),
                        new_value: None,
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_set_skips_unchanged_keys() {
        let mut current = Map::new();
        current.insert("a".into(), json!(1));
        current.insert("b".into(), json!(2));

        let mut items = Map::new();
        items.insert("a".into(), json!(1));
        items.insert("b".into(), json!(3));
        items.insert("c".into(), json!(4));

        let changes = diff_set(&current, &items);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["b"].old_value, Some(json!(2)));
        assert_eq!(changes["c"].old_value, None);
        assert_eq!(changes["c"].new_value, Some(json!(4)));
    }

    #[test]
    fn test_diff_remove_ignores_missing() {
        let mut current = Map::new();
        current.insert("a".into(), json!("x"));

        let changes = diff_remove(&current, &["a", "missing"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["a"].new_value, None);
    }

    #[test]
    fn test_area_names() {
        assert_eq!(StorageArea::Sync.to_string(), "sync");
        assert_eq!(StorageArea::Local.as_str(), "local");
    }
}
