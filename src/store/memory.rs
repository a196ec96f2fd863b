//! In-process storage area

use std::sync::Mutex;

use serde_json::{Map, Value};

use super::{
    diff_remove, diff_set, dispatch, KeyValueStore, ListenerId, Listeners, StorageArea,
    StorageChange, StorageListener, StoreError,
};

/// Storage area kept in memory.
///
/// Several settings managers sharing one `Arc<MemoryStore>` behave like
/// several browser contexts sharing the synchronized area.
pub struct MemoryStore {
    area: StorageArea,
    data: Mutex<Map<String, Value>>,
    listeners: Mutex<Listeners>,
}

impl MemoryStore {
    pub fn new(area: StorageArea) -> Self {
        Self {
            area,
            data: Mutex::new(Map::new()),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    /// Create a store pre-populated with `items` (no change events)
    pub fn with_items(area: StorageArea, items: Map<String, Value>) -> Self {
        let store = Self::new(area);
        *store.data.lock().unwrap_or_else(|e| e.into_inner()) = items;
        store
    }

    fn data(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn area(&self) -> StorageArea {
        self.area
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data().get(key).cloned())
    }

    fn get_all(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.data().clone())
    }

    fn set(&self, items: Map<String, Value>) -> Result<(), StoreError> {
        let changes = {
            let mut data = self.data();
            let changes = diff_set(&data, &items);
            for (key, value) in items {
                data.insert(key, value);
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

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let changes = {
            let mut data = self.data();
            let changes = diff_remove(&data, keys);
            for key in keys {
                data.remove(*key);
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

    fn clear(&self) -> Result<(), StoreError> {
        let changes = {
            let mut data = self.data();
            let keys: Vec<String> = data.keys().cloned().collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let changes = diff_remove(&data, &key_refs);
            data.clear();
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

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new(StorageArea::Sync);
        set_one(&store, "settings", json!({"language": "de"})).unwrap();
        assert_eq!(store.get("settings").unwrap(), Some(json!({"language": "de"})));

        store.remove(&["settings"]).unwrap();
        assert_eq!(store.get("settings").unwrap(), None);
    }

    #[test]
    fn test_listeners_receive_changes_once_per_write() {
        let store = MemoryStore::new(StorageArea::Sync);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.add_listener(Arc::new(move |change: &StorageChange| {
            sink.lock().unwrap().push(change.clone());
        }));

        set_one(&store, "a", json!(1)).unwrap();
        // Same value again: nothing changed, no event
        set_one(&store, "a", json!(1)).unwrap();
        store.clear().unwrap();

        assert!(store.remove_listener(id));
        set_one(&store, "b", json!(2)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].area, StorageArea::Sync);
        assert_eq!(seen[0].get("a").unwrap().new_value, Some(json!(1)));
        assert_eq!(seen[1].get("a").unwrap().new_value, None);
    }

    #[test]
    fn test_listener_may_write_back() {
        let store = Arc::new(MemoryStore::new(StorageArea::Local));
        let inner = Arc::clone(&store);
        store.add_listener(Arc::new(move |change: &StorageChange| {
            if change.get("ping").is_some() {
                set_one(inner.as_ref(), "pong", json!(true)).unwrap();
            }
        }));

        set_one(store.as_ref(), "ping", json!(1)).unwrap();
        assert_eq!(store.get("pong").unwrap(), Some(json!(true)));
    }
}
