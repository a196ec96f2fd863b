//! Per-context owner of the cached settings document

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::merge::find_duplicate;
use super::migrate::merge_with_defaults;
use super::{Settings, SettingsError, SettingsPatch};
use crate::store::{KeyValueStore, ListenerId, StorageArea, StorageChange};

/// Storage key of the settings document in the sync area
pub const SETTINGS_KEY: &str = "settings";

/// Callback invoked with every new settings document
pub type SettingsCallback = Arc<dyn Fn(&Settings) -> anyhow::Result<()> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    cache: Mutex<Option<Settings>>,
    subscribers: Mutex<Vec<(u64, SettingsCallback)>>,
    next_subscriber: AtomicU64,
    /// Serialises read-merge-persist within this context
    write_lock: Mutex<()>,
    /// Document this context is writing, so its own storage echo is skipped
    in_flight: Mutex<Option<Value>>,
    /// Latest document from another context, delivered once `write_lock` is free
    pending: Mutex<Option<Settings>>,
    listener: Mutex<Option<ListenerId>>,
}

impl Inner {
    fn load(&self) -> Result<Settings, SettingsError> {
        if let Some(cached) = lock(&self.cache).as_ref() {
            return Ok(cached.clone());
        }
        let stored = self.store.get(SETTINGS_KEY)?;
        let settings = merge_with_defaults(stored.as_ref());
        Ok(lock(&self.cache).get_or_insert(settings).clone())
    }

    /// Cache first, then storage; the cache is rolled back when the write fails
    fn persist(&self, previous: Option<Settings>, next: &Settings) -> Result<(), SettingsError> {
        *lock(&self.cache) = Some(next.clone());

        let value = next.to_value()?;
        *lock(&self.in_flight) = Some(value.clone());
        let mut items = Map::new();
        items.insert(SETTINGS_KEY.to_string(), value);
        let result = self.store.set(items);
        *lock(&self.in_flight) = None;
        if let Err(e) = result {
            let mut cache = lock(&self.cache);
            if cache.as_ref() == Some(next) {
                *cache = previous;
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn notify(&self, settings: &Settings) {
        let subscribers: Vec<(u64, SettingsCallback)> = lock(&self.subscribers).clone();
        for (id, callback) in subscribers {
            invoke(id, &callback, settings);
        }
    }

    fn handle_storage_change(&self, change: &StorageChange) {
        if change.area != StorageArea::Sync {
            return;
        }
        let Some(value_change) = change.get(SETTINGS_KEY) else {
            return;
        };

        if value_change.new_value.is_some()
            && lock(&self.in_flight).as_ref() == value_change.new_value.as_ref()
        {
            debug!("Own settings write echoed back");
            return;
        }

        let settings = merge_with_defaults(value_change.new_value.as_ref());
        {
            let mut cache = lock(&self.cache);
            if cache.as_ref() == Some(&settings) {
                debug!("Settings change matches cache, not re-notifying");
                return;
            }
            *cache = Some(settings.clone());
        }
        debug!("Settings changed in another context");
        *lock(&self.pending) = Some(settings);
        self.flush_pending();
    }

    /// Deliver the pending document unless a write holds `write_lock`; the
    /// writer flushes after releasing it. Subscribers may write back to this
    /// manager, so they never run under the lock.
    fn flush_pending(&self) {
        loop {
            let next = {
                let _write = match self.write_lock.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(e)) => e.into_inner(),
                    Err(TryLockError::WouldBlock) => return,
                };
                lock(&self.pending).take()
            };
            match next {
                Some(settings) => self.notify(&settings),
                None => return,
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = lock(&self.listener).take() {
            self.store.remove_listener(id);
        }
    }
}

fn invoke(id: u64, callback: &SettingsCallback, settings: &Settings) {
    match catch_unwind(AssertUnwindSafe(|| callback(settings))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(subscriber = id, "Settings subscriber failed: {:#}", e),
        Err(_) => error!(subscriber = id, "Settings subscriber panicked"),
    }
}

/// Cached settings for one context.
///
/// Clones share the same cache and subscribers. Several managers over one
/// store behave like several contexts: each sees the others' writes through
/// the store's change listener.
#[derive(Clone)]
pub struct SettingsManager {
    inner: Arc<Inner>,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let inner = Arc::new(Inner {
            store: Arc::clone(&store),
            cache: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
            write_lock: Mutex::new(()),
            in_flight: Mutex::new(None),
            pending: Mutex::new(None),
            listener: Mutex::new(None),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let id = store.add_listener(Arc::new(move |change: &StorageChange| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_storage_change(change);
            }
        }));
        *lock(&inner.listener) = Some(id);

        Self { inner }
    }

    /// The store backing this manager
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    /// Write defaults on first run, otherwise load, migrate and heal the
    /// stored document, writing it back when that changed anything.
    pub fn initialize(&self) -> Result<Settings, SettingsError> {
        let result = self.initialize_locked();
        self.inner.flush_pending();
        result
    }

    fn initialize_locked(&self) -> Result<Settings, SettingsError> {
        let _write = lock(&self.inner.write_lock);
        let previous = lock(&self.inner.cache).clone();

        let Some(stored) = self.inner.store.get(SETTINGS_KEY)? else {
            let defaults = Settings::default();
            self.inner.persist(previous, &defaults)?;
            info!("Wrote default settings");
            return Ok(defaults);
        };

        let settings = merge_with_defaults(Some(&stored));
        if settings.to_value()? != stored {
            self.inner.persist(previous, &settings)?;
            info!("Stored settings migrated to the current format");
        } else {
            *lock(&self.inner.cache) = Some(settings.clone());
        }
        Ok(settings)
    }

    /// Current document: the cache, or storage merged with defaults
    pub fn get_settings(&self) -> Result<Settings, SettingsError> {
        self.inner.load()
    }

    /// Cached document without touching storage
    pub fn cached(&self) -> Option<Settings> {
        lock(&self.inner.cache).clone()
    }

    /// Merge a partial update, persist it and notify subscribers
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, SettingsError> {
        self.update_with(|_| Ok(patch))
    }

    /// Read-modify-write: `build` sees the current document and returns the
    /// patch to apply. An error from `build` aborts without writing; an
    /// empty patch neither writes nor notifies. A result whose alias lists
    /// repeat an original is rejected with nothing written.
    pub fn update_with<F>(&self, build: F) -> Result<Settings, SettingsError>
    where
        F: FnOnce(&Settings) -> Result<SettingsPatch, SettingsError>,
    {
        let result = self.update_locked(build);
        if let Ok((merged, true)) = &result {
            info!("Settings updated");
            self.inner.notify(merged);
        }
        self.inner.flush_pending();
        result.map(|(settings, _)| settings)
    }

    /// Returns the resulting document and whether it was written
    fn update_locked<F>(&self, build: F) -> Result<(Settings, bool), SettingsError>
    where
        F: FnOnce(&Settings) -> Result<SettingsPatch, SettingsError>,
    {
        let _write = lock(&self.inner.write_lock);
        let current = self.inner.load()?;
        let patch = build(&current)?;
        if patch.is_empty() {
            debug!("Empty settings patch, nothing to write");
            return Ok((current, false));
        }
        let merged = current.clone().merged(patch);
        if let Some((kind, original)) = find_duplicate(&merged) {
            return Err(SettingsError::DuplicateAlias { kind, original });
        }
        self.inner.persist(Some(current), &merged)?;
        Ok((merged, true))
    }

    /// Replace every known field with `settings`
    pub fn replace_settings(&self, settings: Settings) -> Result<Settings, SettingsError> {
        self.update_settings(settings.into())
    }

    /// Overwrite the stored document with the built-in defaults
    pub fn reset_to_defaults(&self) -> Result<Settings, SettingsError> {
        let defaults = Settings::default();
        let result = {
            let _write = lock(&self.inner.write_lock);
            let previous = lock(&self.inner.cache).clone();
            self.inner.persist(previous, &defaults)
        };
        if result.is_ok() {
            info!("Settings reset to defaults");
            self.inner.notify(&defaults);
        }
        self.inner.flush_pending();
        result.map(|()| defaults)
    }

    /// Register a callback and invoke it once with the current document
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, SettingsError>
    where
        F: Fn(&Settings) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let current = self.get_settings()?;
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let callback: SettingsCallback = Arc::new(callback);
        lock(&self.inner.subscribers).push((id, Arc::clone(&callback)));

        invoke(id, &callback, &current);
        Ok(Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }
}

/// Registration handle returned by [`SettingsManager::subscribe`]
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe to remove it"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Remove the callback; returns false if the manager is already gone
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut subscribers = lock(&inner.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        subscribers.len() != before
    }
}
