//! Fan-out of settings changes to open site pages
//!
//! The background context keeps a list of message targets (one per open
//! tab) and, whenever its settings change, sends each page under the site
//! a `SETTINGS_CHANGED` message carrying the full document. Pages without a
//! listener are expected; their failures are logged and skipped.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::aliasing::url::SITE_HOST;
use crate::settings::{Settings, SettingsError, SettingsManager, Subscription};

/// Messages sent from the background context to pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    SettingsChanged { settings: Settings },
}

/// Something a [`Message`] can be delivered to, e.g. one browser tab
pub trait MessageTarget: Send + Sync {
    fn id(&self) -> u64;

    /// URL currently loaded in the target
    fn url(&self) -> String;

    fn send(&self, message: &Message) -> Result<()>;
}

/// Target backed by a channel; the receiving side plays the page
pub struct ChannelTarget {
    id: u64,
    url: Mutex<String>,
    tx: Sender<Message>,
}

impl ChannelTarget {
    pub fn new(id: u64, url: impl Into<String>, tx: Sender<Message>) -> Self {
        Self {
            id,
            url: Mutex::new(url.into()),
            tx,
        }
    }

    /// The page navigated
    pub fn navigate(&self, url: impl Into<String>) {
        *lock(&self.url) = url.into();
    }
}

impl MessageTarget for ChannelTarget {
    fn id(&self) -> u64 {
        self.id
    }

    fn url(&self) -> String {
        lock(&self.url).clone()
    }

    fn send(&self, message: &Message) -> Result<()> {
        self.tx
            .send(message.clone())
            .context("page is no longer listening")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Whether a page URL is one the content scripts run on (`https://github.com/*`)
pub fn is_site_page(url: &str) -> bool {
    Url::parse(url)
        .map(|url| url.scheme() == "https" && url.host_str() == Some(SITE_HOST))
        .unwrap_or(false)
}

#[derive(Default)]
pub struct Broadcaster {
    targets: Mutex<Vec<Arc<dyn MessageTarget>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target, replacing any earlier one with the same id
    pub fn register(&self, target: Arc<dyn MessageTarget>) {
        let mut targets = lock(&self.targets);
        targets.retain(|t| t.id() != target.id());
        targets.push(target);
    }

    pub fn unregister(&self, id: u64) -> bool {
        let mut targets = lock(&self.targets);
        let before = targets.len();
        targets.retain(|t| t.id() != id);
        targets.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.targets).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send to every site page; returns how many accepted the message
    pub fn broadcast(&self, message: &Message) -> usize {
        let targets: Vec<Arc<dyn MessageTarget>> = lock(&self.targets).clone();
        let mut delivered = 0;
        for target in targets {
            let url = target.url();
            if !is_site_page(&url) {
                continue;
            }
            match target.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(target = target.id(), %url, "Could not send message: {:#}", e),
            }
        }
        delivered
    }

    pub fn settings_changed(&self, settings: &Settings) -> usize {
        self.broadcast(&Message::SettingsChanged {
            settings: settings.clone(),
        })
    }

    /// Broadcast every settings document `manager` publishes
    pub fn attach(self: &Arc<Self>, manager: &SettingsManager) -> Result<Subscription, SettingsError> {
        let broadcaster = Arc::clone(self);
        manager.subscribe(move |settings| {
            let delivered = broadcaster.settings_changed(settings);
            debug!(delivered, "Broadcast settings change");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::settings::{SettingsPatch, Theme};
    use crate::store::{MemoryStore, StorageArea};
    use serde_json::json;

    struct FailingTarget;

    impl MessageTarget for FailingTarget {
        fn id(&self) -> u64 {
            99
        }

        fn url(&self) -> String {
            "https://github.com/settings".to_string()
        }

        fn send(&self, _message: &Message) -> Result<()> {
            anyhow::bail!("no content script")
        }
    }

    #[test]
    fn test_message_wire_shape() {
        let message = Message::SettingsChanged {
            settings: Settings::default(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], json!("SETTINGS_CHANGED"));
        assert_eq!(value["settings"]["language"], json!("en"));
    }

    #[test]
    fn test_site_page_matching() {
        assert!(is_site_page("https://github.com/"));
        assert!(is_site_page("https://github.com/facebook/react?tab=readme"));
        assert!(!is_site_page("http://github.com/facebook"));
        assert!(!is_site_page("https://gist.github.com/octocat"));
        assert!(!is_site_page("about:blank"));
    }

    #[test]
    fn test_broadcast_only_to_site_pages() {
        let (tx, rx) = mpsc::channel();
        let (other_tx, other_rx) = mpsc::channel();
        let broadcaster = Broadcaster::new();
        broadcaster.register(Arc::new(ChannelTarget::new(1, "https://github.com/rust-lang/rust", tx)));
        broadcaster.register(Arc::new(ChannelTarget::new(2, "https://example.com/", other_tx)));
        broadcaster.register(Arc::new(FailingTarget));

        assert_eq!(broadcaster.settings_changed(&Settings::default()), 1);
        assert!(rx.try_recv().is_ok());
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let (tx, _rx) = mpsc::channel();
        let broadcaster = Broadcaster::new();
        let target = Arc::new(ChannelTarget::new(1, "https://github.com/", tx));
        broadcaster.register(target.clone());
        broadcaster.register(target);
        assert_eq!(broadcaster.len(), 1);
        assert!(broadcaster.unregister(1));
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn test_attach_forwards_updates() {
        let manager = SettingsManager::new(Arc::new(MemoryStore::new(StorageArea::Sync)));
        let (tx, rx) = mpsc::channel();
        let target = Arc::new(ChannelTarget::new(7, "https://example.com/", tx));
        let broadcaster = Arc::new(Broadcaster::new());
        broadcaster.register(target.clone());
        let _subscription = broadcaster.attach(&manager).unwrap();

        // Not a site page yet
        assert!(rx.try_recv().is_err());
        target.navigate("https://github.com/notifications");

        let mut patch = SettingsPatch::default();
        patch.theme = Some(Theme::Dark);
        manager.update_settings(patch).unwrap();
        let Message::SettingsChanged { settings } = rx.try_recv().unwrap();
        assert_eq!(settings.theme, Theme::Dark);
    }
}
