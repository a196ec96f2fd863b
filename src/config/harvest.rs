use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aliasing::{AvatarFetcher, HttpAvatarFetcher, OfflineAvatarFetcher};

/// Harvest pacing and avatar download settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSettings {
    /// Minimum time between two harvest passes on one page
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Embed avatars of auto-aliased users as data URLs
    #[serde(default = "default_fetch_avatars")]
    pub fetch_avatars: bool,

    #[serde(default = "default_avatar_timeout_secs")]
    pub avatar_timeout_secs: u64,

    /// Larger avatars keep their live URL
    #[serde(default = "default_max_avatar_bytes")]
    pub max_avatar_bytes: u64,
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_fetch_avatars() -> bool {
    true
}

fn default_avatar_timeout_secs() -> u64 {
    10
}

fn default_max_avatar_bytes() -> u64 {
    512 * 1024
}

impl HarvestSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn avatar_fetcher(&self) -> Arc<dyn AvatarFetcher> {
        if self.fetch_avatars {
            Arc::new(HttpAvatarFetcher::new(
                Duration::from_secs(self.avatar_timeout_secs),
                self.max_avatar_bytes,
            ))
        } else {
            Arc::new(OfflineAvatarFetcher)
        }
    }
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            fetch_avatars: default_fetch_avatars(),
            avatar_timeout_secs: default_avatar_timeout_secs(),
            max_avatar_bytes: default_max_avatar_bytes(),
        }
    }
}
