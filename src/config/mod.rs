//! Configuration of the `betterhub` tool itself
//!
//! Lives in `~/.betterhub/config.toml`. Every field has a default, so a
//! missing file or a file with only some sections is fine.

mod harvest;
mod io;
mod server;
mod storage;

pub use harvest::HarvestSettings;
pub use server::ServerSettings;
pub use storage::StorageSettings;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the storage areas are kept
    #[serde(default)]
    pub storage: StorageSettings,

    /// Local settings API
    #[serde(default)]
    pub server: ServerSettings,

    /// Harvest pacing and avatar downloads
    #[serde(default)]
    pub harvest: HarvestSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 9877);
        assert_eq!(config.harvest.cooldown_ms, 2000);
        assert!(config.harvest.fetch_avatars);
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
[server]
token = "s3cret"

[harvest]
fetch_avatars = false
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9877);
        assert_eq!(config.server.auth_token(), Some("s3cret"));
        assert!(!config.harvest.fetch_avatars);
        assert_eq!(config.harvest.max_avatar_bytes, 512 * 1024);
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config.storage.dir = Some("/tmp/bh".into());
        config.harvest.cooldown_ms = 500;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
