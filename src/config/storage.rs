use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding `sync.json` and `local.json` (default `~/.betterhub/storage`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => expand_home(dir),
            None => super::Config::global_config_dir().join("storage"),
        }
    }
}

/// `~/x` → `$HOME/x`
fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_is_kept() {
        let settings = StorageSettings {
            dir: Some(PathBuf::from("/var/lib/betterhub")),
        };
        assert_eq!(settings.resolved_dir(), PathBuf::from("/var/lib/betterhub"));
    }

    #[test]
    fn test_default_dir_under_config_dir() {
        let dir = StorageSettings::default().resolved_dir();
        assert!(dir.ends_with(".betterhub/storage"));
    }
}
