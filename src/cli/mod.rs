//! CLI command implementations

pub mod alias;
pub mod features;
pub mod init;
pub mod page;
pub mod serve;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use betterhub::config::Config;
use betterhub::settings::SettingsManager;
use betterhub::store::{FileStore, StorageArea};

/// What every command needs: the tool config and where storage lives
pub struct CliContext {
    pub config: Config,
    pub store_dir: PathBuf,
}

impl CliContext {
    pub fn load(config_path: &Path, store_dir: Option<PathBuf>) -> Result<Self> {
        let config = Config::load(Some(config_path))?;
        let store_dir = store_dir.unwrap_or_else(|| config.storage.resolved_dir());
        Ok(Self { config, store_dir })
    }

    /// Settings manager over the file-backed sync area, initialized
    pub fn settings_manager(&self) -> Result<SettingsManager> {
        std::fs::create_dir_all(&self.store_dir).with_context(|| {
            format!("Failed to create storage directory: {}", self.store_dir.display())
        })?;
        let store = FileStore::open(&self.store_dir, StorageArea::Sync);
        let manager = SettingsManager::new(Arc::new(store));
        manager
            .initialize()
            .with_context(|| format!("Failed to load settings from {}", self.store_dir.display()))?;
        Ok(manager)
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
