//! Init command implementation

use anyhow::Result;
use std::path::Path;
use tracing::info;

use betterhub::config::Config;

/// Write the default config file unless one exists
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if Config::init(config_path, force)? {
        info!("Created {}", config_path.display());
        println!("Created {}", config_path.display());
    } else {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }
    Ok(())
}
