//! Feature listing commands

use anyhow::Result;

use betterhub::registry::{active_features, FeatureRegistry};
use betterhub::settings::Settings;

use super::CliContext;

/// Built-in registry with the stored feature toggles applied
fn registry_for(settings: &Settings) -> FeatureRegistry {
    let mut registry = FeatureRegistry::with_builtin();
    let disabled: Vec<String> = registry
        .get_all()
        .iter()
        .filter(|f| !settings.feature_enabled(&f.id))
        .map(|f| f.id.clone())
        .collect();
    for id in disabled {
        registry.disable(&id);
    }
    registry
}

pub fn features_command(ctx: &CliContext, enabled_only: bool, with_settings: bool) -> Result<()> {
    let settings = ctx.settings_manager()?.get_settings()?;
    let registry = registry_for(&settings);
    let features = if enabled_only {
        registry.get_enabled()
    } else if with_settings {
        registry.get_with_settings()
    } else {
        registry.get_all().iter().collect()
    };

    for feature in features {
        println!(
            "{:<24} {:<4} {}",
            feature.id,
            if feature.enabled { "on" } else { "off" },
            feature.display_name
        );
    }
    Ok(())
}

pub fn active_command(ctx: &CliContext, path: &str) -> Result<()> {
    let settings = ctx.settings_manager()?.get_settings()?;
    let active = active_features(&settings, path);
    if active.is_empty() {
        println!("No features run on {} (enable mode: {})", path, settings.enable_mode);
        return Ok(());
    }
    for kind in active {
        println!("{}", kind.id());
    }
    Ok(())
}
