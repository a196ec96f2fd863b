//! Settings document commands: get, set, reset, export, import

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use betterhub::settings::SettingsPatch;

use super::{print_json, CliContext};

pub fn get_command(ctx: &CliContext, key: Option<&str>) -> Result<()> {
    let settings = ctx.settings_manager()?.get_settings()?;
    match key {
        None => print_json(&settings),
        Some(key) => match settings.value_at(key) {
            Some(value) => print_json(&value),
            None => bail!("Unknown setting: {}", key),
        },
    }
}

/// JSON when it parses, otherwise the raw text as a string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn set_command(ctx: &CliContext, key: &str, raw: &str) -> Result<()> {
    let patch = SettingsPatch::for_path(key, parse_value(raw))?;
    let settings = ctx.settings_manager()?.update_settings(patch)?;
    if let Some(value) = settings.value_at(key) {
        println!("{} = {}", key, value);
    }
    Ok(())
}

pub fn reset_command(ctx: &CliContext) -> Result<()> {
    ctx.settings_manager()?.reset_to_defaults()?;
    println!("Settings reset to defaults");
    Ok(())
}

pub fn export_command(ctx: &CliContext, output: Option<&PathBuf>) -> Result<()> {
    let export = ctx.settings_manager()?.export_settings()?;
    let json = export.to_json_pretty()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported settings to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn import_command(ctx: &CliContext, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    ctx.settings_manager()?
        .import_settings(&text)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    println!("Imported settings from {}", file.display());
    Ok(())
}
