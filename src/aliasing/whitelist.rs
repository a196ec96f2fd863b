//! Harvest whitelists: where harvesting may run

use tracing::info;
use url::Url;

use super::url::{current_org, current_repo};
use crate::settings::{
    same_name, AliasingPatch, AliasingSettings, HarvestWhitelist, SettingsError, SettingsManager,
    SettingsPatch, WhitelistKind,
};

/// Whether the page's org and repo each pass their whitelist
pub fn harvest_allowed(aliasing: &AliasingSettings, page_url: &Url) -> bool {
    aliasing
        .harvest_org_whitelist
        .permits(current_org(page_url).as_deref())
        && aliasing
            .harvest_repo_whitelist
            .permits(current_repo(page_url).as_deref())
}

fn save(kind: WhitelistKind, whitelist: HarvestWhitelist) -> SettingsPatch {
    AliasingPatch::with_whitelist(kind, whitelist).into()
}

/// `true` permits every page; `false` switches to an (initially empty) list
pub fn set_allow_all(
    manager: &SettingsManager,
    kind: WhitelistKind,
    allow_all: bool,
) -> Result<HarvestWhitelist, SettingsError> {
    let settings = manager.update_with(|settings| {
        let current = settings.aliasing.whitelist(kind);
        Ok(match (allow_all, current) {
            (true, HarvestWhitelist::All) | (false, HarvestWhitelist::List(_)) => {
                SettingsPatch::default()
            }
            (true, _) => save(kind, HarvestWhitelist::All),
            (false, _) => save(kind, HarvestWhitelist::List(Vec::new())),
        })
    })?;
    Ok(settings.aliasing.whitelist(kind).clone())
}

/// Add an org or `owner/repo`; leaves "all" mode
pub fn add_entry(
    manager: &SettingsManager,
    kind: WhitelistKind,
    name: &str,
) -> Result<HarvestWhitelist, SettingsError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SettingsError::Validation(format!("Enter a {} name.", kind)));
    }
    let settings = manager.update_with(|settings| {
        let mut entries = settings.aliasing.whitelist(kind).entries().to_vec();
        if entries.iter().any(|entry| same_name(entry, name)) {
            return Err(SettingsError::Validation(format!(
                "This {} is already in the whitelist.",
                kind
            )));
        }
        entries.push(name.to_string());
        Ok(save(kind, HarvestWhitelist::List(entries)))
    })?;
    info!(%kind, name, "Added to harvest whitelist");
    Ok(settings.aliasing.whitelist(kind).clone())
}

/// Returns false when the entry was not listed
pub fn remove_entry(
    manager: &SettingsManager,
    kind: WhitelistKind,
    name: &str,
) -> Result<bool, SettingsError> {
    let mut removed = false;
    manager.update_with(|settings| {
        let HarvestWhitelist::List(entries) = settings.aliasing.whitelist(kind) else {
            return Ok(SettingsPatch::default());
        };
        let kept: Vec<String> = entries
            .iter()
            .filter(|entry| !same_name(entry, name))
            .cloned()
            .collect();
        if kept.len() == entries.len() {
            return Ok(SettingsPatch::default());
        }
        removed = true;
        Ok(save(kind, HarvestWhitelist::List(kept)))
    })?;
    Ok(removed)
}
