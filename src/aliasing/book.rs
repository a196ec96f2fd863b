//! Editing the alias lists of the settings document

use tracing::{debug, info};

use super::avatar::{embed_avatar, AvatarFetcher};
use super::generate::{generate_acronym, generate_deterministic_color};
use super::HarvestedItem;
use crate::settings::{
    same_name, AliasDisplay, AliasItem, AliasKind, AliasingPatch, SettingsError, SettingsManager,
    SettingsPatch,
};

/// Changes to one alias item; `None` leaves a field as it is
#[derive(Debug, Clone, Default)]
pub struct AliasUpdate {
    pub alias: Option<String>,
    pub enabled: Option<bool>,
    pub display: Option<AliasDisplay>,
}

/// Alias lists behind a [`SettingsManager`].
///
/// Every write is a read-modify-write under the manager's write lock, so a
/// duplicate check and the insert it guards cannot interleave with another
/// writer in the same context.
#[derive(Clone)]
pub struct AliasBook {
    manager: SettingsManager,
}

/// Display mode for a manually added alias
fn default_display(kind: AliasKind, original: &str) -> AliasDisplay {
    match kind {
        AliasKind::User => AliasDisplay::Icon(String::new()),
        AliasKind::Project | AliasKind::Org => {
            AliasDisplay::Color(generate_deterministic_color(original))
        }
    }
}

impl AliasBook {
    pub fn new(manager: SettingsManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &SettingsManager {
        &self.manager
    }

    pub fn list(&self, kind: AliasKind) -> Result<Vec<AliasItem>, SettingsError> {
        Ok(self.manager.get_settings()?.aliasing.list(kind).to_vec())
    }

    /// Enabled alias for `original`, if any
    pub fn get_alias(&self, kind: AliasKind, original: &str) -> Result<Option<AliasItem>, SettingsError> {
        let settings = self.manager.get_settings()?;
        Ok(settings
            .aliasing
            .find(kind, original)
            .filter(|item| item.enabled)
            .cloned())
    }

    pub fn add_alias(&self, kind: AliasKind, original: &str, alias: &str) -> Result<AliasItem, SettingsError> {
        let original = original.trim();
        let alias = alias.trim();
        if original.is_empty() || alias.is_empty() {
            return Err(SettingsError::Validation(
                "Original name and alias are required".to_string(),
            ));
        }

        let item = AliasItem {
            original: original.to_string(),
            alias: alias.to_string(),
            enabled: true,
            display: default_display(kind, original),
        };
        let added = item.clone();
        self.manager.update_with(move |settings| {
            if settings.aliasing.find(kind, &item.original).is_some() {
                return Err(SettingsError::DuplicateAlias {
                    kind,
                    original: item.original,
                });
            }
            let mut list = settings.aliasing.list(kind).to_vec();
            list.push(item);
            Ok(AliasingPatch::with_list(kind, list).into())
        })?;
        info!(%kind, original = %added.original, "Added alias");
        Ok(added)
    }

    /// Apply `change` to the stored item for `original` and save the list
    fn modify<F>(&self, kind: AliasKind, original: &str, change: F) -> Result<AliasItem, SettingsError>
    where
        F: FnOnce(&mut AliasItem) -> Result<(), SettingsError>,
    {
        let unknown = || SettingsError::UnknownAlias {
            kind,
            original: original.to_string(),
        };
        let mut updated = None;
        self.manager.update_with(|settings| {
            let mut list = settings.aliasing.list(kind).to_vec();
            let item = list
                .iter_mut()
                .find(|item| same_name(&item.original, original))
                .ok_or_else(unknown)?;
            change(item)?;
            updated = Some(item.clone());
            Ok(AliasingPatch::with_list(kind, list).into())
        })?;
        updated.ok_or_else(unknown)
    }

    pub fn update_alias(
        &self,
        kind: AliasKind,
        original: &str,
        update: AliasUpdate,
    ) -> Result<AliasItem, SettingsError> {
        let alias = match update.alias.as_deref().map(str::trim) {
            Some("") => {
                return Err(SettingsError::Validation("Alias cannot be empty".to_string()));
            }
            other => other.map(str::to_string),
        };
        self.modify(kind, original, |item| {
            if let Some(alias) = alias {
                item.alias = alias;
            }
            if let Some(enabled) = update.enabled {
                item.enabled = enabled;
            }
            if let Some(display) = update.display {
                item.display = display;
            }
            Ok(())
        })
    }

    /// Switch to a badge, keeping an existing colour
    pub fn set_display_color(&self, kind: AliasKind, original: &str) -> Result<AliasItem, SettingsError> {
        self.modify(kind, original, |item| {
            if item.color().is_none() {
                item.display = AliasDisplay::Color(generate_deterministic_color(&item.original));
            }
            Ok(())
        })
    }

    /// Switch to icon mode, keeping an existing icon
    pub fn set_display_icon(&self, kind: AliasKind, original: &str) -> Result<AliasItem, SettingsError> {
        self.modify(kind, original, |item| {
            if item.icon().is_none() {
                item.display = AliasDisplay::Icon(String::new());
            }
            Ok(())
        })
    }

    pub fn set_display_plain(&self, kind: AliasKind, original: &str) -> Result<AliasItem, SettingsError> {
        self.modify(kind, original, |item| {
            item.display = AliasDisplay::Plain;
            Ok(())
        })
    }

    /// Returns false when nothing matched
    pub fn remove_alias(&self, kind: AliasKind, original: &str) -> Result<bool, SettingsError> {
        let mut removed = false;
        self.manager.update_with(|settings| {
            let list = settings.aliasing.list(kind);
            let kept: Vec<AliasItem> = list
                .iter()
                .filter(|item| !same_name(&item.original, original))
                .cloned()
                .collect();
            if kept.len() == list.len() {
                return Ok(SettingsPatch::default());
            }
            removed = true;
            Ok(AliasingPatch::with_list(kind, kept).into())
        })?;
        if removed {
            info!(%kind, original, "Removed alias");
        }
        Ok(removed)
    }

    /// Default alias for a harvested entity when auto-alias is on for its kind.
    ///
    /// An existing item (any case) is returned untouched. Users keep their
    /// name and get the avatar, embedded when `fetcher` manages to;
    /// projects and orgs get an acronym on a deterministic colour.
    pub fn generate_auto_alias(
        &self,
        item: &HarvestedItem,
        fetcher: &dyn AvatarFetcher,
    ) -> Result<Option<AliasItem>, SettingsError> {
        let settings = self.manager.get_settings()?;
        if !settings.aliasing.auto_alias(item.kind) {
            return Ok(None);
        }
        if let Some(existing) = settings.aliasing.find(item.kind, &item.original) {
            return Ok(Some(existing.clone()));
        }

        let generated = match item.kind {
            AliasKind::User => {
                let generated = AliasItem::new(&item.original, &item.original);
                match &item.icon {
                    Some(url) => generated.with_icon(embed_avatar(fetcher, url)),
                    None => generated,
                }
            }
            AliasKind::Project | AliasKind::Org => {
                AliasItem::new(&item.original, generate_acronym(&item.original))
                    .with_color(generate_deterministic_color(&item.original))
            }
        };

        // The avatar fetch ran outside the write lock; re-check before inserting
        let kind = item.kind;
        let mut result = generated.clone();
        self.manager.update_with(|settings| {
            if let Some(existing) = settings.aliasing.find(kind, &generated.original) {
                result = existing.clone();
                return Ok(SettingsPatch::default());
            }
            let mut list = settings.aliasing.list(kind).to_vec();
            list.push(generated);
            Ok(AliasingPatch::with_list(kind, list).into())
        })?;
        debug!(%kind, original = %result.original, alias = %result.alias, "Auto-aliased");
        Ok(Some(result))
    }

    /// Append harvested entities not yet in their lists, in one write.
    ///
    /// New items use their name as alias; users with an avatar show it as
    /// their icon. Returns how many items were added.
    pub fn harvest_new(&self, items: &[HarvestedItem]) -> Result<usize, SettingsError> {
        let mut added = 0;
        self.manager.update_with(|settings| {
            let mut aliasing = settings.aliasing.clone();
            for found in items {
                let list = aliasing.list_mut(found.kind);
                if list.iter().any(|item| same_name(&item.original, &found.original)) {
                    continue;
                }
                let item = AliasItem::new(&found.original, &found.original);
                list.push(match &found.icon {
                    Some(icon) if found.kind == AliasKind::User => item.with_icon(icon),
                    _ => item,
                });
                added += 1;
            }
            if added == 0 {
                return Ok(SettingsPatch::default());
            }
            Ok(AliasingPatch {
                users: Some(aliasing.users),
                projects: Some(aliasing.projects),
                orgs: Some(aliasing.orgs),
                ..Default::default()
            }
            .into())
        })?;
        if added > 0 {
            info!(added, "Saved harvested entities");
        }
        Ok(added)
    }
}
