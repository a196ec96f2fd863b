//! The synchronized settings document
//!
//! One JSON document under the `"settings"` key of the sync storage area,
//! shared by every context. [`SettingsManager`] owns the cached copy of it for
//! one context; the rest of this module defines the document, partial
//! updates and the merge rules between them.

pub mod aliasing;
mod manager;
pub mod merge;
mod migrate;
mod patch;
mod pr_list;
pub mod transfer;

pub use aliasing::{
    same_name, AliasDisplay, AliasItem, AliasKind, AliasingPatch, AliasingSettings,
    HarvestWhitelist, WhitelistKind,
};
pub use manager::{SettingsCallback, SettingsManager, Subscription, SETTINGS_KEY};
pub use merge::{find_duplicate, heal};
pub use migrate::{merge_with_defaults, migrate_legacy_enabled};
pub use patch::{ReadCommentsTrackerPatch, SettingsPatch};
pub use pr_list::{PrListPatch, PrListSettings};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::FeatureKind;
use crate::store::StoreError;

/// Colour scheme of the options UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Master switch controlling on which pages any feature may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableMode {
    #[default]
    On,
    Off,
    /// Only on owners / repositories listed in `allowlist`
    Allowlist,
}

impl std::fmt::Display for EnableMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnableMode::On => write!(f, "on"),
            EnableMode::Off => write!(f, "off"),
            EnableMode::Allowlist => write!(f, "allowlist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadCommentsTrackerSettings {
    pub read_color: String,
    pub unread_color: String,
}

impl Default for ReadCommentsTrackerSettings {
    fn default() -> Self {
        Self {
            read_color: "#2da44e".to_string(),
            unread_color: "#bc8c00".to_string(),
        }
    }
}

/// The complete settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub language: String,
    pub theme: Theme,
    pub enable_mode: EnableMode,
    /// `owner` or `owner/repo` entries, compared case-insensitively
    pub allowlist: Vec<String>,
    pub debug: bool,
    /// Per-feature master toggle; a missing id counts as enabled
    pub features: BTreeMap<String, bool>,
    pub pr_list: PrListSettings,
    pub aliasing: AliasingSettings,
    pub read_comments_tracker: ReadCommentsTrackerSettings,

    /// Top-level keys written by other versions, preserved on write
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: Theme::default(),
            enable_mode: EnableMode::default(),
            allowlist: Vec::new(),
            debug: false,
            features: FeatureKind::ALL
                .iter()
                .map(|kind| (kind.id().to_string(), true))
                .collect(),
            pr_list: PrListSettings::default(),
            aliasing: AliasingSettings::default(),
            read_comments_tracker: ReadCommentsTrackerSettings::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Whether a feature's master toggle is on; unknown ids are enabled
    pub fn feature_enabled(&self, id: &str) -> bool {
        self.features.get(id).copied().unwrap_or(true)
    }

    /// Read a dotted key such as `aliasing.autoAliasUsers`
    pub fn value_at(&self, key: &str) -> Option<Value> {
        let value = serde_json::to_value(self).ok()?;
        let segments: Vec<&str> = key.split('.').collect();
        patch::value_at_path(&value, &segments).cloned()
    }

    pub fn to_value(&self) -> Result<Value, SettingsError> {
        serde_json::to_value(self).map_err(|e| SettingsError::Store(StoreError::Serialize(e)))
    }
}

/// Errors from settings operations
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("This {kind} already exists: {original}")]
    DuplicateAlias { kind: AliasKind, original: String },

    #[error("No {kind} alias for '{original}'")]
    UnknownAlias { kind: AliasKind, original: String },

    #[error("Invalid settings file: {0}")]
    Import(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_document_shape() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["language"], json!("en"));
        assert_eq!(value["theme"], json!("light"));
        assert_eq!(value["enableMode"], json!("on"));
        assert_eq!(value["allowlist"], json!([]));
        assert_eq!(value["features"].as_object().unwrap().len(), 13);
        assert_eq!(value["prList"]["enabledOnPages"], json!({"pulls": true}));
        assert_eq!(value["aliasing"]["harvestOrgWhitelist"], json!("all"));
        assert_eq!(value["readCommentsTracker"]["unreadColor"], json!("#bc8c00"));
    }

    #[test]
    fn test_unknown_feature_is_enabled() {
        let mut settings = Settings::default();
        assert!(settings.feature_enabled("not-a-feature"));
        settings.features.insert("copy-path".into(), false);
        assert!(!settings.feature_enabled("copy-path"));
    }

    #[test]
    fn test_value_at() {
        let settings = Settings::default();
        assert_eq!(settings.value_at("prList.hideLabels"), Some(json!(false)));
        assert_eq!(settings.value_at("language"), Some(json!("en")));
        assert_eq!(settings.value_at("prList.nope"), None);
    }

    #[test]
    fn test_extra_keys_roundtrip() {
        let mut settings = Settings::default();
        settings.extra.insert("futureFlag".into(), json!(true));
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["futureFlag"], json!(true));
        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }
}
