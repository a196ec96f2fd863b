//! Partial settings updates
//!
//! A [`SettingsPatch`] mirrors [`Settings`] with every field optional. Absent
//! fields leave the current value alone. Patches are also the lenient parser
//! for stored and imported documents: a field whose JSON has the wrong shape
//! is dropped with a warning instead of failing the whole document.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::aliasing::{AliasItem, AliasingPatch};
use super::migrate::migrate_legacy_enabled;
use super::pr_list::PrListPatch;
use super::{EnableMode, ReadCommentsTrackerSettings, Settings, SettingsError, Theme};

/// Deserialize an optional field, dropping values of the wrong shape
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(
                expected = std::any::type_name::<T>(),
                error = %e,
                "Ignoring settings field with unexpected shape"
            );
            Ok(None)
        }
    }
}

/// Deserialize an optional alias list, dropping only the malformed items
pub(crate) fn lenient_items<'de, D>(deserializer: D) -> Result<Option<Vec<AliasItem>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => return Ok(None),
        other => {
            warn!(value = %other, "Ignoring alias list that is not an array");
            return Ok(None);
        }
    };

    let parsed = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AliasItem>(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Dropping malformed alias item");
                None
            }
        })
        .collect();
    Ok(Some(parsed))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadCommentsTrackerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub read_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub unread_color: Option<String>,
}

impl From<ReadCommentsTrackerSettings> for ReadCommentsTrackerPatch {
    fn from(s: ReadCommentsTrackerSettings) -> Self {
        Self {
            read_color: Some(s.read_color),
            unread_color: Some(s.unread_color),
        }
    }
}

/// Partial update of the settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub enable_mode: Option<EnableMode>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub allowlist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub features: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub pr_list: Option<PrListPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub aliasing: Option<AliasingPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub read_comments_tracker: Option<ReadCommentsTrackerPatch>,

    /// Top-level keys this version does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsPatch {
    /// Parse a stored, imported or client-supplied document.
    ///
    /// The legacy `enabled` flag is translated first. Anything that is not a
    /// JSON object yields an empty patch.
    pub fn from_value(mut value: Value) -> Self {
        let Value::Object(map) = &mut value else {
            warn!("Settings document is not a JSON object, ignoring it");
            return Self::default();
        };
        migrate_legacy_enabled(map);

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to parse settings document, ignoring it");
            Self::default()
        })
    }

    /// Build a patch that sets one dotted key, e.g. `prList.hideLabels`.
    ///
    /// Fails when the value does not fit the field, so a typo never turns
    /// into a silent no-op.
    pub fn for_path(key: &str, value: Value) -> Result<Self, SettingsError> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(SettingsError::Validation(format!(
                "invalid settings key '{}'",
                key
            )));
        }

        let mut nested = value.clone();
        for segment in segments.iter().rev() {
            let mut map = Map::new();
            map.insert(segment.to_string(), nested);
            nested = Value::Object(map);
        }

        let patch = Self::from_value(nested);
        let echoed = serde_json::to_value(&patch)
            .map_err(|e| SettingsError::Validation(e.to_string()))?;
        if value_at_path(&echoed, &segments).is_none() {
            return Err(SettingsError::Validation(format!(
                "value {} does not fit settings key '{}'",
                value, key
            )));
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<Settings> for SettingsPatch {
    fn from(s: Settings) -> Self {
        Self {
            language: Some(s.language),
            theme: Some(s.theme),
            enable_mode: Some(s.enable_mode),
            allowlist: Some(s.allowlist),
            debug: Some(s.debug),
            features: Some(s.features),
            pr_list: Some(s.pr_list.into()),
            aliasing: Some(s.aliasing.into()),
            read_comments_tracker: Some(s.read_comments_tracker.into()),
            extra: s.extra,
        }
    }
}

impl From<AliasingPatch> for SettingsPatch {
    fn from(aliasing: AliasingPatch) -> Self {
        Self {
            aliasing: Some(aliasing),
            ..Self::default()
        }
    }
}

/// Walk a dotted path through nested JSON objects
pub(crate) fn value_at_path<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| current.as_object()?.get(*segment))
}
