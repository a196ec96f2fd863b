//! Load-time migration and default filling

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::merge::heal;
use super::{Settings, SettingsPatch};

/// Translate the legacy extension-wide `enabled` flag into `enableMode`.
///
/// `enableMode` is only set when absent (`off` for `enabled: false`, `on`
/// otherwise). The legacy key is always dropped, so a second run finds
/// nothing to do. Returns whether the document changed.
pub fn migrate_legacy_enabled(doc: &mut Map<String, Value>) -> bool {
    let Some(enabled) = doc.remove("enabled") else {
        return false;
    };

    if !doc.contains_key("enableMode") {
        let mode = if enabled == Value::Bool(false) {
            "off"
        } else {
            "on"
        };
        debug!(legacy = %enabled, enable_mode = mode, "Migrated legacy enabled flag");
        doc.insert("enableMode".to_string(), Value::String(mode.to_string()));
    }
    true
}

/// Build a complete document from whatever is stored.
///
/// Absent storage yields the built-in defaults. Fields that fail to parse keep
/// their default value; duplicate alias originals are dropped.
pub fn merge_with_defaults(stored: Option<&Value>) -> Settings {
    let mut settings = Settings::default();
    let Some(stored) = stored else {
        return settings;
    };

    settings.apply(SettingsPatch::from_value(stored.clone()));
    if heal(&mut settings) {
        warn!("Stored settings contained duplicate aliases, keeping the first of each");
    }
    settings
}
