//! Settings export and import files

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{Settings, SettingsError, SettingsManager, SettingsPatch};

/// Format version written into every export
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub settings: Settings,
}

impl ExportFile {
    pub fn new(settings: Settings) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now(),
            settings,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(|e| SettingsError::Store(e.into()))
    }

    /// Suggested file name, e.g. `betterhub-settings-2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!(
            "betterhub-settings-{}.json",
            self.export_date.format("%Y-%m-%d")
        )
    }
}

/// Validate an import file and turn its settings into a patch.
///
/// Only the envelope is checked here (a foreign `version` is only logged); the settings themselves are parsed
/// leniently like any stored document.
pub fn parse_import(text: &str) -> Result<SettingsPatch, SettingsError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SettingsError::Import(format!("not valid JSON: {}", e)))?;

    let Value::Object(mut envelope) = value else {
        return Err(SettingsError::Import("expected a JSON object".to_string()));
    };

    if let Some(version) = envelope.get("version").and_then(Value::as_str) {
        match Version::parse(version) {
            Ok(parsed) if parsed.major != 1 => {
                warn!(version, "Import file was written by a different format version, importing anyway");
            }
            Ok(_) => {}
            Err(e) => warn!(version, error = %e, "Import file has an unparsable version"),
        }
    }

    match envelope.remove("settings") {
        Some(settings @ Value::Object(_)) => Ok(SettingsPatch::from_value(settings)),
        Some(_) => Err(SettingsError::Import(
            "'settings' must be an object".to_string(),
        )),
        None => Err(SettingsError::Import("missing 'settings'".to_string())),
    }
}

impl SettingsManager {
    pub fn export_settings(&self) -> Result<ExportFile, SettingsError> {
        Ok(ExportFile::new(self.get_settings()?))
    }

    /// Apply an import file as a partial update; nothing is written when the
    /// file is rejected
    pub fn import_settings(&self, text: &str) -> Result<Settings, SettingsError> {
        let patch = parse_import(text)?;
        let settings = self.update_settings(patch)?;
        info!("Imported settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Theme;
    use crate::store::{MemoryStore, StorageArea};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_export_envelope() {
        let export = ExportFile::new(Settings::default());
        let value: Value = serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["version"], json!("1.0.0"));
        assert!(value["exportDate"].as_str().unwrap().contains('T'));
        assert_eq!(value["settings"]["language"], json!("en"));
        assert!(export.file_name().starts_with("betterhub-settings-"));
    }

    #[test]
    fn test_import_rejects_bad_envelopes() {
        assert!(matches!(parse_import("{"), Err(SettingsError::Import(_))));
        assert!(matches!(parse_import("[]"), Err(SettingsError::Import(_))));
        assert!(matches!(parse_import(r#"{"version":"1.0.0"}"#), Err(SettingsError::Import(_))));
        assert!(matches!(
            parse_import(r#"{"settings": "nope"}"#),
            Err(SettingsError::Import(_))
        ));
    }

    #[test]
    fn test_import_other_version_still_applies() {
        let patch = parse_import(r#"{"version": "2.0.0", "settings": {"theme": "dark"}}"#).unwrap();
        assert_eq!(patch.theme, Some(Theme::Dark));
        assert!(parse_import(r#"{"version": "next", "settings": {}}"#).is_ok());
    }

    #[test]
    fn test_import_accepts_minimal_file() {
        let patch = parse_import(r#"{"settings": {"theme": "dark"}}"#).unwrap();
        assert_eq!(patch.theme, Some(Theme::Dark));
    }

    #[test]
    fn test_import_merges_into_current() {
        let manager = SettingsManager::new(Arc::new(MemoryStore::new(StorageArea::Sync)));
        manager
            .update_settings(SettingsPatch { language: Some("fr".into()), ..Default::default() })
            .unwrap();

        let text = json!({
            "version": "1.0.0",
            "exportDate": "2024-05-01T10:00:00.000Z",
            "settings": {"theme": "dark", "enabled": false}
        })
        .to_string();
        let settings = manager.import_settings(&text).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.language, "fr");
        assert_eq!(settings.enable_mode, crate::settings::EnableMode::Off);
    }
}
