//! Feature registry
//!
//! Features are a closed set known at build time ([`FeatureKind`]). The
//! registry holds their registration records for one process; it is an
//! explicit value owned by whoever needs it, rebuilt on every start.

mod builtin;
mod gate;
mod schema;

pub use builtin::FeatureKind;
pub use gate::{active_features, is_feature_active};
pub use schema::{FieldType, PageToggle, SettingField, SettingOption, SettingsSchema};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Registration record of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_schema: Option<SettingsSchema>,
}

impl Feature {
    pub fn builtin(kind: FeatureKind) -> Self {
        Self {
            id: kind.id().to_string(),
            display_name: kind.display_name().to_string(),
            description: Some(kind.description().to_string()),
            enabled: true,
            settings_schema: Some(kind.settings_schema()),
        }
    }

    /// The built-in kind this record describes, if any
    pub fn kind(&self) -> Option<FeatureKind> {
        FeatureKind::from_id(&self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in feature
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in FeatureKind::ALL {
            registry.register(Feature::builtin(kind));
        }
        registry
    }

    /// Add a record; an existing id is replaced in place
    pub fn register(&mut self, feature: Feature) {
        debug!(id = %feature.id, "Registering feature");
        match self.features.iter_mut().find(|f| f.id == feature.id) {
            Some(existing) => *existing = feature,
            None => self.features.push(feature),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// All records in registration order
    pub fn get_all(&self) -> &[Feature] {
        &self.features
    }

    pub fn get_enabled(&self) -> Vec<&Feature> {
        self.features.iter().filter(|f| f.enabled).collect()
    }

    pub fn get_with_settings(&self) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.settings_schema.is_some())
            .collect()
    }

    /// Returns false for unknown ids
    pub fn enable(&mut self, id: &str) -> bool {
        self.set_enabled(id, true)
    }

    pub fn disable(&mut self, id: &str) -> bool {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.features.iter_mut().find(|f| f.id == id) {
            Some(feature) => {
                feature.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
