//! Declarative settings schema rendered by the options UI

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Checkbox,
    Select,
    Number,
    Text,
    Textarea,
    Radio,
    Color,
    AliasList,
    HarvestWhitelist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingOption {
    pub value: Value,
    pub label: String,
}

/// One control bound to a dotted settings key such as `prList.hideLabels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingField {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub default: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SettingOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl SettingField {
    pub fn new(key: &str, field_type: FieldType, label: &str, default: Value) -> Self {
        Self {
            key: key.to_string(),
            field_type,
            label: label.to_string(),
            description: None,
            default,
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
            placeholder: None,
        }
    }

    pub fn checkbox(key: &str, label: &str, description: &str) -> Self {
        Self::new(key, FieldType::Checkbox, label, Value::Bool(false)).describe(description)
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Page a feature can be switched on for, e.g. `pulls`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageToggle {
    pub page_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSchema {
    pub feature_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageToggle>,
    pub fields: Vec<SettingField>,
}

impl SettingsSchema {
    pub fn field(&self, key: &str) -> Option<&SettingField> {
        self.fields.iter().find(|field| field.key == key)
    }
}
