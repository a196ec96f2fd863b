//! Request routing for the settings API

use serde_json::{json, Value};
use tracing::warn;

use crate::registry::{Feature, FeatureRegistry};
use crate::settings::{SettingsError, SettingsManager, SettingsPatch};

/// Shared state behind every request
#[derive(Clone)]
pub struct ApiState {
    pub manager: SettingsManager,
    pub registry: FeatureRegistry,
}

impl ApiState {
    pub fn new(manager: SettingsManager, registry: FeatureRegistry) -> Self {
        Self { manager, registry }
    }
}

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, code: &str) -> Self {
        Self {
            status,
            body: json!({ "error": code }),
        }
    }

    fn with_message(status: u16, code: &str, message: impl ToString) -> Self {
        Self {
            status,
            body: json!({ "error": code, "message": message.to_string() }),
        }
    }
}

impl From<SettingsError> for ApiResponse {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Store(e) => {
                warn!("[betterhub:http] Storage failure: {}", e);
                ApiResponse::with_message(500, "storage", e)
            }
            SettingsError::Import(msg) => ApiResponse::with_message(400, "invalid_import", msg),
            other => ApiResponse::with_message(400, "invalid_settings", other),
        }
    }
}

/// Dispatch one request; `path` has its query string removed
pub fn route(state: &ApiState, method: &str, path: &str, body: &str) -> ApiResponse {
    let result = match (method, path) {
        ("GET", "/ping") => Ok(ApiResponse::ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }))),
        ("GET", "/settings") => handle_get_settings(state),
        ("PATCH", "/settings") => handle_patch_settings(state, body),
        ("POST", "/settings/reset") => handle_reset(state),
        ("GET", "/settings/export") => handle_export(state),
        ("POST", "/settings/import") => handle_import(state, body),
        ("GET", "/features") => handle_features(state),
        (_, "/ping" | "/settings" | "/settings/reset" | "/settings/export" | "/settings/import" | "/features") => {
            return ApiResponse::error(405, "method_not_allowed");
        }
        _ => return ApiResponse::error(404, "not_found"),
    };
    result.unwrap_or_else(ApiResponse::from)
}

fn settings_body(settings: &crate::settings::Settings) -> Result<ApiResponse, SettingsError> {
    Ok(ApiResponse::ok(json!({ "settings": settings.to_value()? })))
}

fn handle_get_settings(state: &ApiState) -> Result<ApiResponse, SettingsError> {
    settings_body(&state.manager.get_settings()?)
}

fn handle_patch_settings(state: &ApiState, body: &str) -> Result<ApiResponse, SettingsError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => return Ok(ApiResponse::error(400, "expected_object")),
        Err(e) => return Ok(ApiResponse::with_message(400, "invalid_json", e)),
    };
    let patch = SettingsPatch::from_value(value);
    settings_body(&state.manager.update_settings(patch)?)
}

fn handle_reset(state: &ApiState) -> Result<ApiResponse, SettingsError> {
    settings_body(&state.manager.reset_to_defaults()?)
}

fn handle_export(state: &ApiState) -> Result<ApiResponse, SettingsError> {
    let export = state.manager.export_settings()?;
    let file_name = export.file_name();
    let file = serde_json::to_value(&export).map_err(|e| SettingsError::Store(e.into()))?;
    Ok(ApiResponse::ok(json!({ "fileName": file_name, "file": file })))
}

fn handle_import(state: &ApiState, body: &str) -> Result<ApiResponse, SettingsError> {
    settings_body(&state.manager.import_settings(body)?)
}

/// Registry records with `enabled` reflecting the stored feature toggles
fn handle_features(state: &ApiState) -> Result<ApiResponse, SettingsError> {
    let settings = state.manager.get_settings()?;
    let features: Vec<Feature> = state
        .registry
        .get_all()
        .iter()
        .map(|feature| {
            let mut feature = feature.clone();
            feature.enabled = feature.enabled && settings.feature_enabled(&feature.id);
            feature
        })
        .collect();
    Ok(ApiResponse::ok(json!({ "features": features })))
}
