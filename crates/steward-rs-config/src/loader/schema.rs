//! Schema validation for Steward JSON5 configuration layers.
//!
//! Every layer is checked on its own so an error names the file it came from.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &[
            "$schema",
            "llm",
            "orchestrator",
            "tools",
            "memory",
            "sessions",
        ],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("llm") {
        validate_llm(value, layer, "llm")?;
    }
    if let Some(value) = map.get("orchestrator") {
        validate_orchestrator(value, layer, "orchestrator")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("sessions") {
        validate_sessions(value, layer, "sessions")?;
    }
    Ok(())
}

fn validate_llm(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["provider", "model", "api_key_env", "base_url", "temperature"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("provider") {
        expect_enum(
            value,
            &["deepseek", "openai"],
            layer,
            &join_path(path, "provider"),
        )?;
    }
    if let Some(value) = map.get("model") {
        expect_string(value, layer, &join_path(path, "model"))?;
    }
    for key in ["api_key_env", "base_url"] {
        if let Some(value) = map.get(key) {
            expect_optional_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("temperature") {
        expect_f64(value, layer, &join_path(path, "temperature"))?;
    }
    Ok(())
}

fn validate_orchestrator(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["system_prompt", "append_system_prompt", "max_iterations"],
        layer,
        path,
    )?;

    for key in ["system_prompt", "append_system_prompt"] {
        if let Some(value) = map.get(key) {
            expect_optional_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("max_iterations") {
        expect_u64(value, layer, &join_path(path, "max_iterations"))?;
    }
    Ok(())
}

fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["call_timeout_secs", "weather"], layer, path)?;

    if let Some(value) = map.get("call_timeout_secs") {
        expect_u64(value, layer, &join_path(path, "call_timeout_secs"))?;
    }
    if let Some(value) = map.get("weather") {
        let weather_path = join_path(path, "weather");
        let weather = expect_object(value, layer, &weather_path)?;
        ensure_allowed_keys(
            weather,
            &["enabled", "geocoding_url", "forecast_url", "timeout_secs"],
            layer,
            &weather_path,
        )?;
        if let Some(value) = weather.get("enabled") {
            expect_bool(value, layer, &join_path(&weather_path, "enabled"))?;
        }
        for key in ["geocoding_url", "forecast_url"] {
            if let Some(value) = weather.get(key) {
                expect_string(value, layer, &join_path(&weather_path, key))?;
            }
        }
        if let Some(value) = weather.get("timeout_secs") {
            expect_u64(value, layer, &join_path(&weather_path, "timeout_secs"))?;
        }
    }
    Ok(())
}

fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["path", "search_k", "embedder", "hashing_dimensions"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("path") {
        expect_optional_string(value, layer, &join_path(path, "path"))?;
    }
    for key in ["search_k", "hashing_dimensions"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("embedder") {
        expect_enum(
            value,
            &["hashing", "fastembed", "llm"],
            layer,
            &join_path(path, "embedder"),
        )?;
    }
    Ok(())
}

fn validate_sessions(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["enabled", "path"], layer, path)?;

    if let Some(value) = map.get("enabled") {
        expect_bool(value, layer, &join_path(path, "enabled"))?;
    }
    if let Some(value) = map.get("path") {
        expect_optional_string(value, layer, &join_path(path, "path"))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_optional_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() || value.is_null() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string or null"))
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Expect one of a fixed set of string values.
fn expect_enum(value: &Value, allowed: &[&str], layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(raw) if allowed.contains(&raw) => Ok(()),
        Some(_) => Err(invalid_field(
            layer,
            path,
            &format!("expected one of: {}", allowed.join(", ")),
        )),
        None => Err(invalid_field(layer, path, "expected string")),
    }
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
