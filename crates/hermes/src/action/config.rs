//! Helpers for reading executor configuration keys.

use reqwest::Url;
use serde_json::Value;

use super::error::ActionError;
use crate::relay::ActionConfig;

/// Read a required, non-empty string key.
pub fn required_str<'a>(config: &'a ActionConfig, key: &str) -> Result<&'a str, ActionError> {
    match optional_str(config, key)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ActionError::InvalidConfig(format!("missing {key}"))),
    }
}

/// Read a required absolute `http` or `https` URL.
pub fn required_url(config: &ActionConfig, key: &str) -> Result<Url, ActionError> {
    let raw = required_str(config, key)?;
    let url = Url::parse(raw)
        .map_err(|e| ActionError::InvalidConfig(format!("{key} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ActionError::InvalidConfig(format!(
            "{key} must be an http(s) URL, got scheme {other}"
        ))),
    }
}

/// Read an optional string key.
///
/// Absent and `null` values are `None`; any other non-string value is an
/// error.
pub fn optional_str<'a>(
    config: &'a ActionConfig,
    key: &str,
) -> Result<Option<&'a str>, ActionError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ActionError::InvalidConfig(format!(
            "{key} must be a string, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
