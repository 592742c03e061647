//! Typed access to tool call arguments.

use crate::error::RociError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the raw argument string sent by the model.
    ///
    /// Blank input is treated as an empty object.
    pub fn parse(raw: &str) -> Result<Self, RociError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        serde_json::from_str(trimmed)
            .map(Self::new)
            .map_err(|e| RociError::ModelBehavior(format!("invalid JSON tool arguments: {e}")))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, RociError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| RociError::ModelBehavior(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, RociError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| RociError::ModelBehavior(format!("Missing integer argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, RociError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| RociError::ModelBehavior(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, RociError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            RociError::ModelBehavior(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
