//! Structured output schemas.

use std::fmt;

use crate::error::RociError;
use crate::tools::validation::validate_arguments;

/// Describes the final output an agent must produce.
pub trait OutputSchema: Send + Sync {
    /// Name of the output type.
    fn name(&self) -> &str;

    /// Plain text output needs no response-format constraint.
    fn is_plain_text(&self) -> bool;

    fn is_strict_json_schema(&self) -> bool;

    /// JSON Schema of the output. Meaningless for plain-text schemas.
    fn json_schema(&self) -> serde_json::Value;

    /// Parse and validate the model's raw output.
    fn validate_json(&self, raw: &str) -> Result<serde_json::Value, RociError>;
}

impl fmt::Debug for dyn OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSchema")
            .field("name", &self.name())
            .field("plain_text", &self.is_plain_text())
            .finish()
    }
}

/// Free-text output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextOutput;

impl OutputSchema for PlainTextOutput {
    fn name(&self) -> &str {
        "str"
    }

    fn is_plain_text(&self) -> bool {
        true
    }

    fn is_strict_json_schema(&self) -> bool {
        false
    }

    fn json_schema(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn validate_json(&self, raw: &str) -> Result<serde_json::Value, RociError> {
        Ok(serde_json::Value::String(raw.to_string()))
    }
}

/// Output described by a JSON Schema document.
#[derive(Debug, Clone)]
pub struct JsonSchemaOutput {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

impl JsonSchemaOutput {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl OutputSchema for JsonSchemaOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_plain_text(&self) -> bool {
        false
    }

    fn is_strict_json_schema(&self) -> bool {
        self.strict
    }

    fn json_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    fn validate_json(&self, raw: &str) -> Result<serde_json::Value, RociError> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            RociError::ModelBehavior(format!("output for '{}' is not valid JSON: {e}", self.name))
        })?;
        validate_arguments(&value, &self.schema).map_err(|reason| {
            RociError::ModelBehavior(format!(
                "output does not match schema '{}': {reason}",
                self.name
            ))
        })?;
        Ok(value)
    }
}
