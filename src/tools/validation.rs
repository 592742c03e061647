//! Validate JSON values (tool arguments, handoff input, structured output)
//! against a JSON Schema subset.
//!
//! Supported keywords: `type` (string or list), `required`, `properties`,
//! `additionalProperties: false`, `enum`, and `items`. Unknown keywords are
//! ignored.

/// Validate a value against a JSON Schema.
///
/// Returns `Ok(())` when valid, `Err(message)` describing the first
/// violation found. Paths in messages use dotted notation rooted at `$`.
pub fn validate_arguments(
    args: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), String> {
    validate_at("$", args, schema)
}

fn validate_at(
    path: &str,
    value: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), String> {
    if let Some(expected) = schema.get("type") {
        let matches = match expected {
            serde_json::Value::String(t) => value_matches_type(value, t),
            serde_json::Value::Array(types) => types
                .iter()
                .filter_map(|t| t.as_str())
                .any(|t| value_matches_type(value, t)),
            _ => true,
        };
        if !matches {
            return Err(format!(
                "{path}: expected type {expected}, got {}",
                json_type_name(value)
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(|v| v.as_array()) {
        if !allowed.contains(value) {
            return Err(format!("{path}: value {value} is not one of {allowed:?}"));
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
            for field in required.iter().filter_map(|f| f.as_str()) {
                if !obj.contains_key(field) {
                    return Err(format!("{path}: missing required field '{field}'"));
                }
            }
        }

        let properties = schema.get("properties").and_then(|v| v.as_object());
        let closed = schema.get("additionalProperties") == Some(&serde_json::Value::Bool(false));
        for (key, field_value) in obj {
            match properties.and_then(|p| p.get(key)) {
                Some(prop_schema) => {
                    validate_at(&format!("{path}.{key}"), field_value, prop_schema)?;
                }
                None if closed => {
                    return Err(format!("{path}: unexpected field '{key}'"));
                }
                None => {}
            }
        }
    }

    if let (Some(items), Some(item_schema)) = (value.as_array(), schema.get("items")) {
        for (index, item) in items.iter().enumerate() {
            validate_at(&format!("{path}[{index}]"), item, item_schema)?;
        }
    }

    Ok(())
}

fn value_matches_type(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
