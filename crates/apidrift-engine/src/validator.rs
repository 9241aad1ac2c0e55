//! Response body validation against contract schemas
//!
//! Structural checking is delegated to the `jsonschema` crate; the
//! targeted field-type, required-field, and format checks mirror what the
//! contract vocabulary declares.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .expect("uri pattern compiles")
});

/// Key the validated subtree is grafted under so that internal
/// `#/components/schemas/...` pointers resolve against the contract root.
const VALIDATION_ROOT_KEY: &str = "x-validation-root";

/// Validates JSON data against contract schemas
///
/// Nonconformant data is reported as a list of messages, never as an
/// error value; an empty list is the only signal that data is valid.
#[derive(Debug, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate data against a schema subtree
    ///
    /// When the serialized subtree contains a `$ref` marker and a full
    /// contract is supplied, references are resolved against that
    /// contract's root. Without a full contract, a subtree containing
    /// references cannot be compiled and the failure is reported in the
    /// returned list (a validator limitation, not a contract violation).
    ///
    /// Each message is `<path>: <reason>`, where `<path>` locates the
    /// violation inside `data` (` -> `-joined, or `root` at the top).
    pub fn validate(
        &self,
        data: &Value,
        schema: &Value,
        full_contract: Option<&Value>,
    ) -> Vec<String> {
        let target = match full_contract {
            Some(contract) if schema.to_string().contains("\"$ref\"") => {
                graft_onto_contract(schema, contract)
            }
            _ => schema.clone(),
        };

        let validator = match jsonschema::validator_for(&target) {
            Ok(v) => v,
            Err(e) => return vec![format!("root: schema failed to compile: {e}")],
        };

        validator
            .iter_errors(data)
            .map(|error| {
                let pointer = error.instance_path.to_string();
                let path = if pointer.is_empty() {
                    "root".to_string()
                } else {
                    pointer.trim_start_matches('/').replace('/', " -> ")
                };
                format!("{path}: {error}")
            })
            .collect()
    }

    /// Check runtime types of declared properties present in the data
    ///
    /// Properties declared but absent from the data are skipped; absence
    /// is a required-field concern, not a type concern.
    pub fn validate_field_types(&self, data: &Value, schema: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return errors;
        };

        for (field_name, field_schema) in properties {
            let Some(field_value) = data.get(field_name) else {
                continue;
            };
            let Some(expected_type) = field_schema.get("type").and_then(Value::as_str) else {
                continue;
            };

            if !check_type(field_value, expected_type) {
                errors.push(format!(
                    "Field '{}': expected {}, got {}",
                    field_name,
                    expected_type,
                    json_type_name(field_value)
                ));
            }
        }

        errors
    }

    /// One message per declared required field missing from the data
    pub fn validate_required_fields(&self, data: &Value, schema: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        let Some(required) = schema.get("required").and_then(Value::as_array) else {
            return errors;
        };

        for field in required.iter().filter_map(Value::as_str) {
            if data.get(field).is_none() {
                errors.push(format!("Required field '{field}' is missing"));
            }
        }

        errors
    }

    /// Check a string against the fixed email pattern
    ///
    /// Deliberately a subset of RFC validity; the acceptance set of this
    /// exact pattern is part of the contract with callers.
    pub fn validate_email_format(&self, email: &str) -> bool {
        EMAIL_PATTERN.is_match(email)
    }

    /// Check a value against a named format
    ///
    /// Dispatches `email` and `uri`; every other format name passes.
    pub fn validate_format(&self, value: &Value, format_type: &str) -> bool {
        match format_type {
            "email" => self.validate_email_format(&scalar_text(value)),
            "uri" => URI_PATTERN.is_match(&scalar_text(value)),
            _ => true,
        }
    }
}

/// Graft the subtree onto a clone of the full contract so that internal
/// reference pointers resolve during compilation.
fn graft_onto_contract(schema: &Value, contract: &Value) -> Value {
    let mut root = contract.clone();
    match root.as_object_mut() {
        Some(obj) => {
            obj.insert(VALIDATION_ROOT_KEY.to_string(), schema.clone());
            obj.insert(
                "$ref".to_string(),
                Value::String(format!("#/{VALIDATION_ROOT_KEY}")),
            );
            root
        }
        None => schema.clone(),
    }
}

/// Fixed JSON type-name mapping; unknown type names always pass.
fn check_type(value: &Value, expected_type: &str) -> bool {
    match expected_type {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
