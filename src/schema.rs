//! Schema Translation
//!
//! Pure, stateless mapping between the tool-side input schema and the
//! agent-side skill parameter schema. Both formats are JSON-Schema-like;
//! translation normalizes a schema to the supported subset:
//!
//! | local     | remote    |
//! |-----------|-----------|
//! | string    | string    |
//! | number    | number    |
//! | integer   | integer   |
//! | boolean   | boolean   |
//! | array     | array (items mapped recursively) |
//! | object    | object (properties mapped recursively, required preserved) |
//!
//! Unsupported constructs are dropped deterministically and unknown types
//! degrade to `string`; degradations are logged at the boundary, never
//! raised. Because both directions normalize to the same subset, a
//! local -> remote -> local round trip accepts at least the value set the
//! original schema accepted: dropping constraints only ever widens.
//!
//! An absent or unspecified schema on either side maps to the documented
//! fallback: a single required free-form string parameter named
//! [`FALLBACK_PARAM`].

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::{BridgeError, BridgeResult};
use crate::types::ToolArgs;

/// Name of the free-form parameter used when no schema is given
pub const FALLBACK_PARAM: &str = "input";

const SUPPORTED_TYPES: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];

/// The fallback schema for tools and skills without a declared schema
pub fn fallback_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            FALLBACK_PARAM: {
                "type": "string",
                "description": "Free-form text input"
            }
        },
        "required": [FALLBACK_PARAM]
    })
}

/// Translate a tool input schema into skill parameters
pub fn to_remote_schema(input_schema: &Value) -> Value {
    normalize(Some(input_schema))
}

/// Translate skill parameters into a tool input schema
///
/// `None` means the skill accepts free-form text and maps to the fallback.
pub fn to_local_schema(parameters: Option<&Value>) -> Value {
    normalize(parameters)
}

fn normalize(schema: Option<&Value>) -> Value {
    let Some(schema) = schema else {
        return fallback_schema();
    };

    match schema.as_object() {
        None => {
            if !schema.is_null() {
                warn!(schema = %schema, "schema is not an object; using fallback");
            }
            fallback_schema()
        }
        Some(obj) if obj.is_empty() => fallback_schema(),
        Some(_) => {
            let node = translate_node(schema, "$");
            // Parameters are a named mapping, so the top level must be an
            // object schema; anything else widens to the fallback.
            if node.get("type").and_then(Value::as_str) == Some("object") {
                node
            } else {
                warn!(schema = %schema, "top-level schema is not an object; using fallback");
                fallback_schema()
            }
        }
    }
}

fn translate_node(schema: &Value, path: &str) -> Value {
    let Some(obj) = schema.as_object() else {
        warn!(path, "non-object schema node; degrading to string");
        return json!({"type": "string"});
    };

    let declared = obj.get("type").and_then(Value::as_str);
    let ty = match declared {
        Some(t) if SUPPORTED_TYPES.contains(&t) => t,
        Some(other) => {
            warn!(path, declared = other, "unsupported schema type; degrading to string");
            "string"
        }
        None if obj.contains_key("properties") => "object",
        None => {
            warn!(path, "schema node without a type; degrading to string");
            "string"
        }
    };

    let mut out = Map::new();
    out.insert("type".into(), Value::String(ty.into()));
    if let Some(description) = obj.get("description").and_then(Value::as_str) {
        out.insert("description".into(), Value::String(description.into()));
    }

    match ty {
        "array" => {
            let items = obj
                .get("items")
                .map(|items| translate_node(items, &format!("{path}[]")))
                .unwrap_or_else(|| json!({"type": "string"}));
            out.insert("items".into(), items);
        }
        "object" => {
            let mut props = Map::new();
            if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
                for (name, prop) in properties {
                    props.insert(name.clone(), translate_node(prop, &format!("{path}.{name}")));
                }
            }
            out.insert("properties".into(), Value::Object(props));

            if let Some(required) = obj.get("required").and_then(Value::as_array) {
                let required: Vec<Value> =
                    required.iter().filter(|r| r.is_string()).cloned().collect();
                if !required.is_empty() {
                    out.insert("required".into(), Value::Array(required));
                }
            }
        }
        _ => {}
    }

    Value::Object(out)
}

/// Structurally validate named parameters against a schema
///
/// The schema is normalized first, so validation only ever narrows on the
/// constructs translation keeps. Parameters not declared by the schema are
/// accepted.
pub fn validate_input(schema: &Value, args: &ToolArgs) -> BridgeResult<()> {
    let normalized = normalize(Some(schema));

    if let Some(required) = normalized.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(name) {
                return Err(BridgeError::schema_validation(format!(
                    "missing required parameter '{name}'"
                )));
            }
        }
    }

    if let Some(props) = normalized.get("properties").and_then(Value::as_object) {
        for (name, value) in args {
            if let Some(prop_schema) = props.get(name) {
                check_value(prop_schema, value, name)?;
            }
        }
    }

    Ok(())
}

fn check_value(schema: &Value, value: &Value, path: &str) -> BridgeResult<()> {
    let ty = schema.get("type").and_then(Value::as_str).unwrap_or("string");

    let matches_type = match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => {
            let Some(elements) = value.as_array() else {
                return Err(type_mismatch(path, ty));
            };
            if let Some(items) = schema.get("items") {
                for (index, element) in elements.iter().enumerate() {
                    check_value(items, element, &format!("{path}[{index}]"))?;
                }
            }
            true
        }
        "object" => {
            let Some(map) = value.as_object() else {
                return Err(type_mismatch(path, ty));
            };
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if !map.contains_key(name) {
                        return Err(BridgeError::schema_validation(format!(
                            "missing required parameter '{path}.{name}'"
                        )));
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (name, nested) in map {
                    if let Some(prop_schema) = props.get(name) {
                        check_value(prop_schema, nested, &format!("{path}.{name}"))?;
                    }
                }
            }
            true
        }
        _ => true,
    };

    if matches_type {
        Ok(())
    } else {
        Err(type_mismatch(path, ty))
    }
}

fn type_mismatch(path: &str, expected: &str) -> BridgeError {
    BridgeError::schema_validation(format!("parameter '{path}' must be of type {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(fallback_schema(), fallback_schema());
        assert_eq!(to_local_schema(None), fallback_schema());
        assert_eq!(to_remote_schema(&json!({})), fallback_schema());
        assert_eq!(to_remote_schema(&Value::Null), fallback_schema());
    }

    #[test]
    fn test_supported_types_map_to_themselves() {
        let schema = json!({
            "type": "object",
            "properties": {
                "s": {"type": "string"},
                "n": {"type": "number"},
                "i": {"type": "integer"},
                "b": {"type": "boolean"},
                "a": {"type": "array", "items": {"type": "integer"}},
                "o": {
                    "type": "object",
                    "properties": {"inner": {"type": "string"}},
                    "required": ["inner"]
                }
            },
            "required": ["s", "n"]
        });

        let remote = to_remote_schema(&schema);
        let props = remote["properties"].as_object().unwrap();
        assert_eq!(props["s"]["type"], "string");
        assert_eq!(props["n"]["type"], "number");
        assert_eq!(props["i"]["type"], "integer");
        assert_eq!(props["b"]["type"], "boolean");
        assert_eq!(props["a"]["items"]["type"], "integer");
        assert_eq!(props["o"]["properties"]["inner"]["type"], "string");
        assert_eq!(props["o"]["required"], json!(["inner"]));
        assert_eq!(remote["required"], json!(["s", "n"]));
    }

    #[test]
    fn test_unknown_type_degrades_to_string() {
        let schema = json!({
            "type": "object",
            "properties": {"when": {"type": "date-time"}}
        });
        let remote = to_remote_schema(&schema);
        assert_eq!(remote["properties"]["when"]["type"], "string");
    }

    #[test]
    fn test_unsupported_constructs_are_dropped() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 3, "pattern": "^a"}
            },
            "additionalProperties": false
        });
        let remote = to_remote_schema(&schema);
        let name = remote["properties"]["name"].as_object().unwrap();
        assert!(!name.contains_key("minLength"));
        assert!(!name.contains_key("pattern"));
        assert!(!remote.as_object().unwrap().contains_key("additionalProperties"));
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "the text"},
                "count": {"type": "integer", "minimum": 0}
            },
            "required": ["text"]
        });

        let remote = to_remote_schema(&schema);
        let local = to_local_schema(Some(&remote));
        assert_eq!(local, remote);
        assert_eq!(to_remote_schema(&local), local);
    }

    #[test]
    fn test_round_trip_widens_acceptance() {
        // minLength is dropped by translation; a value the original schema
        // would reject must still validate after the round trip.
        let original = json!({
            "type": "object",
            "properties": {"name": {"type": "string", "minLength": 10}},
            "required": ["name"]
        });
        let round_tripped = to_local_schema(Some(&to_remote_schema(&original)));

        let input = args(json!({"name": "ab"}));
        assert!(validate_input(&round_tripped, &input).is_ok());
        // Values the original accepts stay accepted.
        let input = args(json!({"name": "a long enough name"}));
        assert!(validate_input(&round_tripped, &input).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let schema = json!({
            "type": "object",
            "properties": {"input": {"type": "string"}},
            "required": ["input"]
        });
        let err = validate_input(&schema, &ToolArgs::new()).unwrap_err();
        assert_eq!(err.code(), "SchemaValidationError");
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn test_validate_type_mismatch() {
        let schema = json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}}
        });
        let err = validate_input(&schema, &args(json!({"count": "three"}))).unwrap_err();
        assert_eq!(err.code(), "SchemaValidationError");
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_validate_nested_structures() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "options": {
                    "type": "object",
                    "properties": {"depth": {"type": "integer"}},
                    "required": ["depth"]
                }
            }
        });

        let ok = args(json!({"tags": ["a", "b"], "options": {"depth": 2}}));
        assert!(validate_input(&schema, &ok).is_ok());

        let bad_element = args(json!({"tags": ["a", 1]}));
        assert!(validate_input(&schema, &bad_element).is_err());

        let missing_nested = args(json!({"options": {}}));
        assert!(validate_input(&schema, &missing_nested).is_err());
    }

    #[test]
    fn test_validate_accepts_undeclared_parameters() {
        let schema = json!({
            "type": "object",
            "properties": {"input": {"type": "string"}}
        });
        let input = args(json!({"input": "hi", "extra": 42}));
        assert!(validate_input(&schema, &input).is_ok());
    }

    #[test]
    fn test_free_form_schema_requires_input_parameter() {
        let err = validate_input(&json!({}), &ToolArgs::new()).unwrap_err();
        assert_eq!(err.code(), "SchemaValidationError");

        let ok = args(json!({FALLBACK_PARAM: "anything"}));
        assert!(validate_input(&json!({}), &ok).is_ok());
    }
}
