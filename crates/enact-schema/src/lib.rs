//! Validates a parameter map against the JSON-schema subset a skill's
//! `input_schema` is allowed to use: `object`/`string`/`number`/
//! `integer`/`boolean`/`array`, `required`, `default`, `enum`. Applies
//! defaults and coerces compatible string inputs to their declared
//! type. Performs no I/O.

use serde_json::{Map, Value};

/// A single validation failure, addressed by a JSON-pointer-like path
/// (e.g. `items[2].name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Outcome of validating a parameter map against a schema.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub coerced_values: Option<Value>,
    pub errors: Vec<FieldError>,
}

/// Validates `input` against `schema`, applying defaults for missing
/// optional properties and coercing compatible string inputs (e.g.
/// `"true"` -> `true`, `"42"` -> `42`) when the schema demands a
/// narrower type. Never performs network I/O.
pub fn validate(schema: &Value, input: &Value) -> ValidationOutcome {
    let mut errors = Vec::new();
    let coerced = walk(schema, input, "$", &mut errors);
    ValidationOutcome {
        valid: errors.is_empty(),
        coerced_values: if errors.is_empty() { Some(coerced) } else { None },
        errors,
    }
}

fn walk(schema: &Value, input: &Value, path: &str, errors: &mut Vec<FieldError>) -> Value {
    let schema_type = schema.get("type").and_then(Value::as_str).unwrap_or("object");

    match schema_type {
        "object" => walk_object(schema, input, path, errors),
        "array" => walk_array(schema, input, path, errors),
        "string" => coerce_scalar(schema, input, path, errors, "string"),
        "number" => coerce_scalar(schema, input, path, errors, "number"),
        "integer" => coerce_scalar(schema, input, path, errors, "integer"),
        "boolean" => coerce_scalar(schema, input, path, errors, "boolean"),
        other => {
            errors.push(FieldError {
                path: path.to_string(),
                message: format!("unsupported schema type '{other}'"),
            });
            input.clone()
        }
    }
}

fn walk_object(schema: &Value, input: &Value, path: &str, errors: &mut Vec<FieldError>) -> Value {
    let empty_map = Map::new();
    let input_map = input.as_object().unwrap_or(&empty_map);
    let empty_props = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty_props);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut out = Map::new();
    for (name, prop_schema) in properties {
        let child_path = if path == "$" {
            name.clone()
        } else {
            format!("{path}.{name}")
        };
        match input_map.get(name) {
            Some(value) => {
                let coerced = walk(prop_schema, value, &child_path, errors);
                out.insert(name.clone(), coerced);
            }
            None => {
                if let Some(default) = prop_schema.get("default") {
                    out.insert(name.clone(), default.clone());
                } else if required.contains(&name.as_str()) {
                    errors.push(FieldError {
                        path: child_path,
                        message: format!("missing required field '{name}'"),
                    });
                }
            }
        }
    }

    // Pass through properties not declared in the schema verbatim,
    // matching "walks the declared schema and the provided map in
    // parallel" rather than rejecting additional properties outright.
    for (name, value) in input_map {
        if !properties.contains_key(name) {
            out.insert(name.clone(), value.clone());
        }
    }

    Value::Object(out)
}

fn walk_array(schema: &Value, input: &Value, path: &str, errors: &mut Vec<FieldError>) -> Value {
    let items = match input.as_array() {
        Some(items) => items,
        None => {
            errors.push(FieldError {
                path: path.to_string(),
                message: "expected an array".to_string(),
            });
            return input.clone();
        }
    };
    let item_schema = schema.get("items");
    let coerced: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let child_path = format!("{path}[{i}]");
            match item_schema {
                Some(item_schema) => walk(item_schema, item, &child_path, errors),
                None => item.clone(),
            }
        })
        .collect();
    Value::Array(coerced)
}

fn coerce_scalar(
    schema: &Value,
    input: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
    expected: &str,
) -> Value {
    let coerced = match (expected, input) {
        ("string", Value::String(_)) => Some(input.clone()),
        ("string", other) => Some(Value::String(stringify(other))),
        ("boolean", Value::Bool(_)) => Some(input.clone()),
        ("boolean", Value::String(s)) if s == "true" => Some(Value::Bool(true)),
        ("boolean", Value::String(s)) if s == "false" => Some(Value::Bool(false)),
        ("integer", Value::Number(n)) if n.is_i64() || n.is_u64() => Some(input.clone()),
        ("integer", Value::String(s)) => s.parse::<i64>().ok().map(Value::from),
        ("number", Value::Number(_)) => Some(input.clone()),
        ("number", Value::String(s)) => s.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f)).map(Value::Number),
        _ => None,
    };

    let coerced = match coerced {
        Some(v) => v,
        None => {
            errors.push(FieldError {
                path: path.to_string(),
                message: format!("expected {expected}, got {}", type_name(input)),
            });
            return input.clone();
        }
    };

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.iter().any(|candidate| values_equal(candidate, &coerced)) {
            errors.push(FieldError {
                path: path.to_string(),
                message: "value is not one of the allowed enum values".to_string(),
            });
        }
    }

    coerced
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a == b,
        _ => a == b,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "retries": {"type": "integer", "default": 3},
                "verbose": {"type": "boolean"},
                "mode": {"type": "string", "enum": ["fast", "slow"]},
                "items": {"type": "array", "items": {"name": {"type": "string"}}}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn fills_defaults_for_missing_optional_fields() {
        let outcome = validate(&schema(), &json!({"name": "alice"}));
        assert!(outcome.valid);
        assert_eq!(outcome.coerced_values.unwrap()["retries"], json!(3));
    }

    #[test]
    fn rejects_missing_required_field_with_no_default() {
        let outcome = validate(&schema(), &json!({}));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors[0].path, "name");
    }

    #[test]
    fn coerces_boolean_and_integer_strings() {
        let outcome = validate(
            &schema(),
            &json!({"name": "alice", "retries": "5", "verbose": "true"}),
        );
        assert!(outcome.valid);
        let coerced = outcome.coerced_values.unwrap();
        assert_eq!(coerced["retries"], json!(5));
        assert_eq!(coerced["verbose"], json!(true));
    }

    #[test]
    fn enforces_enum_membership() {
        let outcome = validate(&schema(), &json!({"name": "alice", "mode": "turbo"}));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors[0].path, "mode");
    }

    #[test]
    fn nested_array_item_errors_use_bracket_path() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {"type": "array", "items": {"type": "integer"}}
            }
        });
        let outcome = validate(&schema, &json!({"items": [1, "oops", 3]}));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors[0].path, "items[1]");
    }
}
