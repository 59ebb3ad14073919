use std::collections::BTreeMap;

/// A typed parameter value ready for template substitution. This is the
/// tagged sum type the design notes call for in place of a dynamically
/// typed bag: callers build it either directly or via
/// `enact-schema`'s coercion output.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    String(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    Null,
    Array(Vec<Param>),
    Object(BTreeMap<String, Param>),
}

impl From<&serde_json::Value> for Param {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Param::Null,
            serde_json::Value::Bool(b) => Param::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Param::Integer(i)
                } else {
                    Param::Number(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Param::String(s.clone()),
            serde_json::Value::Array(items) => Param::Array(items.iter().map(Param::from).collect()),
            serde_json::Value::Object(map) => {
                Param::Object(map.iter().map(|(k, v)| (k.clone(), Param::from(v))).collect())
            }
        }
    }
}

impl From<Param> for serde_json::Value {
    fn from(param: Param) -> Self {
        match param {
            Param::String(s) => serde_json::Value::String(s),
            Param::Integer(i) => serde_json::Value::from(i),
            Param::Number(n) => serde_json::json!(n),
            Param::Bool(b) => serde_json::Value::Bool(b),
            Param::Null => serde_json::Value::Null,
            Param::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Param::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}
