//! Three-source input assembly: an input file, a JSON args string, and
//! `key=value` flags, each overriding the one before.

use crate::errors::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::path::Path;

/// Merges the three accepted input sources in override order (file,
/// then args JSON, then flags) into a single JSON object.
pub fn parse_inputs(
    input_file: Option<&Path>,
    args_json: Option<&str>,
    flags: &[String],
) -> CoreResult<Value> {
    let mut merged = Map::new();

    if let Some(path) = input_file {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Io(path.to_path_buf(), e))?;
        let value: Value = serde_json::from_str(&raw)?;
        merge_object(&mut merged, value)?;
    }

    if let Some(args) = args_json {
        let value: Value = serde_json::from_str(args)?;
        merge_object(&mut merged, value)?;
    }

    for flag in flags {
        let (key, raw_value) = flag
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidKeyValue(flag.clone()))?;
        let value = serde_json::from_str(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()));
        merged.insert(key.to_string(), value);
    }

    Ok(Value::Object(merged))
}

fn merge_object(into: &mut Map<String, Value>, value: Value) -> CoreResult<()> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                into.insert(k, v);
            }
            Ok(())
        }
        other => Err(CoreError::InputNotAnObject(other.to_string())),
    }
}
