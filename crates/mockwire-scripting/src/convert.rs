//! Conversion between structured values and Rhai values

use crate::error::{Result, ScriptError};
use mockwire_core::{Map, Value};
use rhai::{Array, Dynamic, FLOAT, INT};

/// Convert a structured value into a Rhai value
///
/// Unsigned integers beyond the Rhai integer range become decimal strings,
/// which the protobuf codec accepts back for integer fields.
pub fn to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(b),
        Value::Int(i) => Dynamic::from_int(i as INT),
        Value::Uint(u) => match INT::try_from(u) {
            Ok(i) => Dynamic::from_int(i),
            Err(_) => Dynamic::from(u.to_string()),
        },
        Value::Float(f) => Dynamic::from_float(f as FLOAT),
        Value::String(s) => Dynamic::from(s),
        Value::Bytes(b) => Dynamic::from_blob(b),
        Value::List(items) => {
            Dynamic::from_array(items.into_iter().map(to_dynamic).collect::<Array>())
        }
        Value::Map(map) => Dynamic::from_map(
            map.into_iter()
                .map(|(k, v)| (k.into(), to_dynamic(v)))
                .collect::<rhai::Map>(),
        ),
    }
}

/// Convert a Rhai value into a structured value
///
/// Characters become one-character strings. Functions pointers, timestamps
/// and custom types are rejected.
pub fn from_dynamic(value: Dynamic) -> Result<Value> {
    let value = value.flatten();

    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Int(i as i64));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Value::Float(f as f64));
    }
    if let Ok(c) = value.as_char() {
        return Ok(Value::String(c.to_string()));
    }
    if value.is_string() {
        return value
            .into_string()
            .map(Value::String)
            .map_err(|t| ScriptError::type_error(format!("expected string, got {t}")));
    }
    if value.is_blob() {
        return value
            .into_blob()
            .map(Value::Bytes)
            .map_err(|t| ScriptError::type_error(format!("expected blob, got {t}")));
    }
    if value.is_array() {
        let items = value
            .into_array()
            .map_err(|t| ScriptError::type_error(format!("expected array, got {t}")))?;
        return items
            .into_iter()
            .map(from_dynamic)
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }
    if value.is_map() {
        let type_name = value.type_name();
        let map = value
            .try_cast::<rhai::Map>()
            .ok_or_else(|| ScriptError::type_error(format!("expected map, got {type_name}")))?;
        return map
            .into_iter()
            .map(|(k, v)| Ok((k.to_string(), from_dynamic(v)?)))
            .collect::<Result<Map>>()
            .map(Value::Map);
    }

    Err(ScriptError::type_error(format!(
        "value of type '{}' cannot leave the script",
        value.type_name()
    )))
}
