//! Structured value <-> protobuf message conversion
//!
//! Conversion is driven by the field descriptors of the target message:
//!
//! | Field kind | Value |
//! |---|---|
//! | `bool` | `Bool` |
//! | signed integers | `Int` (encode also takes `Uint`, integral `Float` and decimal `String`) |
//! | unsigned integers | `Uint` (encode also takes `Int`, integral `Float` and decimal `String`) |
//! | `float`, `double` | `Float` (encode also takes integers) |
//! | `string` | `String` |
//! | `bytes` | `Bytes` (encode also takes `String`) |
//! | enum | `Int` ordinal (encode also takes the value name) |
//! | message | `Map` |
//! | `map<K, V>` | `Map`, keys rendered as strings |
//! | `repeated` | `List` |
//! | group | rejected with [`CodecError::UnsupportedKind`] |
//!
//! Decoding emits every field. Fields with explicit presence (messages,
//! `optional`, oneof members) that are unset decode to `Null`, which also
//! keeps self-referential messages finite. Encoding leaves absent keys and
//! `Null` values unset.

use crate::error::CodecError;
use mockwire_core::{Map, Value};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage,
    Value as ProtoValue,
};
use std::collections::HashMap;

/// Decode a protobuf payload into a structured value
pub fn decode_message(desc: &MessageDescriptor, bytes: &[u8]) -> Result<Value, CodecError> {
    let message = DynamicMessage::decode(desc.clone(), bytes)
        .map_err(|e| CodecError::Wire(e.to_string()))?;
    message_to_value(&message)
}

/// Encode a structured value into a protobuf payload
pub fn encode_message(desc: &MessageDescriptor, value: &Value) -> Result<Vec<u8>, CodecError> {
    use prost::Message as _;
    Ok(value_to_message(desc, value)?.encode_to_vec())
}

/// Convert a message into a map of every field
pub fn message_to_value(message: &DynamicMessage) -> Result<Value, CodecError> {
    let mut map = Map::new();

    for field in message.descriptor().fields() {
        if field.is_group() {
            return Err(unsupported(&field));
        }

        let value = if field.supports_presence() && !message.has_field(&field) {
            Value::Null
        } else {
            field_to_value(&field, &message.get_field(&field))?
        };

        map.insert(field.name().to_string(), value);
    }

    Ok(Value::Map(map))
}

/// Build a message of type `desc` from a map
///
/// `Null` produces an empty message.
pub fn value_to_message(desc: &MessageDescriptor, value: &Value) -> Result<DynamicMessage, CodecError> {
    let mut message = DynamicMessage::new(desc.clone());

    let map = match value {
        Value::Map(map) => map,
        Value::Null => return Ok(message),
        other => {
            return Err(CodecError::TypeMismatch {
                field: desc.full_name().to_string(),
                expected: "map",
                found: other.type_name(),
            })
        }
    };

    for (key, value) in map {
        let field = desc
            .get_field_by_name(key)
            .or_else(|| desc.get_field_by_json_name(key))
            .ok_or_else(|| CodecError::UnknownField {
                message: desc.full_name().to_string(),
                field: key.clone(),
            })?;

        if field.is_group() {
            return Err(unsupported(&field));
        }
        if value.is_null() {
            continue;
        }

        let proto = value_to_field(&field, value)?;
        message
            .try_set_field(&field, proto)
            .map_err(|e| CodecError::TypeMismatch {
                field: format!("{} ({e})", field.full_name()),
                expected: kind_name(&field.kind()),
                found: value.type_name(),
            })?;
    }

    Ok(message)
}

fn unsupported(field: &FieldDescriptor) -> CodecError {
    CodecError::UnsupportedKind {
        field: field.full_name().to_string(),
    }
}

// ----------------------------------------------------------------------------
// Decode

fn field_to_value(field: &FieldDescriptor, value: &ProtoValue) -> Result<Value, CodecError> {
    if field.is_map() {
        let entries = match value {
            ProtoValue::Map(entries) => entries,
            _ => return Err(decode_mismatch(field, "map", value)),
        };
        let value_field = map_value_field(field)?;

        let mut rendered: Vec<(String, Value)> = entries
            .iter()
            .map(|(k, v)| Ok((map_key_to_string(k), scalar_to_value(&value_field, v)?)))
            .collect::<Result<_, CodecError>>()?;
        // HashMap order is arbitrary; sort for stable output
        rendered.sort_by(|a, b| a.0.cmp(&b.0));

        return Ok(Value::Map(rendered.into_iter().collect()));
    }

    if field.is_list() {
        let items = match value {
            ProtoValue::List(items) => items,
            _ => return Err(decode_mismatch(field, "list", value)),
        };
        return items
            .iter()
            .map(|item| scalar_to_value(field, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }

    scalar_to_value(field, value)
}

fn scalar_to_value(field: &FieldDescriptor, value: &ProtoValue) -> Result<Value, CodecError> {
    Ok(match value {
        ProtoValue::Bool(b) => Value::Bool(*b),
        ProtoValue::I32(i) => Value::Int(i64::from(*i)),
        ProtoValue::I64(i) => Value::Int(*i),
        ProtoValue::U32(u) => Value::Uint(u64::from(*u)),
        ProtoValue::U64(u) => Value::Uint(*u),
        ProtoValue::F32(f) => Value::Float(f64::from(*f)),
        ProtoValue::F64(f) => Value::Float(*f),
        ProtoValue::String(s) => Value::String(s.clone()),
        ProtoValue::Bytes(b) => Value::Bytes(b.to_vec()),
        ProtoValue::EnumNumber(n) => Value::Int(i64::from(*n)),
        ProtoValue::Message(m) => message_to_value(m)?,
        ProtoValue::List(_) | ProtoValue::Map(_) => {
            return Err(decode_mismatch(field, "scalar or message", value))
        }
    })
}

/// Map keys are always rendered as strings: integers in decimal, bools as `true`/`false`
fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(i) => i.to_string(),
        MapKey::I64(i) => i.to_string(),
        MapKey::U32(u) => u.to_string(),
        MapKey::U64(u) => u.to_string(),
        MapKey::String(s) => s.clone(),
    }
}

fn decode_mismatch(field: &FieldDescriptor, expected: &'static str, value: &ProtoValue) -> CodecError {
    let found = match value {
        ProtoValue::List(_) => "list",
        ProtoValue::Map(_) => "map",
        ProtoValue::Message(_) => "message",
        _ => "scalar",
    };
    CodecError::TypeMismatch {
        field: field.full_name().to_string(),
        expected,
        found,
    }
}

// ----------------------------------------------------------------------------
// Encode

fn value_to_field(field: &FieldDescriptor, value: &Value) -> Result<ProtoValue, CodecError> {
    if field.is_map() {
        let entries = match value {
            Value::Map(entries) => entries,
            other => return Err(mismatch(field, "map", other)),
        };
        let key_field = map_key_field(field)?;
        let value_field = map_value_field(field)?;

        let mut map = HashMap::with_capacity(entries.len());
        for (key, item) in entries {
            let key = string_to_map_key(field, &key_field.kind(), key)?;
            let item = value_to_scalar(&value_field, &value_field.kind(), item)?;
            map.insert(key, item);
        }
        return Ok(ProtoValue::Map(map));
    }

    if field.is_list() {
        let items = match value {
            Value::List(items) => items,
            other => return Err(mismatch(field, "list", other)),
        };
        let kind = field.kind();
        return items
            .iter()
            .map(|item| value_to_scalar(field, &kind, item))
            .collect::<Result<Vec<_>, _>>()
            .map(ProtoValue::List);
    }

    value_to_scalar(field, &field.kind(), value)
}

fn value_to_scalar(field: &FieldDescriptor, kind: &Kind, value: &Value) -> Result<ProtoValue, CodecError> {
    match kind {
        Kind::Bool => match value {
            Value::Bool(b) => Ok(ProtoValue::Bool(*b)),
            other => Err(mismatch(field, "bool", other)),
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            let i = to_i64(field, kind, value)?;
            i32::try_from(i)
                .map(ProtoValue::I32)
                .map_err(|_| out_of_range(field, kind, value))
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => to_i64(field, kind, value).map(ProtoValue::I64),
        Kind::Uint32 | Kind::Fixed32 => {
            let u = to_u64(field, kind, value)?;
            u32::try_from(u)
                .map(ProtoValue::U32)
                .map_err(|_| out_of_range(field, kind, value))
        }
        Kind::Uint64 | Kind::Fixed64 => to_u64(field, kind, value).map(ProtoValue::U64),
        Kind::Float => {
            let f = value.as_f64().ok_or_else(|| mismatch(field, "number", value))?;
            if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(out_of_range(field, kind, value));
            }
            Ok(ProtoValue::F32(f as f32))
        }
        Kind::Double => value
            .as_f64()
            .map(ProtoValue::F64)
            .ok_or_else(|| mismatch(field, "number", value)),
        Kind::String => match value {
            Value::String(s) => Ok(ProtoValue::String(s.clone())),
            other => Err(mismatch(field, "string", other)),
        },
        Kind::Bytes => match value {
            Value::Bytes(b) => Ok(ProtoValue::Bytes(b.clone().into())),
            Value::String(s) => Ok(ProtoValue::Bytes(s.clone().into_bytes().into())),
            other => Err(mismatch(field, "bytes", other)),
        },
        Kind::Enum(desc) => match value {
            Value::String(name) => desc
                .get_value_by_name(name)
                .map(|v| ProtoValue::EnumNumber(v.number()))
                .ok_or_else(|| CodecError::UnknownEnumValue {
                    field: field.full_name().to_string(),
                    name: name.clone(),
                }),
            Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
                let n = to_i64(field, kind, value)?;
                i32::try_from(n)
                    .map(ProtoValue::EnumNumber)
                    .map_err(|_| out_of_range(field, kind, value))
            }
            other => Err(mismatch(field, "integer ordinal", other)),
        },
        Kind::Message(desc) => {
            if field.is_group() {
                return Err(unsupported(field));
            }
            value_to_message(desc, value).map(ProtoValue::Message)
        }
    }
}

fn to_i64(field: &FieldDescriptor, kind: &Kind, value: &Value) -> Result<i64, CodecError> {
    match value {
        Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
            value.as_i64().ok_or_else(|| out_of_range(field, kind, value))
        }
        Value::String(s) => {
            let n = parse_decimal(field, s, value)?;
            i64::try_from(n).map_err(|_| out_of_range(field, kind, value))
        }
        other => Err(mismatch(field, "integer", other)),
    }
}

fn to_u64(field: &FieldDescriptor, kind: &Kind, value: &Value) -> Result<u64, CodecError> {
    match value {
        Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
            value.as_u64().ok_or_else(|| out_of_range(field, kind, value))
        }
        Value::String(s) => {
            let n = parse_decimal(field, s, value)?;
            u64::try_from(n).map_err(|_| out_of_range(field, kind, value))
        }
        other => Err(mismatch(field, "integer", other)),
    }
}

/// Integers may arrive as decimal strings, as in the protobuf JSON mapping
fn parse_decimal(field: &FieldDescriptor, s: &str, value: &Value) -> Result<i128, CodecError> {
    s.trim()
        .parse::<i128>()
        .map_err(|_| mismatch(field, "integer", value))
}

fn string_to_map_key(field: &FieldDescriptor, kind: &Kind, key: &str) -> Result<MapKey, CodecError> {
    let invalid = || CodecError::InvalidMapKey {
        field: field.full_name().to_string(),
        key: key.to_string(),
        kind: kind_name(kind),
    };

    match kind {
        Kind::String => Ok(MapKey::String(key.to_string())),
        Kind::Bool => match key {
            "true" => Ok(MapKey::Bool(true)),
            "false" => Ok(MapKey::Bool(false)),
            _ => Err(invalid()),
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => key.parse().map(MapKey::I32).map_err(|_| invalid()),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => key.parse().map(MapKey::I64).map_err(|_| invalid()),
        Kind::Uint32 | Kind::Fixed32 => key.parse().map(MapKey::U32).map_err(|_| invalid()),
        Kind::Uint64 | Kind::Fixed64 => key.parse().map(MapKey::U64).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn map_entry(field: &FieldDescriptor) -> Result<MessageDescriptor, CodecError> {
    match field.kind() {
        Kind::Message(entry) if entry.is_map_entry() => Ok(entry),
        other => Err(CodecError::TypeMismatch {
            field: field.full_name().to_string(),
            expected: "map entry",
            found: kind_name(&other),
        }),
    }
}

fn map_key_field(field: &FieldDescriptor) -> Result<FieldDescriptor, CodecError> {
    map_entry(field).map(|entry| entry.map_entry_key_field())
}

fn map_value_field(field: &FieldDescriptor) -> Result<FieldDescriptor, CodecError> {
    map_entry(field).map(|entry| entry.map_entry_value_field())
}

fn mismatch(field: &FieldDescriptor, expected: &'static str, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        field: field.full_name().to_string(),
        expected,
        found: value.type_name(),
    }
}

fn out_of_range(field: &FieldDescriptor, kind: &Kind, value: &Value) -> CodecError {
    CodecError::OutOfRange {
        field: field.full_name().to_string(),
        kind: kind_name(kind),
        value: value.to_string(),
    }
}

fn kind_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(_) => "message",
        Kind::Enum(_) => "enum",
    }
}
