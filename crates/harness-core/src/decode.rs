//! JSON to dynamic message decoding
//!
//! Follows the protobuf JSON mapping: fields are matched by their proto
//! name or their lowerCamelCase JSON name, `null` leaves a field unset and
//! the well-known types accept their canonical string forms.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde_json::Value as Json;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::{
    ANY, DURATION, FieldDescriptor, FieldType, MessageDescriptor, ScalarType, Schema, TIMESTAMP,
};
use crate::value::{DynamicMessage, Value};

/// Decode a JSON document into an instance of `type_name`
pub fn decode(schema: &Schema, type_name: &str, json: &Json) -> Result<DynamicMessage> {
    let descriptor = schema.message(type_name)?;
    Decoder { schema }.message(descriptor, json, "")
}

struct Decoder<'a> {
    schema: &'a Schema,
}

fn error(path: &str, message: impl Into<String>) -> Error {
    Error::Decode {
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.to_string()
        },
        message: message.into(),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

impl Decoder<'_> {
    fn message(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        path: &str,
    ) -> Result<DynamicMessage> {
        match (descriptor.name.as_str(), json) {
            (DURATION, Json::String(s)) => return parse_duration(s).map_err(|m| error(path, m)),
            (TIMESTAMP, Json::String(s)) => return parse_timestamp(s).map_err(|m| error(path, m)),
            (ANY, Json::Object(_)) => return self.any(json, path),
            _ => {}
        }

        let object = json
            .as_object()
            .ok_or_else(|| error(path, format!("expected an object for {}", descriptor.name)))?;

        let mut message = DynamicMessage::new(&descriptor.name);
        let mut oneofs: HashMap<&str, &str> = HashMap::new();

        for (key, raw) in object {
            let field = descriptor
                .fields
                .iter()
                .find(|f| f.name == *key || f.json_name() == *key)
                .ok_or_else(|| error(path, format!("unknown field '{}'", key)))?;

            if raw.is_null() {
                continue;
            }

            let field_path = join(path, &field.name);
            if let Some(oneof) = field.oneof.as_deref()
                && let Some(previous) = oneofs.insert(oneof, &field.name)
            {
                return Err(error(
                    &field_path,
                    format!(
                        "oneof '{}' already has '{}' set, cannot also set '{}'",
                        oneof, previous, field.name
                    ),
                ));
            }

            let value = self.field(field, raw, &field_path)?;
            message.set(&field.name, value);
        }

        Ok(message)
    }

    fn field(&self, field: &FieldDescriptor, raw: &Json, path: &str) -> Result<Value> {
        if field.is_repeated() {
            let items = raw
                .as_array()
                .ok_or_else(|| error(path, "expected a list"))?;
            let values = items
                .iter()
                .enumerate()
                .map(|(i, item)| self.typed(&field.ty, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::List(values));
        }
        self.typed(&field.ty, raw, path)
    }

    fn typed(&self, ty: &FieldType, raw: &Json, path: &str) -> Result<Value> {
        match ty {
            FieldType::Scalar(scalar) => scalar_value(*scalar, raw).map_err(|m| error(path, m)),
            FieldType::Enum(name) => {
                let descriptor = self.schema.enum_type(name)?;
                match raw {
                    Json::String(s) => descriptor
                        .number(s)
                        .map(Value::Enum)
                        .ok_or_else(|| error(path, format!("unknown {} value '{}'", name, s))),
                    Json::Number(_) => {
                        let n = integer::<i32>(raw).map_err(|m| error(path, m))?;
                        Ok(Value::Enum(n))
                    }
                    _ => Err(error(path, "expected an enum name or number")),
                }
            }
            FieldType::Message(name) => {
                let descriptor = self.schema.message(name)?;
                Ok(self.message(descriptor, raw, path)?.into())
            }
            FieldType::Map(map) => {
                let object = raw
                    .as_object()
                    .ok_or_else(|| error(path, "expected a map"))?;
                let mut entries = Vec::with_capacity(object.len());
                for (key, value) in object {
                    let entry_path = format!("{}<{}>", path, key);
                    let key = map_key(map.key, key).map_err(|m| error(&entry_path, m))?;
                    if value.is_null() {
                        return Err(error(&entry_path, "map values cannot be null"));
                    }
                    let value = self.typed(&map.value, value, &entry_path)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
        }
    }

    fn any(&self, json: &Json, path: &str) -> Result<DynamicMessage> {
        let mut object = json
            .as_object()
            .cloned()
            .ok_or_else(|| error(path, "expected an object"))?;
        let type_url = match object.remove("@type") {
            Some(Json::String(url)) => url,
            _ => return Err(error(path, "Any requires a string '@type' member")),
        };
        let value = serde_json::to_vec(&Json::Object(object))?;
        Ok(DynamicMessage::any(type_url, value))
    }
}

type Parsed<T> = std::result::Result<T, String>;

fn integer<T>(raw: &Json) -> Parsed<T>
where
    T: TryFrom<i64> + TryFrom<u64> + std::str::FromStr,
{
    let out_of_range = || format!("integer {} is out of range", raw);
    match raw {
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                <T as TryFrom<i64>>::try_from(v).map_err(|_| out_of_range())
            } else if let Some(v) = n.as_u64() {
                <T as TryFrom<u64>>::try_from(v).map_err(|_| out_of_range())
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                        <T as TryFrom<i64>>::try_from(f as i64).map_err(|_| out_of_range())
                    }
                    _ => Err(format!("expected an integer, got {}", n)),
                }
            }
        }
        Json::String(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| format!("expected an integer, got '{}'", s)),
        _ => Err(format!("expected an integer, got {}", raw)),
    }
}

fn float(raw: &Json) -> Parsed<f64> {
    match raw {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("expected a number, got {}", n)),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| format!("expected a number, got '{}'", other)),
        },
        _ => Err(format!("expected a number, got {}", raw)),
    }
}

fn scalar_value(scalar: ScalarType, raw: &Json) -> Parsed<Value> {
    Ok(match scalar {
        ScalarType::Double => Value::F64(float(raw)?),
        ScalarType::Float => {
            let v = float(raw)?;
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return Err(format!("float {} is out of range", v));
            }
            Value::F32(v as f32)
        }
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            Value::I32(integer(raw)?)
        }
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            Value::I64(integer(raw)?)
        }
        ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(integer(raw)?),
        ScalarType::Uint64 | ScalarType::Fixed64 => Value::U64(integer(raw)?),
        ScalarType::Bool => Value::Bool(
            raw.as_bool()
                .ok_or_else(|| format!("expected a boolean, got {}", raw))?,
        ),
        ScalarType::String => Value::String(
            raw.as_str()
                .ok_or_else(|| format!("expected a string, got {}", raw))?
                .to_string(),
        ),
        ScalarType::Bytes => {
            let encoded = raw
                .as_str()
                .ok_or_else(|| format!("expected a base64 string, got {}", raw))?;
            let bytes = STANDARD
                .decode(encoded)
                .or_else(|_| URL_SAFE.decode(encoded))
                .map_err(|e| format!("invalid base64: {}", e))?;
            Value::Bytes(bytes)
        }
    })
}

fn map_key(scalar: ScalarType, key: &str) -> Parsed<Value> {
    match scalar {
        ScalarType::String => Ok(Value::String(key.to_string())),
        ScalarType::Bool => match key {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("invalid boolean map key '{}'", key)),
        },
        other => scalar_value(other, &Json::String(key.to_string())),
    }
}

/// Parse the JSON form of a duration: `"1.5s"`, `"-0.000000001s"`
pub fn parse_duration(text: &str) -> Parsed<DynamicMessage> {
    let invalid = || format!("invalid duration '{}'", text);
    let body = text.strip_suffix('s').ok_or_else(invalid)?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
    if whole.is_empty()
        || fraction.len() > 9
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let seconds: i64 = whole.parse().map_err(|_| invalid())?;
    let nanos: i32 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<9}", fraction).parse().map_err(|_| invalid())?
    };

    Ok(if negative {
        DynamicMessage::duration(-seconds, -nanos)
    } else {
        DynamicMessage::duration(seconds, nanos)
    })
}

/// Parse the JSON form of a timestamp (RFC 3339)
pub fn parse_timestamp(text: &str) -> Parsed<DynamicMessage> {
    let parsed = chrono::DateTime::parse_from_rfc3339(text)
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))?;
    Ok(DynamicMessage::timestamp(
        parsed.timestamp(),
        parsed.timestamp_subsec_nanos() as i32,
    ))
}
