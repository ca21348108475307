//! Dynamic message values
//!
//! Configuration is decoded into [`DynamicMessage`] instances which keep
//! only the fields that were explicitly set. Reads of unset fields fall
//! back to the zero value of the declared type.

use std::collections::BTreeMap;
use std::fmt;

use crate::schema::{ANY, DURATION, TIMESTAMP};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// bool
    Bool(bool),
    /// int32, sint32, sfixed32
    I32(i32),
    /// int64, sint64, sfixed64
    I64(i64),
    /// uint32, fixed32
    U32(u32),
    /// uint64, fixed64
    U64(u64),
    /// float
    F32(f32),
    /// double
    F64(f64),
    /// string
    String(String),
    /// bytes
    Bytes(Vec<u8>),
    /// Enum number
    Enum(i32),
    /// Nested message
    Message(Box<DynamicMessage>),
    /// Repeated field
    List(Vec<Value>),
    /// Map field, in document order
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Nested message, if this is one
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// List elements, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map entries, if this is a map
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte contents, if this is bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Integer value widened to i128, if this is an integer or enum
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I32(v) | Value::Enum(v) => Some(v.into()),
            Value::I64(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v.into()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::I32(v) | Value::Enum(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
            Value::Bytes(v) => write!(f, "b'{}'", v.escape_ascii()),
            Value::Message(m) => write!(f, "{}", m.type_name()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An instance of a message type
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl DynamicMessage {
    /// Create an empty instance
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Fully qualified type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Value of an explicitly set field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether a field was explicitly set
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Builder form of [`DynamicMessage::set`]
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set(field, value);
        self
    }

    /// Explicitly set fields, sorted by name
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a `google.protobuf.Duration`
    pub fn duration(seconds: i64, nanos: i32) -> Self {
        Self::new(DURATION)
            .with("seconds", Value::I64(seconds))
            .with("nanos", Value::I32(nanos))
    }

    /// Build a `google.protobuf.Timestamp`
    pub fn timestamp(seconds: i64, nanos: i32) -> Self {
        Self::new(TIMESTAMP)
            .with("seconds", Value::I64(seconds))
            .with("nanos", Value::I32(nanos))
    }

    /// Build a `google.protobuf.Any`
    pub fn any(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self::new(ANY)
            .with("type_url", Value::String(type_url.into()))
            .with("value", Value::Bytes(value))
    }

    /// Seconds and nanos of a duration or timestamp instance
    pub fn seconds_and_nanos(&self) -> (i64, i32) {
        let seconds = match self.get("seconds") {
            Some(Value::I64(s)) => *s,
            _ => 0,
        };
        let nanos = match self.get("nanos") {
            Some(Value::I32(n)) => *n,
            _ => 0,
        };
        (seconds, nanos)
    }
}

impl From<DynamicMessage> for Value {
    fn from(message: DynamicMessage) -> Self {
        Value::Message(Box::new(message))
    }
}
