//! Schema model
//!
//! The schema is produced outside of this crate (from an IDL file) and is
//! handed over as a descriptor document. It is read-only once loaded.
//!
//! # Descriptor Document
//!
//! ```yaml
//! messages:
//!   - name: pkg.Config
//!     oneofs:
//!       - { name: kind, required: true }
//!     fields:
//!       - name: port
//!         type: uint32
//!         rules: { uint32: { gt: 0 } }
//!       - name: db
//!         type: { message: pkg.Postgres }
//! enums:
//!   - name: pkg.Level
//!     values: { DEBUG: 0, INFO: 1 }
//! ```
//!
//! `google.protobuf.Duration`, `google.protobuf.Timestamp` and
//! `google.protobuf.Any` are always available.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::rules::FieldRules;
use crate::value::Value;

/// Full name of the well-known duration type
pub const DURATION: &str = "google.protobuf.Duration";

/// Full name of the well-known timestamp type
pub const TIMESTAMP: &str = "google.protobuf.Timestamp";

/// Full name of the well-known any type
pub const ANY: &str = "google.protobuf.Any";

/// Scalar field kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 32-bit integer
    Uint32,
    /// Unsigned 64-bit integer
    Uint64,
    /// Zigzag-encoded signed 32-bit integer
    Sint32,
    /// Zigzag-encoded signed 64-bit integer
    Sint64,
    /// Fixed-width unsigned 32-bit integer
    Fixed32,
    /// Fixed-width unsigned 64-bit integer
    Fixed64,
    /// Fixed-width signed 32-bit integer
    Sfixed32,
    /// Fixed-width signed 64-bit integer
    Sfixed64,
    /// Boolean
    Bool,
    /// UTF-8 text
    String,
    /// Raw bytes
    Bytes,
}

impl ScalarType {
    /// Zero value of this kind
    pub fn default_value(self) -> Value {
        match self {
            ScalarType::Double => Value::F64(0.0),
            ScalarType::Float => Value::F32(0.0),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => Value::I32(0),
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => Value::I64(0),
            ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(0),
            ScalarType::Uint64 | ScalarType::Fixed64 => Value::U64(0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::String(String::new()),
            ScalarType::Bytes => Value::Bytes(Vec::new()),
        }
    }

    /// Whether this kind can be used as a map key
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

/// Key and value types of a map field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapType {
    /// Key kind
    pub key: ScalarType,

    /// Value type
    pub value: FieldType,
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldType", into = "RawFieldType")]
pub enum FieldType {
    /// Scalar value
    Scalar(ScalarType),

    /// Enum value, by full enum name
    Enum(String),

    /// Nested message, by full message name
    Message(String),

    /// Map with scalar keys (a synthetic entry type, never recursed into)
    Map(Box<MapType>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFieldType {
    Scalar(ScalarType),
    Named(NamedType),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
enum NamedType {
    Enum(String),
    Message(String),
    Map(Box<MapType>),
}

impl From<RawFieldType> for FieldType {
    fn from(raw: RawFieldType) -> Self {
        match raw {
            RawFieldType::Scalar(s) => FieldType::Scalar(s),
            RawFieldType::Named(NamedType::Enum(name)) => FieldType::Enum(name),
            RawFieldType::Named(NamedType::Message(name)) => FieldType::Message(name),
            RawFieldType::Named(NamedType::Map(map)) => FieldType::Map(map),
        }
    }
}

impl From<FieldType> for RawFieldType {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::Scalar(s) => RawFieldType::Scalar(s),
            FieldType::Enum(name) => RawFieldType::Named(NamedType::Enum(name)),
            FieldType::Message(name) => RawFieldType::Named(NamedType::Message(name)),
            FieldType::Map(map) => RawFieldType::Named(NamedType::Map(map)),
        }
    }
}

impl FieldType {
    /// Message type name, if this is a message type
    pub fn message_name(&self) -> Option<&str> {
        match self {
            FieldType::Message(name) => Some(name),
            _ => None,
        }
    }

    /// Zero value for non-message types
    pub fn default_value(&self) -> Option<Value> {
        match self {
            FieldType::Scalar(s) => Some(s.default_value()),
            FieldType::Enum(_) => Some(Value::Enum(0)),
            FieldType::Map(_) => Some(Value::Map(Vec::new())),
            FieldType::Message(_) => None,
        }
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// At most one value
    #[default]
    Singular,
    /// A list of values
    Repeated,
}

/// A single field of a message type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,

    /// JSON name override (defaults to lowerCamelCase of `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,

    /// Declared type
    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Cardinality
    #[serde(default)]
    pub label: Label,

    /// Name of the containing oneof group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,

    /// Declared constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<FieldRules>,
}

impl FieldDescriptor {
    /// Create a singular field without rules
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            json_name: None,
            ty,
            label: Label::Singular,
            oneof: None,
            rules: None,
        }
    }

    /// Mark the field as repeated
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Place the field in a oneof group
    pub fn in_oneof(mut self, oneof: impl Into<String>) -> Self {
        self.oneof = Some(oneof.into());
        self
    }

    /// Attach constraints
    pub fn with_rules(mut self, rules: FieldRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Name used in JSON documents
    pub fn json_name(&self) -> String {
        match &self.json_name {
            Some(name) => name.clone(),
            None => lower_camel_case(&self.name),
        }
    }

    /// Whether the field holds a list
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// Whether the field is a map
    pub fn is_map(&self) -> bool {
        matches!(self.ty, FieldType::Map(_))
    }

    /// Zero value of the field, `None` for singular message fields
    pub fn default_value(&self) -> Option<Value> {
        if self.is_repeated() {
            return Some(Value::List(Vec::new()));
        }
        self.ty.default_value()
    }
}

fn lower_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// A oneof group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneofDescriptor {
    /// Group name
    pub name: String,

    /// Exactly one member must be set
    #[serde(default)]
    pub required: bool,
}

/// A message type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDescriptor {
    /// Fully qualified name
    pub name: String,

    /// Skip all validation for instances of this type
    #[serde(default)]
    pub disabled: bool,

    /// Oneof groups in declaration order
    #[serde(default)]
    pub oneofs: Vec<OneofDescriptor>,

    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Create an empty message type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disabled: false,
            oneofs: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a field
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a oneof group
    pub fn oneof(mut self, name: impl Into<String>, required: bool) -> Self {
        self.oneofs.push(OneofDescriptor {
            name: name.into(),
            required,
        });
        self
    }

    /// Mark the type as exempt from validation
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Look up a field by name
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Members of a oneof group, in declaration order
    pub fn oneof_fields<'a>(
        &'a self,
        oneof: &'a str,
    ) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.oneof.as_deref() == Some(oneof))
    }
}

/// An enum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDescriptor {
    /// Fully qualified name
    pub name: String,

    /// Value names to numbers
    pub values: BTreeMap<String, i32>,
}

impl EnumDescriptor {
    /// Number for a value name
    pub fn number(&self, name: &str) -> Option<i32> {
        self.values.get(name).copied()
    }

    /// Whether a number is declared
    pub fn is_defined(&self, number: i32) -> bool {
        self.values.values().any(|&n| n == number)
    }
}

/// Descriptor document as produced by the schema generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Message types
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    /// Enum types
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

/// A checked, immutable set of message and enum types
#[derive(Debug, Clone)]
pub struct Schema {
    messages: BTreeMap<String, MessageDescriptor>,
    enums: BTreeMap<String, EnumDescriptor>,
    fingerprint: String,
}

impl Schema {
    /// Build a schema from descriptors, registering the well-known types
    pub fn new(document: SchemaDocument) -> Result<Self> {
        let mut messages = BTreeMap::new();
        for message in well_known_types().into_iter().chain(document.messages) {
            let name = message.name.clone();
            if messages.insert(name.clone(), message).is_some() {
                return Err(Error::SchemaInvalid {
                    message: format!("message type '{}' is defined twice", name),
                });
            }
        }

        let mut enums = BTreeMap::new();
        for enum_type in document.enums {
            let name = enum_type.name.clone();
            if enums.insert(name.clone(), enum_type).is_some() {
                return Err(Error::SchemaInvalid {
                    message: format!("enum type '{}' is defined twice", name),
                });
            }
        }

        let fingerprint = fingerprint(&messages, &enums)?;
        let schema = Self {
            messages,
            enums,
            fingerprint,
        };
        schema.check()?;

        tracing::debug!(
            messages = schema.messages.len(),
            enums = schema.enums.len(),
            fingerprint = %schema.fingerprint,
            "Schema loaded"
        );
        Ok(schema)
    }

    /// Parse a YAML (or JSON) descriptor document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: SchemaDocument = serde_yaml::from_str(yaml)?;
        Self::new(document)
    }

    /// Load a descriptor document from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Look up a message type
    pub fn message(&self, name: &str) -> Result<&MessageDescriptor> {
        self.messages.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
        })
    }

    /// Look up an enum type
    pub fn enum_type(&self, name: &str) -> Result<&EnumDescriptor> {
        self.enums.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
        })
    }

    /// All message types, sorted by name
    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.values()
    }

    /// SHA-256 of the canonical JSON form of the schema
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Verify that every reference resolves
    fn check(&self) -> Result<()> {
        for message in self.messages.values() {
            let oneofs: HashSet<&str> = message.oneofs.iter().map(|o| o.name.as_str()).collect();
            let mut names = HashSet::new();

            for field in &message.fields {
                let invalid = |reason: String| Error::SchemaInvalid {
                    message: format!("field '{}.{}' {}", message.name, field.name, reason),
                };

                if !names.insert(field.name.as_str()) {
                    return Err(invalid("is defined twice".to_string()));
                }
                if let Some(oneof) = &field.oneof {
                    if !oneofs.contains(oneof.as_str()) {
                        return Err(invalid(format!("refers to unknown oneof '{}'", oneof)));
                    }
                    if field.is_repeated() || field.is_map() {
                        return Err(invalid("cannot be repeated inside a oneof".to_string()));
                    }
                }
                if field.is_map() && field.is_repeated() {
                    return Err(invalid("cannot be both a map and repeated".to_string()));
                }
                self.check_type(&field.ty).map_err(invalid)?;
            }
        }
        Ok(())
    }

    fn check_type(&self, ty: &FieldType) -> std::result::Result<(), String> {
        match ty {
            FieldType::Scalar(_) => Ok(()),
            FieldType::Enum(name) if self.enums.contains_key(name) => Ok(()),
            FieldType::Enum(name) => Err(format!("refers to unknown enum '{}'", name)),
            FieldType::Message(name) if self.messages.contains_key(name) => Ok(()),
            FieldType::Message(name) => Err(format!("refers to unknown message '{}'", name)),
            FieldType::Map(map) => {
                if !map.key.is_valid_map_key() {
                    return Err(format!("has invalid map key type {:?}", map.key));
                }
                if matches!(map.value, FieldType::Map(_)) {
                    return Err("has a map as map value".to_string());
                }
                self.check_type(&map.value)
            }
        }
    }
}

fn fingerprint(
    messages: &BTreeMap<String, MessageDescriptor>,
    enums: &BTreeMap<String, EnumDescriptor>,
) -> Result<String> {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(messages)?);
    hasher.update(serde_json::to_vec(enums)?);
    Ok(hex::encode(hasher.finalize()))
}

fn well_known_types() -> Vec<MessageDescriptor> {
    let int64 = || FieldType::Scalar(ScalarType::Int64);
    let int32 = || FieldType::Scalar(ScalarType::Int32);
    vec![
        MessageDescriptor::new(DURATION)
            .field(FieldDescriptor::new("seconds", int64()))
            .field(FieldDescriptor::new("nanos", int32())),
        MessageDescriptor::new(TIMESTAMP)
            .field(FieldDescriptor::new("seconds", int64()))
            .field(FieldDescriptor::new("nanos", int32())),
        MessageDescriptor::new(ANY)
            .field(FieldDescriptor::new(
                "type_url",
                FieldType::Scalar(ScalarType::String),
            ))
            .field(FieldDescriptor::new(
                "value",
                FieldType::Scalar(ScalarType::Bytes),
            )),
    ]
}
