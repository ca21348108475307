//! Declarative field constraints
//!
//! Rules are attached to fields in the schema descriptor document. A rule
//! block carries at most one rule kind (`int32`, `string`, `repeated`, ...)
//! plus an optional `message` block that controls presence and recursion.
//!
//! # Example
//!
//! ```yaml
//! rules:
//!   message: { required: true }
//!   repeated:
//!     min_items: 1
//!     items:
//!       int32: { lt: 5 }
//! ```
//!
//! Unknown constraint names are rejected when the document is loaded.

use serde::{Deserialize, Serialize};

/// Seconds and nanoseconds, the wire shape of durations and timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSpec {
    /// Whole seconds
    #[serde(default)]
    pub seconds: i64,

    /// Nanosecond fraction, same sign as `seconds`
    #[serde(default)]
    pub nanos: i32,
}

impl TimeSpec {
    /// Create a new time specification
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }
}

/// Constraints shared by every numeric kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericRules<T> {
    /// Value must equal this constant
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<T>,

    /// Value must be strictly less than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<T>,

    /// Value must be less than or equal to this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<T>,

    /// Value must be strictly greater than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<T>,

    /// Value must be greater than or equal to this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<T>,

    /// Value must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<T>,

    /// Value must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<T>,
}

/// Constraints for `bool` fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoolRules {
    /// Value must equal this constant
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<bool>,
}

/// Constraints for `string` fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringRules {
    /// Value must equal this constant
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<String>,

    /// Exact length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u64>,

    /// Minimum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,

    /// Maximum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,

    /// Exact length in UTF-8 bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len_bytes: Option<u64>,

    /// Minimum length in UTF-8 bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bytes: Option<u64>,

    /// Maximum length in UTF-8 bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,

    /// Regular expression the value must match (unanchored search)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Required prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Required suffix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Required substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    /// Forbidden substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_contains: Option<String>,

    /// Value must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<String>,

    /// Value must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<String>,

    /// Value must be an email address
    #[serde(default, skip_serializing_if = "is_false")]
    pub email: bool,

    /// Value must be a hostname
    #[serde(default, skip_serializing_if = "is_false")]
    pub hostname: bool,

    /// Value must be an IPv4 or IPv6 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ip: bool,

    /// Value must be an IPv4 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipv4: bool,

    /// Value must be an IPv6 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipv6: bool,

    /// Value must be an absolute URI
    #[serde(default, skip_serializing_if = "is_false")]
    pub uri: bool,

    /// Value must be a URI reference (absolute or relative)
    #[serde(default, skip_serializing_if = "is_false")]
    pub uri_ref: bool,

    /// Value must be a hostname or an IP address
    #[serde(default, skip_serializing_if = "is_false")]
    pub address: bool,

    /// Value must be a hyphenated UUID
    #[serde(default, skip_serializing_if = "is_false")]
    pub uuid: bool,
}

/// Constraints for `bytes` fields
///
/// Literal values are written as text and compared as their UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BytesRules {
    /// Value must equal this constant
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<String>,

    /// Exact length in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u64>,

    /// Minimum length in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,

    /// Maximum length in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,

    /// Regular expression the value must match; must be ASCII
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Required prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Required suffix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Required byte sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    /// Forbidden byte sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_contains: Option<String>,

    /// Value must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<String>,

    /// Value must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<String>,

    /// Value must be a packed IPv4 or IPv6 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ip: bool,

    /// Value must be a packed IPv4 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipv4: bool,

    /// Value must be a packed IPv6 address
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipv6: bool,
}

/// Constraints for enum fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumRules {
    /// Value must equal this number
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<i32>,

    /// Value must be a declared enum number
    #[serde(default, skip_serializing_if = "is_false")]
    pub defined_only: bool,

    /// Value must be one of these numbers
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<i32>,

    /// Value must not be one of these numbers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<i32>,
}

/// Constraints for repeated fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatedRules {
    /// Minimum number of items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    /// Maximum number of items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    /// Items must be pairwise distinct
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,

    /// Rules applied to every item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldRules>>,
}

/// Constraints for map fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapRules {
    /// Minimum number of entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pairs: Option<u64>,

    /// Maximum number of entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pairs: Option<u64>,

    /// Accepted for compatibility; maps here cannot be sparse
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_sparse: bool,

    /// Rules applied to every key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Box<FieldRules>>,

    /// Rules applied to every value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Box<FieldRules>>,
}

/// Constraints for `google.protobuf.Any` fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnyRules {
    /// The field must be set
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Type URL must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<String>,

    /// Type URL must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<String>,
}

/// Constraints for `google.protobuf.Duration` fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationRules {
    /// The field must be set
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Value must equal this duration
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<TimeSpec>,

    /// Value must be strictly less than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<TimeSpec>,

    /// Value must be less than or equal to this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<TimeSpec>,

    /// Value must be strictly greater than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<TimeSpec>,

    /// Value must be greater than or equal to this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<TimeSpec>,

    /// Value must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<TimeSpec>,

    /// Value must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<TimeSpec>,
}

/// Constraints for `google.protobuf.Timestamp` fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampRules {
    /// The field must be set
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Value must equal this instant
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_: Option<TimeSpec>,

    /// Value must be strictly before this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<TimeSpec>,

    /// Value must be at or before this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<TimeSpec>,

    /// Value must be strictly after this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<TimeSpec>,

    /// Value must be at or after this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<TimeSpec>,

    /// Value must be in the past
    #[serde(default, skip_serializing_if = "is_false")]
    pub lt_now: bool,

    /// Value must be in the future
    #[serde(default, skip_serializing_if = "is_false")]
    pub gt_now: bool,

    /// Value must be within this distance from now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<TimeSpec>,

    /// Value must be one of these
    #[serde(rename = "in", default, skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<TimeSpec>,

    /// Value must not be one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<TimeSpec>,
}

/// Presence and recursion controls for message-typed fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageRules {
    /// The field must be set
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Do not validate the field at all
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

macro_rules! rule_kinds {
    ($($(#[$doc:meta])* $field:ident as $name:literal => $variant:ident($ty:ty),)*) => {
        /// One rule kind per constraint family
        #[derive(Debug, Clone, PartialEq)]
        pub enum RuleKind {
            $($(#[$doc])* $variant($ty),)*
        }

        impl RuleKind {
            /// Name of the rule kind as written in descriptor documents
            pub fn name(&self) -> &'static str {
                match self {
                    $(RuleKind::$variant(_) => $name,)*
                }
            }
        }

        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawFieldRules {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            message: Option<MessageRules>,
            $(
                #[serde(rename = $name, default, skip_serializing_if = "Option::is_none")]
                $field: Option<$ty>,
            )*
        }

        impl TryFrom<RawFieldRules> for FieldRules {
            type Error = String;

            fn try_from(raw: RawFieldRules) -> Result<Self, Self::Error> {
                let mut kinds = Vec::new();
                $(
                    if let Some(rules) = raw.$field {
                        kinds.push(RuleKind::$variant(rules));
                    }
                )*
                if kinds.len() > 1 {
                    let names: Vec<_> = kinds.iter().map(RuleKind::name).collect();
                    return Err(format!(
                        "a field can carry only one rule kind, found: {}",
                        names.join(", ")
                    ));
                }
                Ok(FieldRules {
                    message: raw.message,
                    kind: kinds.pop(),
                })
            }
        }

        impl From<FieldRules> for RawFieldRules {
            fn from(rules: FieldRules) -> Self {
                let mut raw = RawFieldRules {
                    message: rules.message,
                    ..Default::default()
                };
                match rules.kind {
                    $(Some(RuleKind::$variant(value)) => raw.$field = Some(value),)*
                    None => {}
                }
                raw
            }
        }
    };
}

rule_kinds! {
    /// `float` rules
    float as "float" => Float(NumericRules<f32>),
    /// `double` rules
    double as "double" => Double(NumericRules<f64>),
    /// `int32` rules
    int32 as "int32" => Int32(NumericRules<i32>),
    /// `int64` rules
    int64 as "int64" => Int64(NumericRules<i64>),
    /// `uint32` rules
    uint32 as "uint32" => Uint32(NumericRules<u32>),
    /// `uint64` rules
    uint64 as "uint64" => Uint64(NumericRules<u64>),
    /// `sint32` rules
    sint32 as "sint32" => Sint32(NumericRules<i32>),
    /// `sint64` rules
    sint64 as "sint64" => Sint64(NumericRules<i64>),
    /// `fixed32` rules
    fixed32 as "fixed32" => Fixed32(NumericRules<u32>),
    /// `fixed64` rules
    fixed64 as "fixed64" => Fixed64(NumericRules<u64>),
    /// `sfixed32` rules
    sfixed32 as "sfixed32" => Sfixed32(NumericRules<i32>),
    /// `sfixed64` rules
    sfixed64 as "sfixed64" => Sfixed64(NumericRules<i64>),
    /// `bool` rules
    bool as "bool" => Bool(BoolRules),
    /// `string` rules
    string as "string" => String(StringRules),
    /// `bytes` rules
    bytes as "bytes" => Bytes(BytesRules),
    /// Enum rules
    r#enum as "enum" => Enum(EnumRules),
    /// Repeated field rules
    repeated as "repeated" => Repeated(RepeatedRules),
    /// Map field rules
    map as "map" => Map(MapRules),
    /// `google.protobuf.Any` rules
    any as "any" => Any(AnyRules),
    /// `google.protobuf.Duration` rules
    duration as "duration" => Duration(DurationRules),
    /// `google.protobuf.Timestamp` rules
    timestamp as "timestamp" => Timestamp(TimestampRules),
}

/// The complete rule block attached to a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawFieldRules", into = "RawFieldRules")]
pub struct FieldRules {
    /// `message.required` / `message.skip`
    pub message: Option<MessageRules>,

    /// The rule kind, if any
    pub kind: Option<RuleKind>,
}

impl FieldRules {
    /// Rules with a single rule kind
    pub fn of(kind: RuleKind) -> Self {
        Self {
            message: None,
            kind: Some(kind),
        }
    }

    /// Whether `message.skip` is set
    pub fn skipped(&self) -> bool {
        self.message.is_some_and(|m| m.skip)
    }

    /// Whether `message.required` is set
    pub fn required(&self) -> bool {
        self.message.is_some_and(|m| m.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_rules() {
        let yaml = r#"
int32:
  gt: 0
  lt: 10
  not_in: [5]
"#;
        let rules: FieldRules = serde_yaml::from_str(yaml).unwrap();
        match rules.kind {
            Some(RuleKind::Int32(r)) => {
                assert_eq!(r.gt, Some(0));
                assert_eq!(r.lt, Some(10));
                assert_eq!(r.not_in, vec![5]);
                assert!(r.in_.is_empty());
            }
            other => panic!("Expected int32 rules, got {other:?}"),
        }
        assert!(rules.message.is_none());
    }

    #[test]
    fn test_parse_const_and_in() {
        let yaml = r#"
string:
  const: valid
  in: [valid, other]
"#;
        let rules: FieldRules = serde_yaml::from_str(yaml).unwrap();
        match rules.kind {
            Some(RuleKind::String(r)) => {
                assert_eq!(r.const_.as_deref(), Some("valid"));
                assert_eq!(r.in_.len(), 2);
            }
            other => panic!("Expected string rules, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_nested_repeated_items() {
        let yaml = r#"
repeated:
  unique: true
  items:
    int32:
      lt: 5
"#;
        let rules: FieldRules = serde_yaml::from_str(yaml).unwrap();
        let Some(RuleKind::Repeated(repeated)) = rules.kind else {
            panic!("Expected repeated rules");
        };
        assert!(repeated.unique);
        let items = repeated.items.unwrap();
        assert!(matches!(items.kind, Some(RuleKind::Int32(ref r)) if r.lt == Some(5)));
    }

    #[test]
    fn test_parse_message_rules_alongside_kind() {
        let yaml = r#"
message:
  required: true
duration:
  lte: { seconds: 60 }
"#;
        let rules: FieldRules = serde_yaml::from_str(yaml).unwrap();
        assert!(rules.required());
        assert!(!rules.skipped());
        assert!(matches!(
            rules.kind,
            Some(RuleKind::Duration(ref d)) if d.lte == Some(TimeSpec::new(60, 0))
        ));
    }

    #[test]
    fn test_unknown_constraint_rejected() {
        let yaml = r#"
int32:
  less_than: 5
"#;
        let result: Result<FieldRules, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_rule_kind_rejected() {
        let result: Result<FieldRules, _> = serde_yaml::from_str("decimal: { lt: 5 }");
        assert!(result.is_err());
    }

    #[test]
    fn test_two_rule_kinds_rejected() {
        let yaml = r#"
int32: { lt: 5 }
string: { min_len: 1 }
"#;
        let err = serde_yaml::from_str::<FieldRules>(yaml)
            .unwrap_err()
            .to_string();
        assert!(err.contains("only one rule kind"));
    }

    #[test]
    fn test_rules_serialization_roundtrip_shape() {
        let rules = FieldRules::of(RuleKind::Uint32(NumericRules {
            gt: Some(0),
            ..Default::default()
        }));
        let yaml = serde_yaml::to_string(&rules).unwrap();
        assert!(yaml.contains("uint32"));
        assert!(yaml.contains("gt: 0"));
        assert!(!yaml.contains("lt"));
    }

    #[test]
    fn test_rule_kind_names() {
        assert_eq!(RuleKind::Bool(BoolRules::default()).name(), "bool");
        assert_eq!(RuleKind::Sfixed64(NumericRules::default()).name(), "sfixed64");
        assert_eq!(RuleKind::Map(MapRules::default()).name(), "map");
    }
}
