//! Validation plans
//!
//! A plan is the compiled form of a message type's constraints. It is
//! produced once per type by the compiler, cached, and then interpreted
//! against dynamic messages.

use bigdecimal::BigDecimal;
use harness_core::Value;
use harness_core::rules::TimeSpec;
use std::fmt;

use crate::checks::Format;
use crate::time::{format_duration, format_timestamp};

/// Compiled validator for one message type
#[derive(Debug, Clone)]
pub struct MessagePlan {
    /// Fully qualified type name
    pub type_name: String,

    /// Instances are never checked
    pub disabled: bool,

    /// Oneof groups, in declaration order
    pub oneofs: Vec<OneofPlan>,

    /// Fields outside of oneof groups, in declaration order
    pub fields: Vec<FieldPlan>,
}

impl MessagePlan {
    /// Whether running the plan can never fail
    pub fn is_empty(&self) -> bool {
        self.disabled
            || (self.oneofs.iter().all(OneofPlan::is_empty)
                && self.fields.iter().all(FieldPlan::is_empty))
    }
}

/// Compiled oneof group
#[derive(Debug, Clone)]
pub struct OneofPlan {
    /// Group name
    pub name: String,

    /// Fail when no member is set
    pub required: bool,

    /// Members, in declaration order
    pub members: Vec<FieldPlan>,
}

impl OneofPlan {
    fn is_empty(&self) -> bool {
        !self.required && self.members.iter().all(FieldPlan::is_empty)
    }
}

/// When field checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Scalars, lists and maps always have a value (the zero value if unset)
    Always,
    /// Singular message fields are checked only when set
    WhenSet,
}

/// Compiled constraints of one field
#[derive(Debug, Clone)]
pub struct FieldPlan {
    /// Field name, also the display path
    pub name: String,

    /// Whether the field holds a list
    pub repeated: bool,

    /// When `checks` run
    pub presence: Presence,

    /// Fail with `<name> is required` when unset
    pub required: bool,

    /// Value read when the field is unset and `presence` is `Always`
    pub zero: Option<Value>,

    /// Checks in rule declaration order
    pub checks: Vec<Check>,

    /// Message type to descend into, per element if repeated
    pub descend: Option<String>,
}

impl FieldPlan {
    fn is_empty(&self) -> bool {
        !self.required && self.checks.is_empty() && self.descend.is_none()
    }
}

/// Checks applied to the elements of a list or the entries of a map
#[derive(Debug, Clone)]
pub struct ElementPlan {
    /// Display path: `field[]`, `field<key>` or `field<value>`
    pub display: String,

    /// Checks in rule declaration order
    pub checks: Vec<Check>,
}

/// A literal taken from a rule document
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Any integer kind, widened
    Int(i128),
    /// float or double; float literals are rounded to f32 precision
    Float(f64),
    /// bool
    Bool(bool),
    /// string
    Str(String),
    /// bytes
    Bytes(Vec<u8>),
    /// google.protobuf.Duration
    Duration(TimeSpec),
    /// google.protobuf.Timestamp
    Timestamp(TimeSpec),
}

impl Literal {
    /// Byte view for string and bytes literals
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Literal::Str(s) => s.as_bytes(),
            Literal::Bytes(b) => b,
            _ => &[],
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "'{}'", v),
            Literal::Bytes(v) => write!(f, "b'{}'", v.escape_ascii()),
            Literal::Duration(v) => write!(f, "{}", format_duration(v)),
            Literal::Timestamp(v) => write!(f, "{}", format_timestamp(v)),
        }
    }
}

/// A set of literals, rendered `[a, b]` or `{60s, 30s}` for durations
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralSet(pub Vec<Literal>);

impl fmt::Display for LiteralSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let braces = matches!(self.0.first(), Some(Literal::Duration(_)));
        write!(f, "{}", if braces { "{" } else { "[" })?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "{}", if braces { "}" } else { "]" })
    }
}

/// Relation of a timestamp to the current time
#[derive(Debug, Clone, PartialEq)]
pub enum NowCheck {
    /// `lt_now`
    Before,
    /// `gt_now`
    After,
    /// `within` alone: `|value - now| < d`
    Within(TimeSpec, BigDecimal),
    /// `lt_now` with `within`: `now - d < value < now`
    WithinBefore(TimeSpec, BigDecimal),
    /// `gt_now` with `within`: `now < value < now + d`
    WithinAfter(TimeSpec, BigDecimal),
}

/// A single constraint check
#[derive(Debug, Clone)]
pub enum Check {
    /// Value equals the literal
    Const(Literal),
    /// Value is strictly less than the literal
    Lt(Literal),
    /// Value is less than or equal to the literal
    Lte(Literal),
    /// Value is strictly greater than the literal
    Gt(Literal),
    /// Value is greater than or equal to the literal
    Gte(Literal),
    /// Value is one of the literals
    In(LiteralSet),
    /// Value is none of the literals
    NotIn(LiteralSet),
    /// Length in characters (strings) or bytes (bytes) equals
    Len(u64),
    /// Length in characters or bytes is at least
    MinLen(u64),
    /// Length in characters or bytes is at most
    MaxLen(u64),
    /// UTF-8 length equals
    LenBytes(u64),
    /// UTF-8 length is at least
    MinBytes(u64),
    /// UTF-8 length is at most
    MaxBytes(u64),
    /// String matches the regex
    Pattern(regex::Regex),
    /// Bytes match the regex
    BytesPattern(regex::bytes::Regex),
    /// A bytes pattern that cannot be used; always fails
    InvalidPattern(String),
    /// Starts with the literal
    Prefix(Literal),
    /// Ends with the literal
    Suffix(Literal),
    /// Contains the literal
    Contains(Literal),
    /// Does not contain the literal
    NotContains(Literal),
    /// Well-known format
    Format(Format),
    /// Enum number is declared by the enum type
    DefinedOnly(Vec<i32>),
    /// List has at least this many items
    MinItems(u64),
    /// List has at most this many items
    MaxItems(u64),
    /// List items are pairwise distinct
    Unique,
    /// Checks for every list item
    Items(Box<ElementPlan>),
    /// Map has at least this many entries
    MinPairs(u64),
    /// Map has at most this many entries
    MaxPairs(u64),
    /// Checks for every map key
    Keys(Box<ElementPlan>),
    /// Checks for every map value
    Values(Box<ElementPlan>),
    /// `Any.type_url` is one of the literals
    TypeUrlIn(LiteralSet),
    /// `Any.type_url` is none of the literals
    TypeUrlNotIn(LiteralSet),
    /// Timestamp relation to the current time
    Now(NowCheck),
}
