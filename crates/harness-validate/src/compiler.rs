//! Schema to plan compiler
//!
//! Turns the rule blocks of a message type into a [`MessagePlan`]. Every
//! rule kind is destructured exhaustively, so a constraint added to the
//! rule model cannot be silently ignored here.

use harness_core::rules::{
    AnyRules, BoolRules, BytesRules, DurationRules, EnumRules, FieldRules, MapRules,
    NumericRules, RepeatedRules, RuleKind, StringRules, TimestampRules,
};
use harness_core::schema::{ANY, DURATION, FieldType, ScalarType, TIMESTAMP};
use harness_core::{FieldDescriptor, MessageDescriptor, Schema};

use crate::checks::Format;
use crate::error::{Error, Result};
use crate::plan::*;
use crate::time::spec_seconds;

/// Compile the validator plan for `type_name`
///
/// Nested message types are referenced by name and resolved when the plan
/// runs, so cyclic schemas compile.
pub fn compile(schema: &Schema, type_name: &str) -> Result<MessagePlan> {
    let message = schema.message(type_name)?;
    let compiler = Compiler { schema, message };
    let plan = compiler.message()?;
    tracing::debug!(
        type_name,
        disabled = plan.disabled,
        oneofs = plan.oneofs.len(),
        fields = plan.fields.len(),
        "Compiled validator"
    );
    Ok(plan)
}

struct Compiler<'a> {
    schema: &'a Schema,
    message: &'a MessageDescriptor,
}

/// Declared shape a rule kind is applied to
#[derive(Clone, Copy)]
struct Target<'a> {
    ty: &'a FieldType,
    repeated: bool,
}

fn numeric<T: Copy>(rules: &NumericRules<T>, literal: impl Fn(T) -> Literal) -> Vec<Check> {
    let NumericRules {
        const_,
        lt,
        lte,
        gt,
        gte,
        in_,
        not_in,
    } = rules;

    let mut checks = Vec::new();
    if let Some(v) = const_ {
        checks.push(Check::Const(literal(*v)));
    }
    if let Some(v) = lt {
        checks.push(Check::Lt(literal(*v)));
    }
    if let Some(v) = lte {
        checks.push(Check::Lte(literal(*v)));
    }
    if let Some(v) = gt {
        checks.push(Check::Gt(literal(*v)));
    }
    if let Some(v) = gte {
        checks.push(Check::Gte(literal(*v)));
    }
    if !in_.is_empty() {
        checks.push(Check::In(LiteralSet(in_.iter().map(|v| literal(*v)).collect())));
    }
    if !not_in.is_empty() {
        checks.push(Check::NotIn(LiteralSet(
            not_in.iter().map(|v| literal(*v)).collect(),
        )));
    }
    checks
}

fn int<T: Into<i128>>(value: T) -> Literal {
    Literal::Int(value.into())
}

fn is_well_known(type_name: &str) -> bool {
    type_name.starts_with("google.protobuf.")
}

/// Whether a rule kind carries its own presence requirement
fn kind_required(kind: Option<&RuleKind>) -> bool {
    match kind {
        Some(RuleKind::Any(r)) => r.required,
        Some(RuleKind::Duration(r)) => r.required,
        Some(RuleKind::Timestamp(r)) => r.required,
        _ => false,
    }
}

impl Compiler<'_> {
    fn message(&self) -> Result<MessagePlan> {
        let message = self.message;
        if message.disabled {
            return Ok(MessagePlan {
                type_name: message.name.clone(),
                disabled: true,
                oneofs: vec![],
                fields: vec![],
            });
        }

        let oneofs = message
            .oneofs
            .iter()
            .map(|oneof| -> Result<OneofPlan> {
                Ok(OneofPlan {
                    name: oneof.name.clone(),
                    required: oneof.required,
                    members: message
                        .oneof_fields(&oneof.name)
                        .map(|f| self.field(f))
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<_>>()?;

        let fields = message
            .fields
            .iter()
            .filter(|f| f.oneof.is_none())
            .map(|f| self.field(f))
            .collect::<Result<_>>()?;

        Ok(MessagePlan {
            type_name: message.name.clone(),
            disabled: false,
            oneofs,
            fields,
        })
    }

    fn field(&self, field: &FieldDescriptor) -> Result<FieldPlan> {
        let default_rules = FieldRules::default();
        let rules = field.rules.as_ref().unwrap_or(&default_rules);
        self.message_rules_fit(field, rules, &field.ty)?;

        let presence = match field.ty {
            FieldType::Message(_) if !field.is_repeated() => Presence::WhenSet,
            _ => Presence::Always,
        };
        let mut plan = FieldPlan {
            name: field.name.clone(),
            repeated: field.is_repeated(),
            presence,
            required: rules.required() || kind_required(rules.kind.as_ref()),
            zero: field.default_value(),
            checks: vec![],
            descend: None,
        };
        if rules.skipped() {
            return Ok(plan);
        }

        if let Some(kind) = &rules.kind {
            let target = Target {
                ty: &field.ty,
                repeated: field.is_repeated(),
            };
            plan.checks = self.kind(field, kind, target, &field.name)?;
        }

        let items_skipped = match &rules.kind {
            Some(RuleKind::Repeated(r)) => r.items.as_ref().is_some_and(|i| i.skipped()),
            _ => false,
        };
        if let FieldType::Message(name) = &field.ty
            && !is_well_known(name)
            && !items_skipped
        {
            plan.descend = Some(name.clone());
        }

        Ok(plan)
    }

    /// `message` rules only apply to message-typed targets
    fn message_rules_fit(
        &self,
        field: &FieldDescriptor,
        rules: &FieldRules,
        ty: &FieldType,
    ) -> Result<()> {
        match (&rules.message, ty) {
            (Some(_), FieldType::Message(_)) | (None, _) => Ok(()),
            (Some(_), _) => Err(self.mismatch(field, "message rules require a message field")),
        }
    }

    fn mismatch(&self, field: &FieldDescriptor, message: impl Into<String>) -> Error {
        Error::RuleMismatch {
            message_type: self.message.name.clone(),
            field: field.name.clone(),
            message: message.into(),
        }
    }

    /// Checks for one rule kind, after verifying that it fits `target`
    fn kind(
        &self,
        field: &FieldDescriptor,
        kind: &RuleKind,
        target: Target<'_>,
        display: &str,
    ) -> Result<Vec<Check>> {
        let expect_scalar = |expected: ScalarType| -> Result<()> {
            match target.ty {
                FieldType::Scalar(s) if *s == expected && !target.repeated => Ok(()),
                _ => Err(self.mismatch(
                    field,
                    format!("{} rules require a singular {:?} field", kind.name(), expected),
                )),
            }
        };
        let expect_message = |expected: &str| -> Result<()> {
            match target.ty {
                FieldType::Message(name) if name == expected && !target.repeated => Ok(()),
                _ => Err(self.mismatch(
                    field,
                    format!("{} rules require a singular {} field", kind.name(), expected),
                )),
            }
        };

        Ok(match kind {
            RuleKind::Float(r) => {
                expect_scalar(ScalarType::Float)?;
                numeric(r, |v: f32| Literal::Float(f64::from(v)))
            }
            RuleKind::Double(r) => {
                expect_scalar(ScalarType::Double)?;
                numeric(r, Literal::Float)
            }
            RuleKind::Int32(r) => {
                expect_scalar(ScalarType::Int32)?;
                numeric(r, int)
            }
            RuleKind::Int64(r) => {
                expect_scalar(ScalarType::Int64)?;
                numeric(r, int)
            }
            RuleKind::Uint32(r) => {
                expect_scalar(ScalarType::Uint32)?;
                numeric(r, int)
            }
            RuleKind::Uint64(r) => {
                expect_scalar(ScalarType::Uint64)?;
                numeric(r, int)
            }
            RuleKind::Sint32(r) => {
                expect_scalar(ScalarType::Sint32)?;
                numeric(r, int)
            }
            RuleKind::Sint64(r) => {
                expect_scalar(ScalarType::Sint64)?;
                numeric(r, int)
            }
            RuleKind::Fixed32(r) => {
                expect_scalar(ScalarType::Fixed32)?;
                numeric(r, int)
            }
            RuleKind::Fixed64(r) => {
                expect_scalar(ScalarType::Fixed64)?;
                numeric(r, int)
            }
            RuleKind::Sfixed32(r) => {
                expect_scalar(ScalarType::Sfixed32)?;
                numeric(r, int)
            }
            RuleKind::Sfixed64(r) => {
                expect_scalar(ScalarType::Sfixed64)?;
                numeric(r, int)
            }
            RuleKind::Bool(BoolRules { const_ }) => {
                expect_scalar(ScalarType::Bool)?;
                const_.map(|v| Check::Const(Literal::Bool(v))).into_iter().collect()
            }
            RuleKind::String(r) => {
                expect_scalar(ScalarType::String)?;
                string_checks(r)?
            }
            RuleKind::Bytes(r) => {
                expect_scalar(ScalarType::Bytes)?;
                bytes_checks(r)?
            }
            RuleKind::Enum(r) => {
                let FieldType::Enum(enum_name) = target.ty else {
                    return Err(self.mismatch(field, "enum rules require an enum field"));
                };
                if target.repeated {
                    return Err(self.mismatch(field, "enum rules require a singular field"));
                }
                self.enum_checks(r, enum_name)?
            }
            RuleKind::Repeated(r) => {
                if !target.repeated {
                    return Err(self.mismatch(field, "repeated rules require a repeated field"));
                }
                self.repeated_checks(field, r, target.ty, display)?
            }
            RuleKind::Map(r) => {
                let FieldType::Map(map) = target.ty else {
                    return Err(self.mismatch(field, "map rules require a map field"));
                };
                self.map_checks(field, r, map.key, &map.value, display)?
            }
            RuleKind::Any(AnyRules {
                required: _,
                in_,
                not_in,
            }) => {
                expect_message(ANY)?;
                let urls = |urls: &[String]| {
                    LiteralSet(urls.iter().map(|u| Literal::Str(u.clone())).collect())
                };
                let mut checks = Vec::new();
                if !in_.is_empty() {
                    checks.push(Check::TypeUrlIn(urls(in_)));
                }
                if !not_in.is_empty() {
                    checks.push(Check::TypeUrlNotIn(urls(not_in)));
                }
                checks
            }
            RuleKind::Duration(r) => {
                expect_message(DURATION)?;
                duration_checks(r)
            }
            RuleKind::Timestamp(r) => {
                expect_message(TIMESTAMP)?;
                timestamp_checks(r).map_err(|m| self.mismatch(field, m))?
            }
        })
    }

    fn enum_checks(&self, rules: &EnumRules, enum_name: &str) -> Result<Vec<Check>> {
        let EnumRules {
            const_,
            defined_only,
            in_,
            not_in,
        } = rules;

        let mut checks = Vec::new();
        if let Some(v) = const_ {
            checks.push(Check::Const(int(*v)));
        }
        if *defined_only {
            let mut numbers: Vec<i32> = self
                .schema
                .enum_type(enum_name)?
                .values
                .values()
                .copied()
                .collect();
            numbers.sort_unstable();
            numbers.dedup();
            checks.push(Check::DefinedOnly(numbers));
        }
        if !in_.is_empty() {
            checks.push(Check::In(LiteralSet(in_.iter().map(|v| int(*v)).collect())));
        }
        if !not_in.is_empty() {
            checks.push(Check::NotIn(LiteralSet(
                not_in.iter().map(|v| int(*v)).collect(),
            )));
        }
        Ok(checks)
    }

    fn element(
        &self,
        field: &FieldDescriptor,
        rules: &FieldRules,
        target: Target<'_>,
        display: String,
    ) -> Result<Option<Box<ElementPlan>>> {
        self.message_rules_fit(field, rules, target.ty)?;
        let Some(kind) = &rules.kind else {
            return Ok(None);
        };
        let checks = self.kind(field, kind, target, &display)?;
        Ok(Some(Box::new(ElementPlan { display, checks })))
    }

    fn repeated_checks(
        &self,
        field: &FieldDescriptor,
        rules: &RepeatedRules,
        item_type: &FieldType,
        display: &str,
    ) -> Result<Vec<Check>> {
        let RepeatedRules {
            min_items,
            max_items,
            unique,
            items,
        } = rules;

        let mut checks = Vec::new();
        if let Some(n) = min_items {
            checks.push(Check::MinItems(*n));
        }
        if let Some(n) = max_items {
            checks.push(Check::MaxItems(*n));
        }
        if *unique {
            if matches!(item_type, FieldType::Message(_)) {
                return Err(self.mismatch(field, "unique requires scalar or enum items"));
            }
            checks.push(Check::Unique);
        }
        if let Some(items) = items {
            let target = Target {
                ty: item_type,
                repeated: false,
            };
            if let Some(plan) = self.element(field, items, target, format!("{}[]", display))? {
                checks.push(Check::Items(plan));
            }
        }
        Ok(checks)
    }

    fn map_checks(
        &self,
        field: &FieldDescriptor,
        rules: &MapRules,
        key_type: ScalarType,
        value_type: &FieldType,
        display: &str,
    ) -> Result<Vec<Check>> {
        let MapRules {
            min_pairs,
            max_pairs,
            no_sparse,
            keys,
            values,
        } = rules;

        let mut checks = Vec::new();
        if let Some(n) = min_pairs {
            checks.push(Check::MinPairs(*n));
        }
        if let Some(n) = max_pairs {
            checks.push(Check::MaxPairs(*n));
        }
        if *no_sparse {
            // map values are never null once decoded
            tracing::debug!(field = %field.name, "map.no_sparse has no effect");
        }
        if let Some(keys) = keys {
            let key_type = FieldType::Scalar(key_type);
            let target = Target {
                ty: &key_type,
                repeated: false,
            };
            if let Some(plan) = self.element(field, keys, target, format!("{}<key>", display))? {
                checks.push(Check::Keys(plan));
            }
        }
        if let Some(values) = values {
            let target = Target {
                ty: value_type,
                repeated: false,
            };
            if let Some(plan) =
                self.element(field, values, target, format!("{}<value>", display))?
            {
                checks.push(Check::Values(plan));
            }
        }
        Ok(checks)
    }
}

fn regex_error(pattern: &str, e: regex::Error) -> Error {
    Error::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    }
}

fn string_checks(rules: &StringRules) -> Result<Vec<Check>> {
    let StringRules {
        const_,
        len,
        min_len,
        max_len,
        len_bytes,
        min_bytes,
        max_bytes,
        pattern,
        prefix,
        suffix,
        contains,
        not_contains,
        in_,
        not_in,
        email,
        hostname,
        ip,
        ipv4,
        ipv6,
        uri,
        uri_ref,
        address,
        uuid,
    } = rules;

    let str_lit = |s: &String| Literal::Str(s.clone());
    let mut checks = Vec::new();
    if let Some(v) = const_ {
        checks.push(Check::Const(str_lit(v)));
    }
    checks.extend(len.map(Check::Len));
    checks.extend(min_len.map(Check::MinLen));
    checks.extend(max_len.map(Check::MaxLen));
    checks.extend(len_bytes.map(Check::LenBytes));
    checks.extend(min_bytes.map(Check::MinBytes));
    checks.extend(max_bytes.map(Check::MaxBytes));
    if let Some(p) = pattern {
        let regex = regex::Regex::new(p).map_err(|e| regex_error(p, e))?;
        checks.push(Check::Pattern(regex));
    }
    checks.extend(prefix.as_ref().map(|v| Check::Prefix(str_lit(v))));
    checks.extend(suffix.as_ref().map(|v| Check::Suffix(str_lit(v))));
    checks.extend(contains.as_ref().map(|v| Check::Contains(str_lit(v))));
    checks.extend(not_contains.as_ref().map(|v| Check::NotContains(str_lit(v))));
    if !in_.is_empty() {
        checks.push(Check::In(LiteralSet(in_.iter().map(str_lit).collect())));
    }
    if !not_in.is_empty() {
        checks.push(Check::NotIn(LiteralSet(not_in.iter().map(str_lit).collect())));
    }

    let formats = [
        (*email, Format::Email),
        (*hostname, Format::Hostname),
        (*ip, Format::Ip),
        (*ipv4, Format::Ipv4),
        (*ipv6, Format::Ipv6),
        (*uri, Format::Uri),
        (*uri_ref, Format::UriRef),
        (*address, Format::Address),
        (*uuid, Format::Uuid),
    ];
    checks.extend(
        formats
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, format)| Check::Format(format)),
    );
    Ok(checks)
}

fn bytes_checks(rules: &BytesRules) -> Result<Vec<Check>> {
    let BytesRules {
        const_,
        len,
        min_len,
        max_len,
        pattern,
        prefix,
        suffix,
        contains,
        not_contains,
        in_,
        not_in,
        ip,
        ipv4,
        ipv6,
    } = rules;

    let bytes_lit = |s: &String| Literal::Bytes(s.as_bytes().to_vec());
    let mut checks = Vec::new();
    if let Some(v) = const_ {
        checks.push(Check::Const(bytes_lit(v)));
    }
    checks.extend(len.map(Check::Len));
    checks.extend(min_len.map(Check::MinLen));
    checks.extend(max_len.map(Check::MaxLen));
    if let Some(p) = pattern {
        if p.is_ascii() {
            let regex = regex::bytes::Regex::new(p).map_err(|e| regex_error(p, e))?;
            checks.push(Check::BytesPattern(regex));
        } else {
            checks.push(Check::InvalidPattern(p.clone()));
        }
    }
    checks.extend(prefix.as_ref().map(|v| Check::Prefix(bytes_lit(v))));
    checks.extend(suffix.as_ref().map(|v| Check::Suffix(bytes_lit(v))));
    checks.extend(contains.as_ref().map(|v| Check::Contains(bytes_lit(v))));
    checks.extend(not_contains.as_ref().map(|v| Check::NotContains(bytes_lit(v))));
    if !in_.is_empty() {
        checks.push(Check::In(LiteralSet(in_.iter().map(bytes_lit).collect())));
    }
    if !not_in.is_empty() {
        checks.push(Check::NotIn(LiteralSet(not_in.iter().map(bytes_lit).collect())));
    }
    if *ip {
        checks.push(Check::Format(Format::Ip));
    }
    if *ipv4 {
        checks.push(Check::Format(Format::Ipv4));
    }
    if *ipv6 {
        checks.push(Check::Format(Format::Ipv6));
    }
    Ok(checks)
}

fn duration_checks(rules: &DurationRules) -> Vec<Check> {
    let DurationRules {
        required: _,
        const_,
        lt,
        lte,
        gt,
        gte,
        in_,
        not_in,
    } = rules;

    let mut checks = Vec::new();
    checks.extend(const_.map(|v| Check::Const(Literal::Duration(v))));
    checks.extend(lt.map(|v| Check::Lt(Literal::Duration(v))));
    checks.extend(lte.map(|v| Check::Lte(Literal::Duration(v))));
    checks.extend(gt.map(|v| Check::Gt(Literal::Duration(v))));
    checks.extend(gte.map(|v| Check::Gte(Literal::Duration(v))));
    if !in_.is_empty() {
        checks.push(Check::In(LiteralSet(
            in_.iter().copied().map(Literal::Duration).collect(),
        )));
    }
    if !not_in.is_empty() {
        checks.push(Check::NotIn(LiteralSet(
            not_in.iter().copied().map(Literal::Duration).collect(),
        )));
    }
    checks
}

fn timestamp_checks(rules: &TimestampRules) -> std::result::Result<Vec<Check>, String> {
    let TimestampRules {
        required: _,
        const_,
        lt,
        lte,
        gt,
        gte,
        lt_now,
        gt_now,
        within,
        in_,
        not_in,
    } = rules;

    let mut checks = Vec::new();
    checks.extend(const_.map(|v| Check::Const(Literal::Timestamp(v))));
    checks.extend(lt.map(|v| Check::Lt(Literal::Timestamp(v))));
    checks.extend(lte.map(|v| Check::Lte(Literal::Timestamp(v))));
    checks.extend(gt.map(|v| Check::Gt(Literal::Timestamp(v))));
    checks.extend(gte.map(|v| Check::Gte(Literal::Timestamp(v))));
    if !in_.is_empty() {
        checks.push(Check::In(LiteralSet(
            in_.iter().copied().map(Literal::Timestamp).collect(),
        )));
    }
    if !not_in.is_empty() {
        checks.push(Check::NotIn(LiteralSet(
            not_in.iter().copied().map(Literal::Timestamp).collect(),
        )));
    }

    let now = match (*lt_now, *gt_now, within) {
        (true, true, _) => return Err("lt_now and gt_now cannot be combined".to_string()),
        (false, false, None) => None,
        (true, false, None) => Some(NowCheck::Before),
        (false, true, None) => Some(NowCheck::After),
        (false, false, Some(d)) => Some(NowCheck::Within(*d, spec_seconds(d))),
        (true, false, Some(d)) => Some(NowCheck::WithinBefore(*d, spec_seconds(d))),
        (false, true, Some(d)) => Some(NowCheck::WithinAfter(*d, spec_seconds(d))),
    };
    checks.extend(now.map(Check::Now));
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(yaml: &str) -> Schema {
        Schema::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_disabled_message_compiles_to_empty_plan() {
        let schema = schema(
            r#"
messages:
  - name: test.Inner
    disabled: true
    fields:
      - name: value
        type: string
        rules: { string: { const: valid } }
"#,
        );
        let plan = compile(&schema, "test.Inner").unwrap();
        assert!(plan.disabled);
        assert!(plan.fields.is_empty());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_oneof_members_and_plain_fields_split() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    oneofs:
      - { name: type, required: true }
    fields:
      - { name: foo, type: string, oneof: type }
      - { name: bar, type: int32, oneof: type }
      - { name: baz, type: int32 }
"#,
        );
        let plan = compile(&schema, "test.Message").unwrap();
        assert_eq!(plan.oneofs.len(), 1);
        assert_eq!(plan.oneofs[0].members.len(), 2);
        assert_eq!(plan.fields.len(), 1);
        assert_eq!(plan.fields[0].name, "baz");
    }

    #[test]
    fn test_checks_follow_rule_order() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: port
        type: uint32
        rules: { uint32: { not_in: [22], gt: 0, lt: 65536 } }
"#,
        );
        let plan = compile(&schema, "test.Message").unwrap();
        let checks = &plan.fields[0].checks;
        assert!(matches!(checks[0], Check::Lt(Literal::Int(65536))));
        assert!(matches!(checks[1], Check::Gt(Literal::Int(0))));
        assert!(matches!(checks[2], Check::NotIn(_)));
    }

    #[test]
    fn test_rule_kind_mismatch_is_loud() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: port
        type: uint32
        rules: { int32: { gt: 0 } }
"#,
        );
        let err = compile(&schema, "test.Message").unwrap_err();
        assert!(matches!(err, Error::RuleMismatch { .. }));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_invalid_string_pattern_is_loud() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: name
        type: string
        rules: { string: { pattern: "[unclosed" } }
"#,
        );
        assert!(matches!(
            compile(&schema, "test.Message"),
            Err(Error::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_non_ascii_bytes_pattern_compiles() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: data
        type: bytes
        rules: { bytes: { pattern: "ü+" } }
"#,
        );
        let plan = compile(&schema, "test.Message").unwrap();
        assert!(matches!(plan.fields[0].checks[0], Check::InvalidPattern(_)));
    }

    #[test]
    fn test_skip_stops_after_presence() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: inner
        type: { message: test.Message }
        rules: { message: { required: true, skip: true } }
"#,
        );
        let plan = compile(&schema, "test.Message").unwrap();
        let field = &plan.fields[0];
        assert!(field.required);
        assert!(field.descend.is_none());
        assert_eq!(field.presence, Presence::WhenSet);
    }

    #[test]
    fn test_message_rules_on_scalar_field_are_rejected() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: port
        type: uint32
        rules: { message: { required: true } }
"#,
        );
        let err = compile(&schema, "test.Message").unwrap_err();
        assert!(
            matches!(&err, Error::RuleMismatch { field, .. } if field == "port"),
            "{err:?}"
        );
        assert!(err.to_string().contains("message rules require a message field"));
    }

    #[test]
    fn test_message_rules_on_repeated_items_are_rejected() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: names
        type: string
        label: repeated
        rules: { repeated: { items: { message: { skip: true } } } }
"#,
        );
        let err = compile(&schema, "test.Message").unwrap_err();
        assert!(matches!(&err, Error::RuleMismatch { field, .. } if field == "names"));
    }

    #[test]
    fn test_recursive_type_descends_by_name() {
        let schema = schema(
            r#"
messages:
  - name: test.Node
    fields:
      - name: children
        type: { message: test.Node }
        label: repeated
"#,
        );
        let plan = compile(&schema, "test.Node").unwrap();
        assert_eq!(plan.fields[0].descend.as_deref(), Some("test.Node"));
        assert!(plan.fields[0].repeated);
    }

    #[test]
    fn test_well_known_types_are_not_descended() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: timeout
        type: { message: google.protobuf.Duration }
        rules: { duration: { required: true, lte: { seconds: 60 } } }
"#,
        );
        let plan = compile(&schema, "test.Message").unwrap();
        let field = &plan.fields[0];
        assert!(field.required);
        assert!(field.descend.is_none());
        assert_eq!(field.checks.len(), 1);
    }

    #[test]
    fn test_map_rules_on_non_map_field() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: tags
        type: string
        label: repeated
        rules: { map: { min_pairs: 1 } }
"#,
        );
        assert!(compile(&schema, "test.Message").is_err());
    }

    #[test]
    fn test_lt_now_with_gt_now_rejected() {
        let schema = schema(
            r#"
messages:
  - name: test.Message
    fields:
      - name: at
        type: { message: google.protobuf.Timestamp }
        rules: { timestamp: { lt_now: true, gt_now: true } }
"#,
        );
        assert!(compile(&schema, "test.Message").is_err());
    }
}
