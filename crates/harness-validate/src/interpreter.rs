//! Plan interpreter
//!
//! Runs a compiled [`MessagePlan`] against a dynamic message. The first
//! violated check ends the run.

use bigdecimal::BigDecimal;
use harness_core::{DynamicMessage, Schema, Value};
use std::cmp::Ordering;

use crate::cache;
use crate::error::{Result, ValidationError};
use crate::plan::*;
use crate::time::{decimal_seconds, format_duration, now, spec_seconds};

type Outcome = std::result::Result<(), ValidationError>;

/// Run `plan` against `message`, descending into nested messages
pub(crate) fn run(schema: &Schema, plan: &MessagePlan, message: &DynamicMessage) -> Result<()> {
    if plan.disabled {
        return Ok(());
    }

    for oneof in &plan.oneofs {
        match oneof.members.iter().find(|m| message.has(&m.name)) {
            Some(member) => field(schema, member, message)?,
            None if oneof.required => {
                return Err(ValidationError::new(
                    &oneof.name,
                    format!("Oneof {} is required", oneof.name),
                )
                .into());
            }
            None => {}
        }
    }

    for plan in &plan.fields {
        field(schema, plan, message)?;
    }
    Ok(())
}

fn field(schema: &Schema, plan: &FieldPlan, message: &DynamicMessage) -> Result<()> {
    let value = match (message.get(&plan.name), plan.presence) {
        (Some(value), _) => value,
        (None, _) if plan.required => {
            return Err(ValidationError::new(&plan.name, format!("{} is required", plan.name)).into());
        }
        (None, Presence::WhenSet) => return Ok(()),
        (None, Presence::Always) => match &plan.zero {
            Some(zero) => zero,
            None => return Ok(()),
        },
    };

    for check in &plan.checks {
        apply(check, value, &plan.name)?;
    }

    if let Some(type_name) = &plan.descend {
        match value {
            Value::Message(nested) => descend(schema, type_name, nested)?,
            Value::List(items) => {
                for item in items {
                    if let Value::Message(nested) = item {
                        descend(schema, type_name, nested)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn descend(schema: &Schema, type_name: &str, nested: &DynamicMessage) -> Result<()> {
    let plan = cache::plan(schema, type_name)?;
    run(schema, &plan, nested)
}

fn fail(path: &str, message: impl std::fmt::Display) -> Outcome {
    Err(ValidationError::new(path, format!("{} {}", path, message)))
}

fn time_seconds(message: &DynamicMessage) -> BigDecimal {
    let (seconds, nanos) = message.seconds_and_nanos();
    decimal_seconds(seconds, nanos)
}

fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Value::Message(m), Literal::Duration(spec) | Literal::Timestamp(spec)) => {
            time_seconds(m).partial_cmp(&spec_seconds(spec))
        }
        (Value::F32(v), Literal::Float(l)) => f64::from(*v).partial_cmp(l),
        (Value::F64(v), Literal::Float(l)) => v.partial_cmp(l),
        (Value::Bool(v), Literal::Bool(l)) => Some(v.cmp(l)),
        (Value::String(v), Literal::Str(l)) => Some(v.as_str().cmp(l.as_str())),
        (Value::Bytes(v), Literal::Bytes(l)) => Some(v.as_slice().cmp(l.as_slice())),
        (v, Literal::Int(l)) => v.as_i128().map(|v| v.cmp(l)),
        _ => None,
    }
}

fn contains_literal(set: &LiteralSet, value: &Value) -> bool {
    set.0
        .iter()
        .any(|l| compare(value, l) == Some(Ordering::Equal))
}

fn text(value: &Value) -> Option<&[u8]> {
    match value {
        Value::String(s) => Some(s.as_bytes()),
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

fn length(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => Some(s.chars().count() as u64),
        Value::Bytes(b) => Some(b.len() as u64),
        _ => None,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn repeated_items(items: &[Value]) -> Vec<Value> {
    let mut repeated: Vec<Value> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if items[..i].contains(item) && !repeated.contains(item) {
            repeated.push(item.clone());
        }
    }
    repeated
}

fn elements<'a>(
    plan: &ElementPlan,
    values: impl IntoIterator<Item = &'a Value>,
) -> Outcome {
    for value in values {
        for check in &plan.checks {
            apply(check, value, &plan.display)?;
        }
    }
    Ok(())
}

fn apply(check: &Check, value: &Value, path: &str) -> Outcome {
    let unexpected = || fail(path, format!("has unexpected value {}", value));

    match check {
        Check::Const(l) => {
            if compare(value, l) != Some(Ordering::Equal) {
                return fail(path, format!("not equal to {}", l));
            }
        }
        Check::Lt(l) => {
            if compare(value, l) != Some(Ordering::Less) {
                return fail(path, format!("is not lesser than {}", l));
            }
        }
        Check::Lte(l) => {
            if !matches!(compare(value, l), Some(Ordering::Less | Ordering::Equal)) {
                return fail(path, format!("is not lesser than or equal to {}", l));
            }
        }
        Check::Gt(l) => {
            if compare(value, l) != Some(Ordering::Greater) {
                return fail(path, format!("is not greater than {}", l));
            }
        }
        Check::Gte(l) => {
            if !matches!(compare(value, l), Some(Ordering::Greater | Ordering::Equal)) {
                return fail(path, format!("is not greater than or equal to {}", l));
            }
        }
        Check::In(set) => {
            if !contains_literal(set, value) {
                return fail(path, format!("not in {}", set));
            }
        }
        Check::NotIn(set) => {
            if contains_literal(set, value) {
                return fail(path, format!("in {}", set));
            }
        }
        Check::Len(n) | Check::MinLen(n) | Check::MaxLen(n) => {
            let Some(len) = length(value) else {
                return unexpected();
            };
            match check {
                Check::Len(_) if len != *n => {
                    return fail(path, format!("length does not equal {}", n));
                }
                Check::MinLen(_) if len < *n => {
                    return fail(path, format!("length is less than {}", n));
                }
                Check::MaxLen(_) if len > *n => {
                    return fail(path, format!("length is more than {}", n));
                }
                _ => {}
            }
        }
        Check::LenBytes(n) | Check::MinBytes(n) | Check::MaxBytes(n) => {
            let Some(len) = text(value).map(|t| t.len() as u64) else {
                return unexpected();
            };
            match check {
                Check::LenBytes(_) if len != *n => {
                    return fail(path, format!("bytes count does not equal {}", n));
                }
                Check::MinBytes(_) if len < *n => {
                    return fail(path, format!("bytes count is less than {}", n));
                }
                Check::MaxBytes(_) if len > *n => {
                    return fail(path, format!("bytes count is more than {}", n));
                }
                _ => {}
            }
        }
        Check::Pattern(regex) => match value {
            Value::String(s) if regex.is_match(s) => {}
            Value::String(_) => {
                return fail(path, format!("does not match pattern '{}'", regex.as_str()));
            }
            _ => return unexpected(),
        },
        Check::BytesPattern(regex) => match value {
            Value::Bytes(b) if regex.is_match(b) => {}
            Value::Bytes(_) => {
                return fail(path, format!("does not match pattern b'{}'", regex.as_str()));
            }
            _ => return unexpected(),
        },
        Check::InvalidPattern(pattern) => {
            return fail(path, format!("has invalid validation pattern {}", pattern));
        }
        Check::Prefix(l) | Check::Suffix(l) | Check::Contains(l) | Check::NotContains(l) => {
            let Some(haystack) = text(value) else {
                return unexpected();
            };
            let needle = l.as_bytes();
            match check {
                Check::Prefix(_) if !haystack.starts_with(needle) => {
                    return fail(path, format!("does not start with prefix {}", l));
                }
                Check::Suffix(_) if !haystack.ends_with(needle) => {
                    return fail(path, format!("does not end with suffix {}", l));
                }
                Check::Contains(_) if !find(haystack, needle) => {
                    return fail(path, format!("does not contain {}", l));
                }
                Check::NotContains(_) if find(haystack, needle) => {
                    return fail(path, format!("contains {}", l));
                }
                _ => {}
            }
        }
        Check::Format(format) => {
            let outcome = match value {
                Value::String(s) => format.check_str(s),
                Value::Bytes(b) => format.check_bytes(b),
                _ => return unexpected(),
            };
            if let Err(message) = outcome {
                return fail(path, message);
            }
        }
        Check::DefinedOnly(numbers) => match value {
            Value::Enum(n) if numbers.binary_search(n).is_ok() => {}
            Value::Enum(_) => return fail(path, "is not defined"),
            _ => return unexpected(),
        },
        Check::MinItems(n) | Check::MaxItems(n) => {
            let Some(items) = value.as_list() else {
                return unexpected();
            };
            let len = items.len() as u64;
            match check {
                Check::MinItems(_) if len < *n => {
                    return fail(path, format!("must contain at least {} items", n));
                }
                Check::MaxItems(_) if len > *n => {
                    return fail(path, format!("must contain no more than {} items", n));
                }
                _ => {}
            }
        }
        Check::Unique => {
            let Some(items) = value.as_list() else {
                return unexpected();
            };
            let repeated = repeated_items(items);
            if !repeated.is_empty() {
                return fail(
                    path,
                    format!(
                        "must contain unique items; repeated items: {}",
                        Value::List(repeated)
                    ),
                );
            }
        }
        Check::Items(plan) => {
            let Some(items) = value.as_list() else {
                return unexpected();
            };
            elements(plan, items)?;
        }
        Check::MinPairs(n) | Check::MaxPairs(n) => {
            let Some(entries) = value.as_map() else {
                return unexpected();
            };
            let len = entries.len() as u64;
            match check {
                Check::MinPairs(_) if len < *n => {
                    return fail(path, format!("must contain at least {} pairs", n));
                }
                Check::MaxPairs(_) if len > *n => {
                    return fail(path, format!("must contain no more than {} pairs", n));
                }
                _ => {}
            }
        }
        Check::Keys(plan) => {
            let Some(entries) = value.as_map() else {
                return unexpected();
            };
            elements(plan, entries.iter().map(|(k, _)| k))?;
        }
        Check::Values(plan) => {
            let Some(entries) = value.as_map() else {
                return unexpected();
            };
            elements(plan, entries.iter().map(|(_, v)| v))?;
        }
        Check::TypeUrlIn(set) | Check::TypeUrlNotIn(set) => {
            let Some(type_url) = value.as_message().and_then(|m| m.get("type_url")) else {
                return unexpected();
            };
            let member = contains_literal(set, type_url);
            let type_url_path = format!("{}.type_url", path);
            match check {
                Check::TypeUrlIn(_) if !member => {
                    return fail(&type_url_path, format!("not in {}", set));
                }
                Check::TypeUrlNotIn(_) if member => {
                    return fail(&type_url_path, format!("in {}", set));
                }
                _ => {}
            }
        }
        Check::Now(relation) => {
            let Some(message) = value.as_message() else {
                return unexpected();
            };
            let value = time_seconds(message);
            let now = now();
            match relation {
                NowCheck::Before if value >= now => {
                    return fail(path, "is not lesser than now");
                }
                NowCheck::After if value <= now => {
                    return fail(path, "is not greater than now");
                }
                NowCheck::Within(spec, d) if (&value - &now).abs() >= *d => {
                    return fail(
                        path,
                        format!("is not within {} from now", format_duration(spec)),
                    );
                }
                NowCheck::WithinBefore(spec, d) if !(value > &now - d && value < now) => {
                    return fail(
                        path,
                        format!("is not within {} before now", format_duration(spec)),
                    );
                }
                NowCheck::WithinAfter(spec, d) if !(value > now && value < &now + d) => {
                    return fail(
                        path,
                        format!("is not within {} after now", format_duration(spec)),
                    );
                }
                _ => {}
            }
        }
    }
    Ok(())
}
