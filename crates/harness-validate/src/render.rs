//! Plan rendering
//!
//! Renders a compiled plan as indented pseudo-source for `harness plan`.
//! The output is meant for humans; it is not parsed back.

use std::fmt::Write as _;

use crate::plan::*;

/// Line buffer with nested indentation scopes
#[derive(Debug, Default)]
pub struct SourceBuffer {
    lines: Vec<String>,
    indent: usize,
}

impl SourceBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at the current indentation
    pub fn add(&mut self, line: impl AsRef<str>) {
        let line = format!("{}{}", "    ".repeat(self.indent), line.as_ref());
        self.lines.push(line.trim_end().to_string());
    }

    /// Run `body` one level deeper
    pub fn indented(&mut self, body: impl FnOnce(&mut Self)) {
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    /// Number of lines written so far
    pub fn position(&self) -> usize {
        self.lines.len()
    }

    /// Joined content, newline terminated
    pub fn content(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

/// Render `plan` as text
pub fn render(plan: &MessagePlan) -> String {
    let mut buf = SourceBuffer::new();
    buf.add(format!("validate {}:", plan.type_name));
    buf.indented(|buf| {
        let start = buf.position();
        if plan.disabled {
            buf.add("return  # disabled");
            return;
        }
        for oneof in &plan.oneofs {
            render_oneof(buf, oneof);
        }
        for field in &plan.fields {
            render_field(buf, field);
        }
        if buf.position() == start {
            buf.add("pass");
        }
    });
    buf.content()
}

fn render_oneof(buf: &mut SourceBuffer, oneof: &OneofPlan) {
    buf.add(format!("match oneof {}:", oneof.name));
    buf.indented(|buf| {
        for member in &oneof.members {
            buf.add(format!("case {}:", member.name));
            buf.indented(|buf| {
                let start = buf.position();
                render_field(buf, member);
                if buf.position() == start {
                    buf.add("pass");
                }
            });
        }
        if oneof.required {
            buf.add("case none:");
            buf.indented(|buf| buf.add(format!("fail 'Oneof {} is required'", oneof.name)));
        }
    });
}

fn render_field(buf: &mut SourceBuffer, field: &FieldPlan) {
    let name = &field.name;
    if field.required {
        buf.add(format!("require {}", name));
    }
    if field.checks.is_empty() && field.descend.is_none() {
        return;
    }

    let guarded = field.presence == Presence::WhenSet && !field.required;
    if guarded {
        buf.add(format!("if has {}:", name));
        buf.indent += 1;
    }
    for check in &field.checks {
        render_check(buf, check, name);
    }
    if let Some(type_name) = &field.descend {
        if field.repeated {
            buf.add(format!("for item in {}:", name));
            buf.indented(|buf| buf.add(format!("validate item as {}", type_name)));
        } else {
            buf.add(format!("validate {} as {}", name, type_name));
        }
    }
    if guarded {
        buf.indent -= 1;
    }
}

fn render_elements(buf: &mut SourceBuffer, header: String, plan: &ElementPlan) {
    buf.add(header);
    buf.indented(|buf| {
        for check in &plan.checks {
            render_check(buf, check, &plan.display);
        }
        if plan.checks.is_empty() {
            buf.add("pass");
        }
    });
}

fn render_check(buf: &mut SourceBuffer, check: &Check, path: &str) {
    let line = match check {
        Check::Const(l) => format!("assert {} == {}", path, l),
        Check::Lt(l) => format!("assert {} < {}", path, l),
        Check::Lte(l) => format!("assert {} <= {}", path, l),
        Check::Gt(l) => format!("assert {} > {}", path, l),
        Check::Gte(l) => format!("assert {} >= {}", path, l),
        Check::In(set) => format!("assert {} in {}", path, set),
        Check::NotIn(set) => format!("assert {} not in {}", path, set),
        Check::Len(n) => format!("assert len({}) == {}", path, n),
        Check::MinLen(n) => format!("assert len({}) >= {}", path, n),
        Check::MaxLen(n) => format!("assert len({}) <= {}", path, n),
        Check::LenBytes(n) => format!("assert bytes({}) == {}", path, n),
        Check::MinBytes(n) => format!("assert bytes({}) >= {}", path, n),
        Check::MaxBytes(n) => format!("assert bytes({}) <= {}", path, n),
        Check::Pattern(r) => format!("assert {} matches '{}'", path, r.as_str()),
        Check::BytesPattern(r) => format!("assert {} matches b'{}'", path, r.as_str()),
        Check::InvalidPattern(p) => format!("fail '{} has invalid validation pattern {}'", path, p),
        Check::Prefix(l) => format!("assert {} starts with {}", path, l),
        Check::Suffix(l) => format!("assert {} ends with {}", path, l),
        Check::Contains(l) => format!("assert {} contains {}", path, l),
        Check::NotContains(l) => format!("assert {} not contains {}", path, l),
        Check::Format(f) => format!("check {}({})", f.name(), path),
        Check::DefinedOnly(numbers) => format!("assert {} in {:?}", path, numbers),
        Check::MinItems(n) | Check::MinPairs(n) => format!("assert count({}) >= {}", path, n),
        Check::MaxItems(n) | Check::MaxPairs(n) => format!("assert count({}) <= {}", path, n),
        Check::Unique => format!("assert unique({})", path),
        Check::Items(plan) => {
            return render_elements(buf, format!("for {} in {}:", plan.display, path), plan);
        }
        Check::Keys(plan) => {
            return render_elements(buf, format!("for {} in keys({}):", plan.display, path), plan);
        }
        Check::Values(plan) => {
            return render_elements(
                buf,
                format!("for {} in values({}):", plan.display, path),
                plan,
            );
        }
        Check::TypeUrlIn(set) => format!("assert {}.type_url in {}", path, set),
        Check::TypeUrlNotIn(set) => format!("assert {}.type_url not in {}", path, set),
        Check::Now(relation) => match relation {
            NowCheck::Before => format!("assert {} < now", path),
            NowCheck::After => format!("assert {} > now", path),
            NowCheck::Within(spec, _) => format!(
                "assert abs({} - now) < {}",
                path,
                crate::time::format_duration(spec)
            ),
            NowCheck::WithinBefore(spec, _) => format!(
                "assert now - {} < {} < now",
                crate::time::format_duration(spec),
                path
            ),
            NowCheck::WithinAfter(spec, _) => format!(
                "assert now < {} < now + {}",
                path,
                crate::time::format_duration(spec)
            ),
        },
    };
    buf.add(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use harness_core::Schema;

    #[test]
    fn test_buffer_indentation() {
        let mut buf = SourceBuffer::new();
        buf.add("a:");
        buf.indented(|buf| {
            buf.add("b:");
            buf.indented(|buf| buf.add("c  "));
        });
        buf.add("d");
        assert_eq!(buf.content(), "a:\n    b:\n        c\nd\n");
    }

    #[test]
    fn test_empty_plan_renders_pass() {
        let schema = Schema::from_yaml(
            r#"
messages:
  - name: test.Empty
    fields:
      - { name: value, type: string }
"#,
        )
        .unwrap();
        let plan = compile(&schema, "test.Empty").unwrap();
        assert_eq!(render(&plan), "validate test.Empty:\n    pass\n");
    }

    #[test]
    fn test_render_oneof_and_items() {
        let schema = Schema::from_yaml(
            r#"
messages:
  - name: test.Message
    oneofs:
      - { name: type, required: true }
    fields:
      - { name: foo, type: string, oneof: type }
      - name: field
        type: int32
        label: repeated
        rules: { repeated: { items: { int32: { lt: 5 } } } }
"#,
        )
        .unwrap();
        let plan = compile(&schema, "test.Message").unwrap();
        let expected = "\
validate test.Message:
    match oneof type:
        case foo:
            pass
        case none:
            fail 'Oneof type is required'
    for field[] in field:
        assert field[] < 5
";
        assert_eq!(render(&plan), expected);
    }

    #[test]
    fn test_render_disabled() {
        let schema = Schema::from_yaml(
            "messages: [{ name: test.Off, disabled: true }]",
        )
        .unwrap();
        let plan = compile(&schema, "test.Off").unwrap();
        assert_eq!(render(&plan), "validate test.Off:\n    return  # disabled\n");
    }
}
