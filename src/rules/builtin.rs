#![forbid(unsafe_code)]

//! Built-in rule catalogue
//!
//! Presence, size, range, enumeration and conditional-presence rules live
//! here; string formats and patterns are in `format`, expressions in
//! `expr_rule`.

use super::expr_rule::expression;
use super::format::{pattern, string_format};
use super::rule::{
    RuleCore, RuleFactory, RuleInput, ValidationRule, guard_value, numeric_literal, zero_check,
};
use crate::engine::GenerationContext;
use crate::expr::string_literal;
use crate::types::TypeKind;

/// Every built-in rule: identifier, description and factory
pub const BUILTIN_RULES: &[(&str, &str, RuleFactory)] = &[
    ("required", "value must be present and non-zero", required),
    ("minlength", "string has at least N characters", length),
    ("maxlength", "string has at most N characters", length),
    ("length", "string or collection has exactly N characters or items", length),
    ("minitems", "collection has at least N items", length),
    ("maxitems", "collection has at most N items", length),
    ("gt", "number is greater than N", range),
    ("gte", "number is greater than or equal to N", range),
    ("lt", "number is less than N", range),
    ("lte", "number is less than or equal to N", range),
    ("enum", "value is one of a space-separated list", enumeration),
    ("email", "string is an email address", string_format),
    ("url", "string is an absolute URL", string_format),
    ("uuid", "string is a hyphenated UUID", string_format),
    ("alpha", "string contains only letters", string_format),
    ("alphanumeric", "string contains only letters and digits", string_format),
    ("ipv4", "string is an IPv4 address", string_format),
    ("ipv6", "string is an IPv6 address", string_format),
    ("pattern", "string matches a regular expression", pattern),
    ("required_if", "required when other fields have given values", conditional),
    ("required_unless", "required unless other fields have given values", conditional),
    ("required_with", "required when any of the named fields is present", conditional),
    ("required_without", "required when any of the named fields is absent", conditional),
    ("cel", "value satisfies a CEL expression", expression),
];

/// A rule whose failure condition is fixed at construction
#[derive(Debug, Clone)]
pub struct RequiredRule {
    core: RuleCore,
    condition: String,
}

impl ValidationRule for RequiredRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }
}

pub fn required(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let path = input.path();
    let Some(condition) = zero_check(&path.accessor(), &input.field.ty) else {
        tracing::debug!(path = %path, ty = %input.field.ty.describe(), "required does not apply");
        return None;
    };
    let core = RuleCore::new(input, ctx, format!("{} is required", input.label()));
    Some(Box::new(RequiredRule { core, condition }))
}

#[derive(Debug, Clone)]
pub struct LengthRule {
    core: RuleCore,
    condition: String,
}

impl ValidationRule for LengthRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }
}

pub fn length(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let ty = &input.field.ty;
    let applies = match input.kind {
        "minlength" | "maxlength" => ty.is_string(),
        "minitems" | "maxitems" => ty.is_collection(),
        _ => ty.is_string() || ty.is_collection(),
    };
    if !applies {
        tracing::debug!(kind = input.kind, ty = %ty.describe(), "length rule does not apply");
        return None;
    }

    let path = input.path();
    let Some(raw) = input.expression() else {
        ctx.warn(&path, input.kind, format!("'{}' needs a length argument", input.kind));
        return None;
    };
    let Ok(bound) = raw.parse::<usize>() else {
        ctx.warn(
            &path,
            input.kind,
            format!("'{raw}' is not a valid length for '{}'", input.kind),
        );
        return None;
    };

    let label = input.label();
    let unit = if ty.is_string() { "characters" } else { "items" };
    let (op, message) = match input.kind {
        "minlength" | "minitems" if ty.is_string() => {
            ("<", format!("{label} must be at least {bound} characters long"))
        }
        "minlength" | "minitems" => ("<", format!("{label} must contain at least {bound} items")),
        "maxlength" | "maxitems" if ty.is_string() => {
            (">", format!("{label} must be at most {bound} characters long"))
        }
        "maxlength" | "maxitems" => (">", format!("{label} must contain at most {bound} items")),
        _ => ("!=", format!("{label} must have exactly {bound} {unit}")),
    };

    let core = RuleCore::new(input, ctx, message);
    let condition = guard_value(&core.accessor(), ty, &|operand, ty| {
        let measure = if ty.is_string() {
            format!("{operand}.chars().count()")
        } else {
            format!("{operand}.len()")
        };
        format!("{measure} {op} {bound}")
    });
    Some(Box::new(LengthRule { core, condition }))
}

#[derive(Debug, Clone)]
pub struct RangeRule {
    core: RuleCore,
    condition: String,
}

impl ValidationRule for RangeRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }
}

pub fn range(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let ty = &input.field.ty;
    if !ty.is_numeric() {
        tracing::debug!(kind = input.kind, ty = %ty.describe(), "range rule does not apply");
        return None;
    }
    let path = input.path();
    let raw = input.expression().unwrap_or_default();
    let Some(literal) = numeric_literal(raw, ty) else {
        ctx.warn(
            &path,
            input.kind,
            format!("bound '{raw}' is not a valid {} value", ty.dereferenced().describe()),
        );
        return None;
    };

    let label = input.label();
    let (op, message) = match input.kind {
        "gt" => ("<=", format!("{label} must be greater than {literal}")),
        "gte" => ("<", format!("{label} must be greater than or equal to {literal}")),
        "lt" => (">=", format!("{label} must be less than {literal}")),
        _ => (">", format!("{label} must be less than or equal to {literal}")),
    };
    let core = RuleCore::new(input, ctx, message);
    let condition = guard_value(&core.accessor(), ty, &|operand, _| {
        format!("{operand} {op} {literal}")
    });
    Some(Box::new(RangeRule { core, condition }))
}

#[derive(Debug, Clone)]
pub struct EnumRule {
    core: RuleCore,
    condition: String,
}

impl ValidationRule for EnumRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }
}

pub fn enumeration(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let ty = &input.field.ty;
    if !ty.is_string() && !ty.is_numeric() {
        tracing::debug!(ty = %ty.describe(), "enum does not apply");
        return None;
    }
    let path = input.path();
    let values = split_enum_values(input.expression().unwrap_or_default());
    if values.is_empty() {
        ctx.warn(&path, input.kind, "'enum' needs at least one value");
        return None;
    }

    let literals = if ty.is_string() {
        values.iter().map(|v| string_literal(v)).collect::<Vec<_>>()
    } else {
        let mut literals = Vec::with_capacity(values.len());
        for value in &values {
            let Some(literal) = numeric_literal(value, ty) else {
                ctx.warn(
                    &path,
                    input.kind,
                    format!("enum value '{value}' is not a valid {}", ty.dereferenced().describe()),
                );
                return None;
            };
            literals.push(literal);
        }
        literals
    };

    let message = format!("{} must be one of: {}", input.label(), values.join(", "));
    let core = RuleCore::new(input, ctx, message);
    let condition = guard_value(&core.accessor(), ty, &|operand, ty| {
        if ty.is_string() {
            format!("!matches!({operand}.as_str(), {})", literals.join(" | "))
        } else {
            format!("![{}].contains(&{operand})", literals.join(", "))
        }
    });
    Some(Box::new(EnumRule { core, condition }))
}

/// Splits on whitespace; single-quoted values may contain spaces
pub fn split_enum_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in raw.chars() {
        match c {
            '\'' => {
                if quoted {
                    values.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    values.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        values.push(current);
    }
    values
}

#[derive(Debug, Clone)]
pub struct ConditionalRule {
    core: RuleCore,
    condition: String,
}

impl ValidationRule for ConditionalRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }
}

pub fn conditional(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let path = input.path();
    let Some(zero) = zero_check(&path.accessor(), &input.field.ty) else {
        tracing::debug!(kind = input.kind, "conditional presence does not apply");
        return None;
    };
    let raw = input.expression().unwrap_or_default();
    let words = split_enum_values(raw);
    if words.is_empty() {
        ctx.warn(&path, input.kind, format!("'{}' needs a field name", input.kind));
        return None;
    }

    let label = input.label();
    let (trigger, message) = match input.kind {
        "required_if" | "required_unless" => {
            if words.len() % 2 != 0 {
                ctx.warn(
                    &path,
                    input.kind,
                    format!("'{raw}' must be pairs of field name and value"),
                );
                return None;
            }
            let mut checks = Vec::new();
            let mut described = Vec::new();
            for pair in words.chunks(2) {
                let check = sibling_equals(input, &pair[0], &pair[1], ctx)?;
                checks.push(check);
                described.push(format!("{} is {}", pair[0], pair[1]));
            }
            let all = checks.join(" && ");
            if input.kind == "required_if" {
                (
                    format!("({all})"),
                    format!("{label} is required when {}", described.join(" and ")),
                )
            } else {
                (
                    format!("!({all})"),
                    format!("{label} is required unless {}", described.join(" and ")),
                )
            }
        }
        _ => {
            let present = input.kind == "required_with";
            let mut checks = Vec::new();
            for name in &words {
                let sibling_zero = sibling_zero(input, name, ctx)?;
                checks.push(if present {
                    format!("!({sibling_zero})")
                } else {
                    sibling_zero
                });
            }
            let state = if present { "present" } else { "absent" };
            (
                format!("({})", checks.join(" || ")),
                format!("{label} is required when {} is {state}", words.join(" or ")),
            )
        }
    };

    let core = RuleCore::new(input, ctx, message);
    Some(Box::new(ConditionalRule {
        core,
        condition: format!("{trigger} && {zero}"),
    }))
}

fn sibling_zero(input: &RuleInput<'_>, name: &str, ctx: &mut GenerationContext) -> Option<String> {
    let Some(sibling) = input.sibling(name) else {
        ctx.warn(&input.path(), input.kind, format!("no sibling field named '{name}'"));
        return None;
    };
    let check = zero_check(&input.sibling_accessor(name), &sibling.ty);
    if check.is_none() {
        ctx.warn(
            &input.path(),
            input.kind,
            format!("presence of '{name}' ({}) cannot be tested", sibling.ty.describe()),
        );
    }
    check
}

fn sibling_equals(
    input: &RuleInput<'_>,
    name: &str,
    value: &str,
    ctx: &mut GenerationContext,
) -> Option<String> {
    let Some(sibling) = input.sibling(name) else {
        ctx.warn(&input.path(), input.kind, format!("no sibling field named '{name}'"));
        return None;
    };
    let literal = match sibling.ty.dereferenced() {
        TypeKind::String => Some(string_literal(value)),
        TypeKind::Bool => value.parse::<bool>().ok().map(|b| b.to_string()),
        other if sibling.ty.is_numeric() => numeric_literal(value, other),
        _ => None,
    };
    let Some(literal) = literal else {
        ctx.warn(
            &input.path(),
            input.kind,
            format!(
                "'{value}' cannot be compared with '{name}' ({})",
                sibling.ty.describe()
            ),
        );
        return None;
    };
    Some(guard_value(
        &input.sibling_accessor(name),
        &sibling.ty,
        &|operand, _| format!("{operand} == {literal}"),
    ))
}
