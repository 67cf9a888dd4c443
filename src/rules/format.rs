#![forbid(unsafe_code)]

//! String format and pattern rules

use super::rule::{RuleCore, RuleInput, ValidationRule, guard_value};
use crate::engine::GenerationContext;
use crate::expr::raw_string_literal;
use std::collections::BTreeSet;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$";
const URL_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+[^\s]*$";
const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// A regex static shared by every rule of one kind in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SharedRegex {
    name: &'static str,
    pattern: &'static str,
}

fn regex_static(name: &str, pattern: &str) -> String {
    format!(
        "static {name}: LazyLock<Regex> =\n    LazyLock::new(|| Regex::new({}).expect(\"valid regular expression\"));\n",
        raw_string_literal(pattern)
    )
}

fn regex_imports() -> BTreeSet<String> {
    ["regex::Regex", "std::sync::LazyLock"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct FormatRule {
    core: RuleCore,
    condition: String,
    shared: Option<SharedRegex>,
}

impl ValidationRule for FormatRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }

    fn err(&self, ctx: &mut GenerationContext) -> String {
        let declaration = self.core.declaration(ctx);
        if declaration.is_empty() {
            return declaration;
        }
        match self.shared {
            Some(shared) if ctx.declare_once(shared.name) => {
                format!("{}{declaration}", regex_static(shared.name, shared.pattern))
            }
            _ => declaration,
        }
    }

    fn imports(&self) -> BTreeSet<String> {
        if self.shared.is_some() {
            regex_imports()
        } else {
            BTreeSet::new()
        }
    }
}

/// Factory for email, url, uuid, alpha, alphanumeric, ipv4 and ipv6
pub fn string_format(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let ty = &input.field.ty;
    if !ty.is_string() {
        tracing::debug!(kind = input.kind, ty = %ty.describe(), "format rule does not apply");
        return None;
    }
    let label = input.label();
    let (shared, description) = match input.kind {
        "email" => (
            Some(SharedRegex {
                name: "EMAIL_RE",
                pattern: EMAIL_PATTERN,
            }),
            "a valid email address",
        ),
        "url" => (
            Some(SharedRegex {
                name: "URL_RE",
                pattern: URL_PATTERN,
            }),
            "a valid URL",
        ),
        "uuid" => (
            Some(SharedRegex {
                name: "UUID_RE",
                pattern: UUID_PATTERN,
            }),
            "a valid UUID",
        ),
        "alpha" => (None, "letters only"),
        "alphanumeric" => (None, "letters and digits only"),
        "ipv4" => (None, "a valid IPv4 address"),
        "ipv6" => (None, "a valid IPv6 address"),
        other => {
            tracing::debug!(kind = other, "unknown format");
            return None;
        }
    };

    let kind = input.kind;
    let core = RuleCore::new(input, ctx, format!("{label} must be {description}"));
    let condition = guard_value(&core.accessor(), ty, &|operand, _| match (kind, shared) {
        (_, Some(shared)) => format!("!{}.is_match(&{operand})", shared.name),
        ("alpha", _) => format!("!{operand}.chars().all(char::is_alphabetic)"),
        ("alphanumeric", _) => format!("!{operand}.chars().all(char::is_alphanumeric)"),
        ("ipv4", _) => format!("{operand}.parse::<std::net::Ipv4Addr>().is_err()"),
        _ => format!("{operand}.parse::<std::net::Ipv6Addr>().is_err()"),
    });
    Some(Box::new(FormatRule {
        core,
        condition,
        shared,
    }))
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    core: RuleCore,
    pattern: String,
    static_name: String,
    condition: String,
}

impl ValidationRule for PatternRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }

    fn err(&self, ctx: &mut GenerationContext) -> String {
        let declaration = self.core.declaration(ctx);
        if declaration.is_empty() {
            return declaration;
        }
        format!("{}{declaration}", regex_static(&self.static_name, &self.pattern))
    }

    fn imports(&self) -> BTreeSet<String> {
        regex_imports()
    }
}

pub fn pattern(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let ty = &input.field.ty;
    if !ty.is_string() {
        tracing::debug!(ty = %ty.describe(), "pattern does not apply");
        return None;
    }
    let path = input.path();
    let Some(pattern) = input.expression() else {
        ctx.warn(&path, input.kind, "'pattern' needs a regular expression");
        return None;
    };
    if let Err(e) = regex::Regex::new(pattern) {
        ctx.warn(&path, input.kind, format!("invalid regular expression '{pattern}': {e}"));
        return None;
    }

    let core = RuleCore::new(
        input,
        ctx,
        format!("{} must match the pattern {pattern}", input.label()),
    );
    let static_name = format!("{}_RE", core.err_variable().trim_start_matches("ERR_"));
    let condition = guard_value(&core.accessor(), ty, &|operand, _| {
        format!("!{static_name}.is_match(&{operand})")
    });
    Some(Box::new(PatternRule {
        core,
        pattern: pattern.to_string(),
        static_name,
        condition,
    }))
}
