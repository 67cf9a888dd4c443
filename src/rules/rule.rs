#![forbid(unsafe_code)]

//! The ValidationRule trait and the inputs handed to rule factories

use crate::engine::{EmissionKey, GenerationContext};
use crate::expr::string_literal;
use crate::types::{FieldDescriptor, FieldPath, INDEX_MARKER, TypeKind, to_upper_snake};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;

/// Everything a factory needs to build a rule for one field
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// The field being validated
    pub field: &'a FieldDescriptor,
    /// Marker expressions keyed by identifier
    pub expressions: &'a IndexMap<String, String>,
    /// Record the output is generated for
    pub record: &'a str,
    /// Path of the value that owns `field`
    pub parent: &'a FieldPath,
    /// Rule identifier being instantiated
    pub kind: &'a str,
    /// Fields visible as `this.<name>` and to conditional rules
    pub siblings: &'a [FieldDescriptor],
}

impl RuleInput<'_> {
    pub fn path(&self) -> FieldPath {
        self.parent.join(self.field.name.clone())
    }

    /// Expression stored under this rule's identifier
    pub fn expression(&self) -> Option<&str> {
        self.expressions
            .get(self.kind)
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
    }

    /// Accessor of a sibling field
    pub fn sibling_accessor(&self, name: &str) -> String {
        format!("{}.{}", self.parent.accessor(), name)
    }

    pub fn sibling(&self, name: &str) -> Option<&FieldDescriptor> {
        self.siblings.iter().find(|f| f.name == name)
    }

    /// Human label of the validated field
    pub fn label(&self) -> String {
        field_label(&self.path())
    }
}

/// Builds a rule for a field, or `None` when the rule does not apply
pub type RuleFactory =
    fn(&RuleInput<'_>, &mut GenerationContext) -> Option<Box<dyn ValidationRule>>;

/// State shared by every rule: identity, target and default message
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCore {
    pub kind: String,
    pub record: String,
    pub path: FieldPath,
    pub ty: TypeKind,
    pub message: String,
    err_variable: String,
}

impl RuleCore {
    /// Builds the core and reserves its error identifier in `ctx`
    pub fn new(
        input: &RuleInput<'_>,
        ctx: &mut GenerationContext,
        message: impl Into<String>,
    ) -> Self {
        let path = input.path();
        let preferred = format!(
            "ERR_{}_{}",
            path.identifier_stem(),
            to_upper_snake(input.kind)
        );
        let err_variable =
            ctx.error_identifier(&EmissionKey::new(input.record, &path, input.kind), &preferred);
        Self {
            kind: input.kind.to_string(),
            record: input.record.to_string(),
            ty: input.field.ty.clone(),
            message: message.into(),
            path,
            err_variable,
        }
    }

    pub fn accessor(&self) -> String {
        self.path.accessor()
    }

    /// `ERR_<PATH>_<KIND>`, suffixed when another path already claimed it
    pub fn err_variable(&self) -> &str {
        &self.err_variable
    }

    /// The error constant, or an empty string if it was already emitted
    pub fn declaration(&self, ctx: &mut GenerationContext) -> String {
        let key = EmissionKey::new(&self.record, &self.path, &self.kind);
        if !ctx.mark_emitted(key) {
            return String::new();
        }
        let message = match ctx.message_override(&self.kind) {
            Some(template) => template.replace("{field}", &field_label(&self.path)),
            None => self.message.clone(),
        };
        format!(
            "pub const {}: ValidationError = ValidationError {{\n    field: {},\n    rule: {},\n    message: {},\n}};\n",
            self.err_variable(),
            string_literal(&self.path.to_string()),
            string_literal(&self.kind),
            string_literal(&message),
        )
    }
}

/// A single generated check
///
/// Implementations are built by a [`RuleFactory`] and consumed by the
/// emitter, which asks each rule for its failure condition and its error
/// declaration.
pub trait ValidationRule: fmt::Debug + Send + Sync {
    fn core(&self) -> &RuleCore;

    /// Rust expression that is `true` when the value is invalid
    fn validate(&self) -> String;

    fn kind(&self) -> &str {
        &self.core().kind
    }

    fn field_path(&self) -> &FieldPath {
        &self.core().path
    }

    fn err_variable(&self) -> &str {
        self.core().err_variable()
    }

    /// Declarations for the error value, emitted at most once per context
    fn err(&self, ctx: &mut GenerationContext) -> String {
        self.core().declaration(ctx)
    }

    /// `use` paths required by `validate()` and `err()`
    fn imports(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Human label for a path: its last component without `[i]`
pub fn field_label(path: &FieldPath) -> String {
    path.components()
        .last()
        .map(|c| c.strip_suffix(INDEX_MARKER).unwrap_or(c))
        .map(|c| c.strip_prefix("r#").unwrap_or(c).to_string())
        .unwrap_or_default()
}

/// Applies `check` to the value behind `accessor`, unwrapping options
///
/// An absent optional value passes: the check only runs on `Some`.
pub fn guard_value(accessor: &str, ty: &TypeKind, check: &dyn Fn(&str, &TypeKind) -> String) -> String {
    match ty.resolved() {
        TypeKind::Pointer(inner) => format!(
            "{accessor}.as_ref().is_some_and(|v| {})",
            guard_value("(*v)", inner, check)
        ),
        other => check(accessor, other),
    }
}

/// Expression that is `true` when the value is its type's zero value
///
/// Returns `None` for types with no meaningful zero (records).
pub fn zero_check(accessor: &str, ty: &TypeKind) -> Option<String> {
    match ty.resolved() {
        TypeKind::Pointer(_) => Some(format!("{accessor}.is_none()")),
        TypeKind::String | TypeKind::Collection(_) | TypeKind::Map(_) => {
            Some(format!("{accessor}.is_empty()"))
        }
        TypeKind::Int(_) | TypeKind::Uint(_) => Some(format!("{accessor} == 0")),
        TypeKind::Float => Some(format!("{accessor} == 0.0")),
        TypeKind::Bool => Some(format!("!{accessor}")),
        _ => None,
    }
}

/// Formats `raw` as a Rust literal of the numeric type `ty`
///
/// Returns `None` if `raw` is not a number or does not fit the type (a
/// fractional bound on an integer field, `300` on a `u8`, a negative bound on
/// an unsigned one).
pub fn numeric_literal(raw: &str, ty: &TypeKind) -> Option<String> {
    let raw = raw.trim();
    match ty.dereferenced() {
        TypeKind::Int(_) | TypeKind::Uint(_) => {
            let (min, max) = ty.integer_range()?;
            integer_value(raw)
                .filter(|n| (min..=max).contains(n))
                .map(|n| n.to_string())
        }
        TypeKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| format!("{f:?}")),
        _ => None,
    }
}

fn integer_value(raw: &str) -> Option<i128> {
    if let Ok(n) = raw.parse::<i128>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38).then_some(f as i128)
}
