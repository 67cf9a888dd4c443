#![forbid(unsafe_code)]

//! Core domain types for fieldguard
//!
//! This module defines the fundamental types shared by the marker extractor,
//! the rule registry, the field walker and the emitter.

use crate::markers::MarkerSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix marking a path segment as "one instance per collection element"
pub const INDEX_MARKER: &str = "[i]";

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A validated rule identifier
///
/// Rule IDs must be non-empty, start with a lowercase ASCII letter and contain
/// only lowercase ASCII letters, digits and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new RuleId, validating the input
    ///
    /// Returns None if the input is empty or contains invalid characters
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let mut chars = id.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            _ => return None,
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return None;
        }
        Some(RuleId(id))
    }

    /// Returns the rule ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RuleId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RuleId::new(value.clone()).ok_or_else(|| format!("Invalid rule ID '{value}'"))
    }
}

impl From<RuleId> for String {
    fn from(rule_id: RuleId) -> Self {
        rule_id.0
    }
}

/// A glob pattern for file matching
///
/// This is a simple wrapper around a string that will be used with the `globset` crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobPattern(String);

impl GlobPattern {
    /// Creates a new GlobPattern
    pub fn new(pattern: impl Into<String>) -> Self {
        GlobPattern(pattern.into())
    }

    /// Returns the pattern as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GlobPattern {
    fn from(pattern: &str) -> Self {
        GlobPattern(pattern.to_string())
    }
}

/// Dotted address of a validation target, e.g. `User.addresses[i].city`
///
/// Empty and whitespace-only components are dropped on construction. The
/// first component is the name of the record being generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Creates a path from its components, dropping blank ones
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath(
            components
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.trim().is_empty())
                .collect(),
        )
    }

    /// Returns a new path with `component` appended
    pub fn join(&self, component: impl Into<String>) -> Self {
        let mut components = self.0.clone();
        let component = component.into();
        if !component.trim().is_empty() {
            components.push(component);
        }
        FieldPath(components)
    }

    /// Returns a new path with `component[i]` appended
    pub fn join_indexed(&self, component: &str) -> Self {
        self.join(format!("{component}{INDEX_MARKER}"))
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Name of the record the path is rooted at
    pub fn record(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// True when any segment denotes per-element iteration
    pub fn is_indexed(&self) -> bool {
        self.0.iter().any(|c| c.ends_with(INDEX_MARKER))
    }

    /// Upper snake stem used to derive error identifiers
    ///
    /// `User.addresses[i].city` becomes `USER_ADDRESSES_CITY`.
    pub fn identifier_stem(&self) -> String {
        self.0
            .iter()
            .map(|c| {
                let bare = c.strip_suffix(INDEX_MARKER).unwrap_or(c);
                to_upper_snake(bare.strip_prefix("r#").unwrap_or(bare))
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Rust expression reading the addressed value
    ///
    /// The record root is `self`; each indexed segment is bound by an
    /// enclosing loop as `item0`, `item1`, ... in nesting order.
    pub fn accessor(&self) -> String {
        let mut base = "self".to_string();
        let mut depth = 0;
        for component in self.0.iter().skip(1) {
            if component.ends_with(INDEX_MARKER) {
                base = format!("item{depth}");
                depth += 1;
            } else {
                base = format!("{base}.{component}");
            }
        }
        base
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Converts `camelCase`, `PascalCase` or `snake_case` to `UPPER_SNAKE`
pub fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// Bit width of an integer type
///
/// `Size` is `isize`/`usize`, taken as 64 bits wide when checking ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    W128,
    Size,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 | IntWidth::Size => 64,
            IntWidth::W128 => 128,
        }
    }

    /// Name of the Rust integer type, e.g. `u8` or `isize`
    pub fn rust_name(self, signed: bool) -> String {
        let prefix = if signed { 'i' } else { 'u' };
        match self {
            IntWidth::Size => format!("{prefix}size"),
            other => format!("{prefix}{}", other.bits()),
        }
    }

    /// Smallest and largest value of the type, saturated to `i128`
    pub fn range(self, signed: bool) -> (i128, i128) {
        let bits = self.bits();
        match (signed, bits) {
            (true, 128) => (i128::MIN, i128::MAX),
            (true, _) => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
            (false, 128) => (0, i128::MAX),
            (false, _) => (0, (1i128 << bits) - 1),
        }
    }
}

/// Declared type of a field, as classified by the front end
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    String,
    Int(IntWidth),
    Uint(IntWidth),
    Float,
    Bool,
    /// Sequence or set of elements
    Collection(Box<TypeKind>),
    /// Keyed map; carries the value type
    Map(Box<TypeKind>),
    /// Optional value (`Option<T>`)
    Pointer(Box<TypeKind>),
    /// Named alias of another type (`type Email = String;`)
    Alias { name: String, target: Box<TypeKind> },
    /// Named type, a record when the schema declares it
    Named(String),
    /// Anonymous nested record
    StructLiteral(Vec<FieldDescriptor>),
    Unsupported(String),
}

impl TypeKind {
    /// Strips alias layers
    pub fn resolved(&self) -> &TypeKind {
        match self {
            TypeKind::Alias { target, .. } => target.resolved(),
            other => other,
        }
    }

    /// Strips alias and pointer layers
    pub fn dereferenced(&self) -> &TypeKind {
        match self.resolved() {
            TypeKind::Pointer(inner) => inner.dereferenced(),
            other => other,
        }
    }

    /// True for an `Option<T>` (possibly behind aliases)
    pub fn is_pointer(&self) -> bool {
        matches!(self.resolved(), TypeKind::Pointer(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.dereferenced(), TypeKind::String)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.dereferenced(),
            TypeKind::Int(_) | TypeKind::Uint(_) | TypeKind::Float
        )
    }

    /// Inclusive value range of an integer type, looking through options
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        match self.dereferenced() {
            TypeKind::Int(width) => Some(width.range(true)),
            TypeKind::Uint(width) => Some(width.range(false)),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self.dereferenced(), TypeKind::Float)
    }

    /// True for sequences, sets and maps
    pub fn is_collection(&self) -> bool {
        matches!(
            self.dereferenced(),
            TypeKind::Collection(_) | TypeKind::Map(_)
        )
    }

    /// Name of the record this type refers to, looking through aliases and options
    pub fn record_name(&self) -> Option<&str> {
        match self.dereferenced() {
            TypeKind::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Short human-readable description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TypeKind::String => "string".to_string(),
            TypeKind::Int(width) => width.rust_name(true),
            TypeKind::Uint(width) => width.rust_name(false),
            TypeKind::Float => "float".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Collection(inner) => format!("[]{}", inner.describe()),
            TypeKind::Map(inner) => format!("map[{}]", inner.describe()),
            TypeKind::Pointer(inner) => format!("*{}", inner.describe()),
            TypeKind::Alias { name, .. } => name.clone(),
            TypeKind::Named(name) => name.clone(),
            TypeKind::StructLiteral(_) => "struct{..}".to_string(),
            TypeKind::Unsupported(text) => text.clone(),
        }
    }
}

/// A single field of a record, as supplied by the front end
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name exactly as declared
    pub name: String,
    /// Declared type
    pub ty: TypeKind,
    /// Name of the record declaring the field
    pub record: String,
    /// Markers attached to the field
    pub markers: MarkerSet,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        ty: TypeKind,
        record: impl Into<String>,
        markers: MarkerSet,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            record: record.into(),
            markers,
        }
    }
}

/// A declared record type with its record-level markers
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub name: String,
    pub markers: MarkerSet,
    pub fields: Vec<FieldDescriptor>,
}

/// All records declared in one compilation unit, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    records: IndexMap<String, RecordDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record
    pub fn insert(&mut self, record: RecordDescriptor) {
        self.records.insert(record.name.clone(), record);
    }

    /// Looks up a record by name
    pub fn record(&self, name: &str) -> Option<&RecordDescriptor> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDescriptor> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
