#![forbid(unsafe_code)]

//! Renders consolidated rule groups as a Rust module
//!
//! The output for one source file contains a shared `ValidationError` type,
//! one error constant per distinct (record, path, rule) and a `validate`
//! method per record that has at least one applicable rule.

use super::context::GenerationContext;
use super::walker::{RuleGroup, walk_record};
use crate::rules::RuleRegistry;
use crate::types::{RecordDescriptor, Schema};
use std::collections::BTreeSet;
use std::fmt::Write;

const INDENT: &str = "    ";

/// Start of the first line of every generated module
pub const GENERATED_MARKER: &str = "// Code generated by fieldguard from ";

const VALIDATION_ERROR: &str = r#"/// A failed validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the invalid field
    pub field: &'static str,
    /// Identifier of the rule that failed
    pub rule: &'static str,
    pub message: &'static str,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}
"#;

/// Generated text for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutput {
    pub name: String,
    /// Error constants first declared by this record
    pub declarations: String,
    /// The `impl` block with the `validate` method
    pub body: String,
    pub imports: BTreeSet<String>,
    /// Number of guards rendered
    pub checks: usize,
}

/// Renders the `validate` method of one record
///
/// Returns `None` when no rule applies to the record.
pub fn emit_record(
    schema: &Schema,
    registry: &RuleRegistry,
    record: &RecordDescriptor,
    ctx: &mut GenerationContext,
) -> Option<RecordOutput> {
    let groups = walk_record(schema, registry, record, ctx);
    if groups.iter().all(|g| g.rules.is_empty()) {
        tracing::debug!(record = %record.name, "no applicable rules");
        return None;
    }

    let mut output = RecordOutput {
        name: record.name.clone(),
        ..RecordOutput::default()
    };

    let mut body = String::new();
    for group in &groups {
        render_group(group, ctx, &mut output, &mut body);
    }

    let _ = write!(
        output.body,
        "impl {} {{\n{INDENT}pub fn validate(&self) -> Result<(), ValidationError> {{\n{body}{INDENT}{INDENT}Ok(())\n{INDENT}}}\n}}\n",
        record.name
    );
    Some(output)
}

fn render_group(
    group: &RuleGroup,
    ctx: &mut GenerationContext,
    output: &mut RecordOutput,
    body: &mut String,
) {
    if group.rules.is_empty() {
        return;
    }
    let base = 2;
    for (depth, level) in group.loops.iter().enumerate() {
        let indent = INDENT.repeat(base + depth);
        let _ = writeln!(body, "{indent}for item{depth} in {} {{", level.iter);
    }

    let indent = INDENT.repeat(base + group.loops.len());
    for rule in &group.rules {
        output.declarations.push_str(&rule.err(ctx));
        output.imports.extend(rule.imports());
        let _ = writeln!(body, "{indent}if {} {{", rule.validate());
        let _ = writeln!(body, "{indent}{INDENT}return Err({});", rule.err_variable());
        let _ = writeln!(body, "{indent}}}");
        output.checks += 1;
    }

    for depth in (0..group.loops.len()).rev() {
        let _ = writeln!(body, "{}}}", INDENT.repeat(base + depth));
    }
}

/// Renders the generated module for every record of `schema`
///
/// `source` names the input file in the header. Returns `None` when no
/// record has an applicable rule.
pub fn emit_file(
    schema: &Schema,
    registry: &RuleRegistry,
    source: &str,
    ctx: &mut GenerationContext,
) -> Option<String> {
    let records: Vec<RecordOutput> = schema
        .records()
        .filter_map(|record| emit_record(schema, registry, record, ctx))
        .collect();
    if records.is_empty() {
        return None;
    }

    let imports: BTreeSet<&String> = records.iter().flat_map(|r| &r.imports).collect();

    let mut out = String::new();
    let _ = writeln!(out, "{GENERATED_MARKER}{source}. DO NOT EDIT.");
    out.push('\n');
    out.push_str("#![allow(clippy::all, unused_parens, unused_comparisons)]\n\n");
    out.push_str("use super::*;\n");
    for import in imports {
        let _ = writeln!(out, "use {import};");
    }
    out.push('\n');
    out.push_str(VALIDATION_ERROR);

    let declarations: Vec<&str> = records
        .iter()
        .map(|r| r.declarations.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    if !declarations.is_empty() {
        out.push('\n');
        out.push_str(&declarations.join("\n"));
    }

    for record in &records {
        out.push('\n');
        out.push_str(&record.body);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{Marker, MarkerSet};
    use crate::types::{FieldDescriptor, IntWidth, TypeKind};

    fn markers(ids: &[&str]) -> MarkerSet {
        ids.iter()
            .map(|id| match id.split_once('=') {
                Some((id, expr)) => Marker::with_expression(id, expr),
                None => Marker::new(*id),
            })
            .collect()
    }

    fn record(name: &str, fields: Vec<(&str, TypeKind, &[&str])>) -> RecordDescriptor {
        RecordDescriptor {
            name: name.to_string(),
            markers: MarkerSet::new(),
            fields: fields
                .into_iter()
                .map(|(field, ty, ids)| FieldDescriptor::new(field, ty, name, markers(ids)))
                .collect(),
        }
    }

    #[test]
    fn test_required_and_min_age() {
        let mut schema = Schema::new();
        schema.insert(record("User", vec![("age", TypeKind::Int(IntWidth::W32), &["required", "gte=18"])]));
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();

        let out = emit_record(&schema, &registry, schema.record("User").unwrap(), &mut ctx).unwrap();
        assert_eq!(out.checks, 2);
        assert_eq!(
            out.body,
            "impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.age < 18 {
            return Err(ERR_USER_AGE_GTE);
        }
        if self.age == 0 {
            return Err(ERR_USER_AGE_REQUIRED);
        }
        Ok(())
    }
}
"
        );
        assert!(out.declarations.contains("pub const ERR_USER_AGE_REQUIRED: ValidationError"));
        assert!(out.declarations.contains("pub const ERR_USER_AGE_GTE: ValidationError"));
    }

    #[test]
    fn test_indexed_group_rendered_as_loop() {
        let mut schema = Schema::new();
        schema.insert(record(
            "Cart",
            vec![(
                "items",
                TypeKind::Collection(Box::new(TypeKind::Named("Item".into()))),
                &["dive"],
            )],
        ));
        schema.insert(record("Item", vec![("sku", TypeKind::String, &["required"])]));
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();

        let out = emit_record(&schema, &registry, schema.record("Cart").unwrap(), &mut ctx).unwrap();
        assert!(out.body.contains(
            "        for item0 in self.items.iter() {
            if item0.sku.is_empty() {
                return Err(ERR_CART_ITEMS_SKU_REQUIRED);
            }
        }
"
        ));
    }

    #[test]
    fn test_record_without_rules_is_skipped() {
        let mut schema = Schema::new();
        schema.insert(record("Plain", vec![("name", TypeKind::String, &[])]));
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();
        assert!(emit_file(&schema, &registry, "plain.rs", &mut ctx).is_none());
    }

    #[test]
    fn test_file_layout_and_shared_imports() {
        let mut schema = Schema::new();
        schema.insert(record("A", vec![("mail", TypeKind::String, &["email"])]));
        schema.insert(record("B", vec![("mail", TypeKind::String, &["email"])]));
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();

        let out = emit_file(&schema, &registry, "contacts.rs", &mut ctx).unwrap();
        assert!(out.starts_with(
            "// Code generated by fieldguard from contacts.rs. DO NOT EDIT.\n\n#![allow(clippy::all, unused_parens, unused_comparisons)]\n"
        ));
        assert_eq!(out.matches("use regex::Regex;").count(), 1);
        assert_eq!(out.matches("static EMAIL_RE").count(), 1);
        assert!(out.contains("pub struct ValidationError"));
        assert!(out.contains("impl A {"));
        assert!(out.contains("impl B {"));

        let use_super = out.find("use super::*;").unwrap();
        let error_type = out.find("pub struct ValidationError").unwrap();
        let first_const = out.find("pub const ERR_A_MAIL_EMAIL").unwrap();
        let first_impl = out.find("impl A {").unwrap();
        assert!(use_super < error_type && error_type < first_const && first_const < first_impl);
    }

    #[test]
    fn test_repeated_rule_declared_once() {
        let mut schema = Schema::new();
        schema.insert(RecordDescriptor {
            name: "Form".into(),
            markers: markers(&["required"]),
            fields: vec![FieldDescriptor::new(
                "name",
                TypeKind::String,
                "Form",
                markers(&["required"]),
            )],
        });
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();
        let out = emit_file(&schema, &registry, "form.rs", &mut ctx).unwrap();
        assert_eq!(out.matches("pub const ERR_FORM_NAME_REQUIRED").count(), 1);
    }

    #[test]
    fn test_paths_with_the_same_stem_get_distinct_constants() {
        let mut schema = Schema::new();
        schema.insert(record("User", vec![("address_line", TypeKind::String, &["required"])]));
        schema.insert(record("UserAddress", vec![("line", TypeKind::String, &["required"])]));
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();

        let out = emit_file(&schema, &registry, "user.rs", &mut ctx).unwrap();
        assert_eq!(out.matches("pub const ERR_USER_ADDRESS_LINE_REQUIRED:").count(), 1);
        assert_eq!(out.matches("pub const ERR_USER_ADDRESS_LINE_REQUIRED_2:").count(), 1);
        assert!(out.contains("field: \"User.address_line\""));
        assert!(out.contains("field: \"UserAddress.line\""));
        assert!(out.contains(
            "if self.address_line.is_empty() {\n            return Err(ERR_USER_ADDRESS_LINE_REQUIRED);"
        ));
        assert!(out.contains(
            "if self.line.is_empty() {\n            return Err(ERR_USER_ADDRESS_LINE_REQUIRED_2);"
        ));
    }
}
