#![forbid(unsafe_code)]

//! Field tree walker
//!
//! Turns a record's fields and their markers into groups of rule instances.
//! Each group carries the path of the value its rules are evaluated against
//! and the loops needed to reach that value. Nested records are walked
//! depth-first: inline (struct literal) fields always, named records when the
//! field carries a `dive` marker.

use super::context::GenerationContext;
use crate::markers::{DIVE, MarkerSet};
use crate::rules::{RuleInput, RuleRegistry, ValidationRule};
use crate::types::{FieldDescriptor, FieldPath, RecordDescriptor, Schema, TypeKind};

/// One level of per-element iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLevel {
    /// Iterator expression, e.g. `self.addresses.iter()`
    pub iter: String,
}

/// Rules sharing a parent path and loop nesting
#[derive(Debug)]
pub struct RuleGroup {
    pub parent: FieldPath,
    pub loops: Vec<LoopLevel>,
    pub rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleGroup {
    pub fn is_indexed(&self) -> bool {
        self.parent.is_indexed()
    }
}

/// Walks records of a schema, resolving markers through a registry
pub struct Walker<'a> {
    schema: &'a Schema,
    registry: &'a RuleRegistry,
    /// Named records on the current recursion path
    visiting: Vec<String>,
}

/// Where a walk is positioned: path, loops and output record
struct Scope<'s> {
    parent: FieldPath,
    loops: Vec<LoopLevel>,
    record: &'s str,
}

impl<'a> Walker<'a> {
    pub fn new(schema: &'a Schema, registry: &'a RuleRegistry) -> Self {
        Self {
            schema,
            registry,
            visiting: Vec::new(),
        }
    }

    /// Groups for every field reachable from `record`, in traversal order
    pub fn walk_record(
        &mut self,
        record: &RecordDescriptor,
        ctx: &mut GenerationContext,
    ) -> Vec<RuleGroup> {
        let scope = Scope {
            parent: FieldPath::new([record.name.as_str()]),
            loops: Vec::new(),
            record: &record.name,
        };
        let mut groups = Vec::new();
        self.visiting.push(record.name.clone());
        self.walk(&record.markers, &record.fields, &scope, ctx, &mut groups);
        self.visiting.pop();
        groups
    }

    fn walk(
        &mut self,
        record_markers: &MarkerSet,
        fields: &[FieldDescriptor],
        scope: &Scope<'_>,
        ctx: &mut GenerationContext,
        groups: &mut Vec<RuleGroup>,
    ) {
        for field in fields {
            let mut markers = record_markers.clone();
            markers.extend(&field.markers);

            if markers.remove(DIVE).is_some() {
                self.push_direct(field, &markers, fields, scope, ctx, groups);
                self.dive(field, scope, ctx, groups);
                continue;
            }

            if let TypeKind::StructLiteral(inner) = field.ty.resolved() {
                self.walk_inline(field, inner, &markers, scope, ctx, groups);
                continue;
            }

            self.push_direct(field, &markers, fields, scope, ctx, groups);
        }
    }

    /// Rules of `field` evaluated against the field itself
    fn push_direct(
        &self,
        field: &FieldDescriptor,
        markers: &MarkerSet,
        siblings: &[FieldDescriptor],
        scope: &Scope<'_>,
        ctx: &mut GenerationContext,
        groups: &mut Vec<RuleGroup>,
    ) {
        let rules = self.resolve(field, markers, siblings, scope, ctx);
        if rules.is_empty() {
            return;
        }
        groups.push(RuleGroup {
            parent: scope.parent.clone(),
            loops: scope.loops.clone(),
            rules,
        });
    }

    /// An anonymous nested record: the outer markers apply to each inner
    /// field, then the inner fields are walked with their own markers
    fn walk_inline(
        &mut self,
        field: &FieldDescriptor,
        inner: &[FieldDescriptor],
        outer: &MarkerSet,
        scope: &Scope<'_>,
        ctx: &mut GenerationContext,
        groups: &mut Vec<RuleGroup>,
    ) {
        let nested = Scope {
            parent: scope.parent.join(field.name.clone()),
            loops: scope.loops.clone(),
            record: scope.record,
        };

        let mut rules = Vec::new();
        for inner_field in inner {
            // Markers the inner field declares itself are applied by the recursion
            let inherited: MarkerSet = outer
                .iter()
                .filter(|m| !inner_field.markers.contains(m.identifier()))
                .cloned()
                .collect();
            rules.extend(self.resolve(inner_field, &inherited, inner, &nested, ctx));
        }
        if !rules.is_empty() {
            groups.push(RuleGroup {
                parent: nested.parent.clone(),
                loops: nested.loops.clone(),
                rules,
            });
        }

        self.walk(&MarkerSet::new(), inner, &nested, ctx, groups);
    }

    fn dive(
        &mut self,
        field: &FieldDescriptor,
        scope: &Scope<'_>,
        ctx: &mut GenerationContext,
        groups: &mut Vec<RuleGroup>,
    ) {
        let schema = self.schema;
        let field_path = scope.parent.join(field.name.clone());

        if let Some((iter, element)) = element_iter(&field_path.accessor(), &field.ty) {
            match element.dereferenced() {
                TypeKind::StructLiteral(inner) => {
                    let mut loops = scope.loops.clone();
                    loops.push(LoopLevel { iter });
                    let nested = Scope {
                        parent: scope.parent.join_indexed(&field.name),
                        loops,
                        record: scope.record,
                    };
                    self.walk(&MarkerSet::new(), inner, &nested, ctx, groups);
                }
                other => match other.record_name().and_then(|name| schema.record(name)) {
                    Some(record) => {
                        let mut loops = scope.loops.clone();
                        loops.push(LoopLevel { iter });
                        let nested = Scope {
                            parent: scope.parent.join_indexed(&field.name),
                            loops,
                            record: scope.record,
                        };
                        self.walk_named(record, &nested, &field_path, ctx, groups);
                    }
                    None => ctx.info(
                        &field_path,
                        DIVE,
                        format!("elements of type '{}' have no fields to check", element.describe()),
                    ),
                },
            }
            return;
        }

        match field.ty.resolved() {
            TypeKind::StructLiteral(inner) => {
                let nested = Scope {
                    parent: field_path.clone(),
                    loops: scope.loops.clone(),
                    record: scope.record,
                };
                self.walk(&MarkerSet::new(), inner, &nested, ctx, groups);
            }
            ty => match ty.record_name().and_then(|name| schema.record(name)) {
                Some(record) => {
                    let nested = Scope {
                        parent: field_path.clone(),
                        loops: scope.loops.clone(),
                        record: scope.record,
                    };
                    self.walk_named(record, &nested, &field_path, ctx, groups);
                }
                None => ctx.info(
                    &field_path,
                    DIVE,
                    format!("type '{}' has no fields to check", field.ty.describe()),
                ),
            },
        }
    }

    /// Recurses into a named record unless it is already being walked
    fn walk_named(
        &mut self,
        record: &RecordDescriptor,
        scope: &Scope<'_>,
        field_path: &FieldPath,
        ctx: &mut GenerationContext,
        groups: &mut Vec<RuleGroup>,
    ) {
        if self.visiting.iter().any(|name| *name == record.name) {
            ctx.warn(
                field_path,
                DIVE,
                format!(
                    "recursive type '{}' is not expanded: {} -> {}",
                    record.name,
                    self.visiting.join(" -> "),
                    record.name
                ),
            );
            return;
        }
        self.visiting.push(record.name.clone());
        self.walk(&record.markers, &record.fields, scope, ctx, groups);
        self.visiting.pop();
    }

    /// Instantiates the applicable rules for `field`, in identifier order
    fn resolve(
        &self,
        field: &FieldDescriptor,
        markers: &MarkerSet,
        siblings: &[FieldDescriptor],
        scope: &Scope<'_>,
        ctx: &mut GenerationContext,
    ) -> Vec<Box<dyn ValidationRule>> {
        let mut rules = Vec::new();
        for marker in markers.sorted() {
            let factory = match self.registry.lookup(marker.identifier()) {
                Ok(factory) => factory,
                Err(e) => {
                    tracing::debug!(field = %field.name, "skipping marker: {e}");
                    continue;
                }
            };
            let input = RuleInput {
                field,
                expressions: marker.expressions(),
                record: scope.record,
                parent: &scope.parent,
                kind: marker.identifier(),
                siblings,
            };
            match factory(&input, ctx) {
                Some(rule) => rules.push(rule),
                None => tracing::debug!(
                    path = %input.path(),
                    rule = marker.identifier(),
                    ty = %field.ty.describe(),
                    "rule not applicable"
                ),
            }
        }
        rules
    }
}

/// Iterator over the elements of a collection-like value and the element type
///
/// `Option<T>` counts as zero or one element. Optional elements are skipped
/// when absent.
fn element_iter<'t>(source: &str, ty: &'t TypeKind) -> Option<(String, &'t TypeKind)> {
    let (mut iter, mut element) = match ty.resolved() {
        TypeKind::Collection(element) => (format!("{source}.iter()"), element.as_ref()),
        TypeKind::Map(element) => (format!("{source}.values()"), element.as_ref()),
        TypeKind::Pointer(inner) => match element_iter("c", inner) {
            Some((inner_iter, element)) => {
                return Some((format!("{source}.iter().flat_map(|c| {inner_iter})"), element));
            }
            None => (format!("{source}.iter()"), inner.as_ref()),
        },
        _ => return None,
    };
    while let TypeKind::Pointer(inner) = element.resolved() {
        iter.push_str(".flatten()");
        element = inner;
    }
    Some((iter, element))
}

/// Walks `record` and consolidates its groups
pub fn walk_record(
    schema: &Schema,
    registry: &RuleRegistry,
    record: &RecordDescriptor,
    ctx: &mut GenerationContext,
) -> Vec<RuleGroup> {
    let groups = Walker::new(schema, registry).walk_record(record, ctx);
    super::consolidate(groups)
}
