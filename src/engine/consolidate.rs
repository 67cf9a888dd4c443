#![forbid(unsafe_code)]

//! Merges per-element rule groups so each collection is iterated once

use super::walker::RuleGroup;
use crate::types::FieldPath;
use indexmap::IndexMap;

/// Merges indexed groups that share a parent path
///
/// Non-indexed groups are returned first, in their original order. Indexed
/// groups follow in first-seen order, each holding the rules of every group
/// with the same path in the order they were produced.
pub fn consolidate(groups: Vec<RuleGroup>) -> Vec<RuleGroup> {
    let mut direct = Vec::new();
    let mut indexed: IndexMap<FieldPath, RuleGroup> = IndexMap::new();

    for group in groups {
        if !group.is_indexed() {
            direct.push(group);
            continue;
        }
        match indexed.get_mut(&group.parent) {
            Some(merged) => merged.rules.extend(group.rules),
            None => {
                indexed.insert(group.parent.clone(), group);
            }
        }
    }

    direct.extend(indexed.into_values());
    direct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GenerationContext, LoopLevel, Walker};
    use crate::markers::{Marker, MarkerSet};
    use crate::rules::RuleRegistry;
    use crate::types::{FieldDescriptor, IntWidth, RecordDescriptor, Schema, TypeKind};

    fn field(record: &str, name: &str, ty: TypeKind, ids: &[&str]) -> FieldDescriptor {
        let markers: MarkerSet = ids
            .iter()
            .map(|id| match id.split_once('=') {
                Some((id, expr)) => Marker::with_expression(id, expr),
                None => Marker::new(*id),
            })
            .collect();
        FieldDescriptor::new(name, ty, record, markers)
    }

    fn empty_group(path: &[&str]) -> RuleGroup {
        RuleGroup {
            parent: FieldPath::new(path.iter().copied()),
            loops: Vec::new(),
            rules: Vec::new(),
        }
    }

    #[test]
    fn test_three_element_fields_merge_into_one_loop() {
        let mut schema = Schema::new();
        schema.insert(RecordDescriptor {
            name: "Order".into(),
            markers: MarkerSet::new(),
            fields: vec![field(
                "Order",
                "items",
                TypeKind::Collection(Box::new(TypeKind::Named("Item".into()))),
                &["required", "dive"],
            )],
        });
        schema.insert(RecordDescriptor {
            name: "Item".into(),
            markers: MarkerSet::new(),
            fields: vec![
                field("Item", "sku", TypeKind::String, &["required", "maxlength=12"]),
                field("Item", "qty", TypeKind::Int(IntWidth::W32), &["gt=0", "lte=100"]),
                field("Item", "note", TypeKind::String, &["minlength=2", "maxlength=200"]),
            ],
        });
        let registry = RuleRegistry::with_builtins().unwrap();
        let mut ctx = GenerationContext::new();
        let groups =
            Walker::new(&schema, &registry).walk_record(schema.record("Order").unwrap(), &mut ctx);
        assert_eq!(groups.len(), 4);

        let merged = consolidate(groups);
        assert_eq!(merged.len(), 2);

        assert_eq!(merged[0].parent.to_string(), "Order");
        assert_eq!(merged[0].rules.len(), 1);
        assert_eq!(merged[0].rules[0].kind(), "required");

        assert_eq!(merged[1].parent.to_string(), "Order.items[i]");
        assert_eq!(
            merged[1].loops,
            vec![LoopLevel {
                iter: "self.items.iter()".into()
            }]
        );
        let order: Vec<String> = merged[1]
            .rules
            .iter()
            .map(|r| format!("{}:{}", r.field_path(), r.kind()))
            .collect();
        assert_eq!(
            order,
            vec![
                "Order.items[i].sku:maxlength",
                "Order.items[i].sku:required",
                "Order.items[i].qty:gt",
                "Order.items[i].qty:lte",
                "Order.items[i].note:maxlength",
                "Order.items[i].note:minlength",
            ]
        );
    }

    #[test]
    fn test_non_indexed_order_preserved_and_indexed_appended() {
        let groups = vec![
            empty_group(&["A", "x[i]"]),
            empty_group(&["A"]),
            empty_group(&["A", "y[i]"]),
            empty_group(&["A", "nested"]),
            empty_group(&["A", "x[i]"]),
        ];
        let merged = consolidate(groups);
        let paths: Vec<String> = merged.iter().map(|g| g.parent.to_string()).collect();
        assert_eq!(paths, vec!["A", "A.nested", "A.x[i]", "A.y[i]"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(consolidate(Vec::new()).is_empty());
    }
}
