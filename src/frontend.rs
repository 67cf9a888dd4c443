#![forbid(unsafe_code)]

//! Reads record declarations out of Rust source with tree-sitter
//!
//! Every top-level `struct` with named fields becomes a [`RecordDescriptor`].
//! Markers come from doc lines (`/// +required`) and `#[validate("...")]`
//! attributes placed before the struct or the field. `type X = T;` items in
//! the same file are resolved as aliases when classifying field types.

use crate::error::FrontendError;
use crate::markers::{MarkerSet, extract_markers};
use crate::types::{FieldDescriptor, IntWidth, RecordDescriptor, Schema, TypeKind};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Attribute carrying tag-style markers
pub const TAG_ATTRIBUTE: &str = "validate";

/// Parses Rust source text into a schema
///
/// # Errors
///
/// Returns `FrontendError::Syntax` with the line of the first error node if
/// the source does not parse, and `FrontendError::Language` if the grammar
/// cannot be loaded.
pub fn parse_source(source: &str) -> Result<Schema, FrontendError> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        return Err(FrontendError::Syntax {
            line: node.start_position().row + 1,
            message: if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "unexpected input".to_string()
            },
        });
    }

    let bytes = source.as_bytes();
    let mut cursor = root.walk();
    let items: Vec<Node<'_>> = root.named_children(&mut cursor).collect();

    let aliases: HashMap<&str, Node<'_>> = items
        .iter()
        .filter(|item| item.kind() == "type_item")
        .filter_map(|item| {
            let name = item.child_by_field_name("name")?.utf8_text(bytes).ok()?;
            Some((name, item.child_by_field_name("type")?))
        })
        .collect();
    let classifier = Classifier { bytes, aliases };

    let mut schema = Schema::new();
    for item in items.iter().filter(|item| item.kind() == "struct_item") {
        if let Some(record) = classifier.record(*item) {
            schema.insert(record);
        }
    }
    tracing::debug!(records = schema.len(), "parsed source");
    Ok(schema)
}

/// Reads and parses a source file
///
/// # Errors
///
/// Returns `FrontendError::Io` if the file cannot be read, otherwise as
/// [`parse_source`].
pub fn parse_file(path: &Path) -> Result<Schema, FrontendError> {
    let source = std::fs::read_to_string(path)?;
    parse_source(&source)
}

/// Classifies a standalone Rust type such as `Option<Vec<String>>`
///
/// # Errors
///
/// Returns `FrontendError::Syntax` if `ty` is not a field type.
pub fn parse_type(ty: &str) -> Result<TypeKind, FrontendError> {
    let source = format!("struct Holder {{\n    value: {ty},\n}}\n");
    let schema = parse_source(&source)?;
    schema
        .record("Holder")
        .and_then(|record| record.fields.first())
        .map(|field| field.ty.clone())
        .ok_or_else(|| FrontendError::Syntax {
            line: 1,
            message: format!("'{ty}' is not a field type"),
        })
}

fn parse_tree(source: &str) -> Result<Tree, FrontendError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_rust::language())
        .map_err(|e| FrontendError::Language(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| FrontendError::Language("parser returned no tree".to_string()))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

struct Classifier<'s> {
    bytes: &'s [u8],
    aliases: HashMap<&'s str, Node<'s>>,
}

impl<'s> Classifier<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.bytes).unwrap_or_default()
    }

    fn record(&self, item: Node<'s>) -> Option<RecordDescriptor> {
        let name = self.text(item.child_by_field_name("name")?).to_string();
        if item.child_by_field_name("type_parameters").is_some() {
            tracing::debug!(record = %name, "skipping generic struct");
            return None;
        }
        let Some(body) = item
            .child_by_field_name("body")
            .filter(|body| body.kind() == "field_declaration_list")
        else {
            tracing::debug!(record = %name, "skipping struct without named fields");
            return None;
        };

        let (docs, tags) = self.annotations(item);
        let record_ty = TypeKind::Named(name.clone());
        let markers = extract_markers(docs.iter().copied(), tags.iter().map(String::as_str), &record_ty);

        let mut cursor = body.walk();
        let fields = body
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "field_declaration")
            .filter_map(|field| self.field(field, &name))
            .collect();

        Some(RecordDescriptor {
            name,
            markers,
            fields,
        })
    }

    fn field(&self, node: Node<'s>, record: &str) -> Option<FieldDescriptor> {
        let name = self.text(node.child_by_field_name("name")?);
        let ty = self.classify(node.child_by_field_name("type")?, 0);
        let (docs, tags) = self.annotations(node);
        let markers: MarkerSet =
            extract_markers(docs.iter().copied(), tags.iter().map(String::as_str), &ty);
        Some(FieldDescriptor::new(name, ty, record, markers))
    }

    /// Doc lines and `validate` tags directly preceding `node`, in source order
    fn annotations(&self, node: Node<'s>) -> (Vec<&'s str>, Vec<String>) {
        let mut docs = Vec::new();
        let mut tags = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            match sibling.kind() {
                "line_comment" => {
                    let text = self.text(sibling).trim_end();
                    if text.starts_with("///") && !text.starts_with("////") {
                        docs.push(text);
                    }
                }
                "attribute_item" => {
                    if let Some(tag) = self.tag(sibling) {
                        tags.push(tag);
                    }
                }
                "block_comment" => {}
                _ => break,
            }
            current = sibling.prev_sibling();
        }
        docs.reverse();
        tags.reverse();
        (docs, tags)
    }

    /// Contents of `#[validate("...")]`
    fn tag(&self, item: Node<'s>) -> Option<String> {
        let mut cursor = item.walk();
        let attribute = item
            .named_children(&mut cursor)
            .find(|child| child.kind() == "attribute")?;
        let mut cursor = attribute.walk();
        let mut children = attribute.named_children(&mut cursor);
        let path = children.next()?;
        if self.text(path) != TAG_ATTRIBUTE {
            return None;
        }
        let arguments = attribute.child_by_field_name("arguments")?;
        let literal = find_descendant(arguments, &["string_literal", "raw_string_literal"])?;
        Some(unquote(self.text(literal)))
    }

    fn classify(&self, node: Node<'s>, depth: usize) -> TypeKind {
        let text = self.text(node);
        match node.kind() {
            "primitive_type" => primitive(text),
            "type_identifier" => self.named(text, depth),
            "scoped_type_identifier" => match node.child_by_field_name("name") {
                Some(name) => self.named(self.text(name), depth),
                None => TypeKind::Unsupported(text.to_string()),
            },
            "reference_type" => match node.child_by_field_name("type") {
                Some(inner) => self.classify(inner, depth),
                None => TypeKind::Unsupported(text.to_string()),
            },
            "array_type" => match node.child_by_field_name("element") {
                Some(element) => TypeKind::Collection(Box::new(self.classify(element, depth))),
                None => TypeKind::Unsupported(text.to_string()),
            },
            "generic_type" => self.generic(node, depth),
            _ => TypeKind::Unsupported(text.to_string()),
        }
    }

    fn generic(&self, node: Node<'s>, depth: usize) -> TypeKind {
        let text = self.text(node);
        let Some(base) = node.child_by_field_name("type") else {
            return TypeKind::Unsupported(text.to_string());
        };
        let base = match base.child_by_field_name("name") {
            Some(name) if base.kind() == "scoped_type_identifier" => self.text(name),
            _ => self.text(base),
        };
        let args: Vec<Node<'s>> = match node.child_by_field_name("type_arguments") {
            Some(arguments) => {
                let mut cursor = arguments.walk();
                arguments
                    .named_children(&mut cursor)
                    .filter(|arg| !matches!(arg.kind(), "lifetime" | "type_binding"))
                    .collect()
            }
            None => Vec::new(),
        };
        let arg = |i: usize| match args.get(i) {
            Some(arg) => self.classify(*arg, depth),
            None => TypeKind::Unsupported(text.to_string()),
        };

        match base {
            "Option" => TypeKind::Pointer(Box::new(arg(0))),
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet"
            | "BinaryHeap" => TypeKind::Collection(Box::new(arg(0))),
            "HashMap" | "BTreeMap" | "IndexMap" => TypeKind::Map(Box::new(arg(1))),
            "Box" | "Rc" | "Arc" | "Cow" => arg(0),
            other => TypeKind::Named(other.to_string()),
        }
    }

    fn named(&self, name: &'s str, depth: usize) -> TypeKind {
        if name == "String" {
            return TypeKind::String;
        }
        // Bounded so alias chains that loop back do not recurse forever
        match self.aliases.get(name) {
            Some(target) if depth < 16 => TypeKind::Alias {
                name: name.to_string(),
                target: Box::new(self.classify(*target, depth + 1)),
            },
            Some(_) => TypeKind::Unsupported(name.to_string()),
            None => TypeKind::Named(name.to_string()),
        }
    }
}

fn primitive(name: &str) -> TypeKind {
    match name {
        "str" => TypeKind::String,
        "bool" => TypeKind::Bool,
        "f32" | "f64" => TypeKind::Float,
        other => match integer_width(other) {
            Some((signed, width)) if signed => TypeKind::Int(width),
            Some((_, width)) => TypeKind::Uint(width),
            None => TypeKind::Unsupported(other.to_string()),
        },
    }
}

fn integer_width(name: &str) -> Option<(bool, IntWidth)> {
    let signed = match name.as_bytes().first()? {
        b'i' => true,
        b'u' => false,
        _ => return None,
    };
    let width = match &name[1..] {
        "8" => IntWidth::W8,
        "16" => IntWidth::W16,
        "32" => IntWidth::W32,
        "64" => IntWidth::W64,
        "128" => IntWidth::W128,
        "size" => IntWidth::Size,
        _ => return None,
    };
    Some((signed, width))
}

fn find_descendant<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    if kinds.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_descendant(child, kinds))
}

/// Strips quotes from a string literal and resolves simple escapes
fn unquote(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('r') {
        let hashes = raw.len() - raw.trim_start_matches('#').len();
        let inner = &raw[hashes..raw.len().saturating_sub(hashes)];
        return inner.trim_matches('"').to_string();
    }

    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
