#![forbid(unsafe_code)]

//! Marker extraction and tag normalization
//!
//! Doc markers use the rule identifier verbatim. Tag tokens go through the
//! synonym table, and the ambiguous `min`/`max` keywords are resolved
//! against the field's declared type.

use super::marker::{Marker, MarkerSet};
use crate::types::TypeKind;

/// Marker directing the walker into collection elements or nested records
pub const DIVE: &str = "dive";

/// Tag keyword -> rule identifier
pub const TAG_SYNONYMS: &[(&str, &str)] = &[
    ("required", "required"),
    ("len", "length"),
    ("length", "length"),
    ("minlen", "minlength"),
    ("minlength", "minlength"),
    ("maxlen", "maxlength"),
    ("maxlength", "maxlength"),
    ("minitems", "minitems"),
    ("maxitems", "maxitems"),
    ("gt", "gt"),
    ("gte", "gte"),
    ("lt", "lt"),
    ("lte", "lte"),
    ("oneof", "enum"),
    ("enum", "enum"),
    ("email", "email"),
    ("url", "url"),
    ("uri", "url"),
    ("uuid", "uuid"),
    ("alpha", "alpha"),
    ("alphanum", "alphanumeric"),
    ("alphanumeric", "alphanumeric"),
    ("ip4", "ipv4"),
    ("ipv4", "ipv4"),
    ("ip6", "ipv6"),
    ("ipv6", "ipv6"),
    ("regex", "pattern"),
    ("regexp", "pattern"),
    ("pattern", "pattern"),
    ("required_if", "required_if"),
    ("required_unless", "required_unless"),
    ("required_with", "required_with"),
    ("required_without", "required_without"),
    ("cel", "cel"),
    ("expr", "cel"),
    ("dive", DIVE),
];

/// Keywords whose rule depends on the field type
pub const AMBIGUOUS_KEYWORDS: &[&str] = &["min", "max"];

/// Parses one doc line of the form `+rule[=expression]`
///
/// Leading comment syntax (`///`, `//!`, `//`, `*`) and whitespace are
/// ignored. Lines that do not start with `+` or whose identifier is not a
/// plain lowercase word yield `None`.
pub fn parse_doc_line(line: &str) -> Option<Marker> {
    let text = line
        .trim()
        .trim_start_matches("///")
        .trim_start_matches("//!")
        .trim_start_matches("//")
        .trim_start_matches('*')
        .trim();
    let body = text.strip_prefix('+')?;

    let (identifier, expression) = match body.split_once('=') {
        Some((identifier, expression)) => (identifier.trim_end(), Some(expression)),
        None => (body.trim_end(), None),
    };
    if !is_marker_identifier(identifier) {
        return None;
    }

    Some(match expression {
        Some(expression) => Marker::with_expression(identifier, expression),
        None => Marker::new(identifier),
    })
}

/// Parses every doc line, keeping insertion order
pub fn parse_doc_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> MarkerSet {
    lines.into_iter().filter_map(parse_doc_line).collect()
}

/// Parses a structured tag string of comma-separated `keyword[=expr]` tokens
///
/// Unknown keywords are skipped.
pub fn parse_tag(tag: &str, ty: &TypeKind) -> MarkerSet {
    let mut set = MarkerSet::new();
    for token in split_tag_tokens(tag) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (keyword, expression) = match token.split_once('=') {
            Some((keyword, expression)) => (keyword.trim(), Some(expression)),
            None => (token, None),
        };
        let Some(identifier) = normalize_keyword(keyword, ty) else {
            tracing::debug!(keyword, "ignoring unrecognized tag keyword");
            continue;
        };
        set.insert(match expression {
            Some(expression) => Marker::with_expression(identifier, expression),
            None => Marker::new(identifier),
        });
    }
    set
}

/// Maps a tag keyword to a rule identifier
///
/// Returns `None` for unrecognized keywords.
pub fn normalize_keyword(keyword: &str, ty: &TypeKind) -> Option<&'static str> {
    let keyword = keyword.to_ascii_lowercase();
    if AMBIGUOUS_KEYWORDS.contains(&keyword.as_str()) {
        return Some(resolve_bound(&keyword, ty));
    }
    TAG_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == keyword)
        .map(|(_, identifier)| *identifier)
}

fn resolve_bound(keyword: &str, ty: &TypeKind) -> &'static str {
    let lower = keyword == "min";
    let ty = ty.dereferenced();
    if ty.is_string() {
        if lower { "minlength" } else { "maxlength" }
    } else if ty.is_collection() {
        if lower { "minitems" } else { "maxitems" }
    } else if ty.is_numeric() {
        if lower { "gte" } else { "lte" }
    } else if lower {
        "minlength"
    } else {
        "maxlength"
    }
}

/// Splits a tag on commas that are not nested in parentheses, brackets or quotes
///
/// Expressions such as `cel=contains(value, 'a,b')` stay in one token.
pub fn split_tag_tokens(tag: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;

    for (idx, c) in tag.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&tag[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    tokens.push(&tag[start..]);
    tokens
}

/// Combines doc lines and tag strings attached to one declaration
///
/// Doc markers are inserted first, tag markers after them, so a tag token
/// overrides a doc line with the same identifier.
pub fn extract_markers<'a>(
    doc_lines: impl IntoIterator<Item = &'a str>,
    tags: impl IntoIterator<Item = &'a str>,
    ty: &TypeKind,
) -> MarkerSet {
    let mut set = parse_doc_lines(doc_lines);
    for tag in tags {
        set.extend(&parse_tag(tag, ty));
    }
    set
}

fn is_marker_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntWidth;

    fn string() -> TypeKind {
        TypeKind::String
    }

    fn strings() -> TypeKind {
        TypeKind::Collection(Box::new(TypeKind::String))
    }

    #[test]
    fn test_doc_line_without_expression() {
        let marker = parse_doc_line("/// +required").unwrap();
        assert_eq!(marker.identifier(), "required");
        assert!(marker.expressions().is_empty());
    }

    #[test]
    fn test_doc_line_splits_on_first_equals_only() {
        let marker = parse_doc_line("+cel=value == this.confirm").unwrap();
        assert_eq!(marker.identifier(), "cel");
        assert_eq!(marker.expression(), Some("value == this.confirm"));
    }

    #[test]
    fn test_doc_line_ignores_prose() {
        assert!(parse_doc_line("/// The user's age").is_none());
        assert!(parse_doc_line("/// + spaced").is_none());
        assert!(parse_doc_line("/// +1 for this").is_none());
        assert!(parse_doc_line("").is_none());
    }

    #[test]
    fn test_tag_max_on_string_is_maxlength() {
        let set = parse_tag("max=5", &string());
        let marker = set.get("maxlength").unwrap();
        assert_eq!(marker.expression(), Some("5"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_tag_max_on_collection_is_maxitems() {
        let set = parse_tag("max=5", &strings());
        assert_eq!(set.get("maxitems").and_then(Marker::expression), Some("5"));
    }

    #[test]
    fn test_tag_min_on_numeric_is_gte() {
        let set = parse_tag("required,min=18", &TypeKind::Int(IntWidth::W32));
        let ids: Vec<&str> = set.iter().map(Marker::identifier).collect();
        assert_eq!(ids, vec!["required", "gte"]);
        assert_eq!(set.get("gte").and_then(Marker::expression), Some("18"));
    }

    #[test]
    fn test_tag_min_looks_through_option() {
        let ty = TypeKind::Pointer(Box::new(TypeKind::String));
        assert!(parse_tag("min=2", &ty).contains("minlength"));
    }

    #[test]
    fn test_tag_min_defaults_to_length() {
        assert!(parse_tag("min=1", &TypeKind::Bool).contains("minlength"));
    }

    #[test]
    fn test_unknown_keywords_are_ignored() {
        let set = parse_tag("required,omitempty,frobnicate=3", &string());
        assert_eq!(set.len(), 1);
        assert!(set.contains("required"));
    }

    #[test]
    fn test_synonyms_are_case_insensitive() {
        let set = parse_tag("Required,OneOf=a b,REGEXP=^x", &string());
        assert!(set.contains("required"));
        assert_eq!(set.get("enum").and_then(Marker::expression), Some("a b"));
        assert_eq!(set.get("pattern").and_then(Marker::expression), Some("^x"));
    }

    #[test]
    fn test_split_respects_nesting_and_quotes() {
        let tokens = split_tag_tokens("required,cel=contains(value, 'a,b'),max=3");
        assert_eq!(
            tokens,
            vec!["required", "cel=contains(value, 'a,b')", "max=3"]
        );
    }

    #[test]
    fn test_extract_markers_tag_overrides_doc() {
        let set = extract_markers(
            ["/// +maxlength=100", "/// +required"],
            ["max=10"],
            &string(),
        );
        assert_eq!(set.get("maxlength").and_then(Marker::expression), Some("10"));
        assert!(set.contains("required"));
    }
}
