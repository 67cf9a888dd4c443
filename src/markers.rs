#![forbid(unsafe_code)]

//! Marker model and annotation extraction
//!
//! Markers are the parsed form of the annotations attached to records and
//! fields, either as doc lines (`/// +maxlength=50`) or as tag tokens
//! (`#[validate("required,max=50")]`).

mod extract;
mod marker;

pub use extract::{
    AMBIGUOUS_KEYWORDS, DIVE, TAG_SYNONYMS, extract_markers, normalize_keyword, parse_doc_line,
    parse_doc_lines, parse_tag, split_tag_tokens,
};
pub use marker::{Marker, MarkerSet};
