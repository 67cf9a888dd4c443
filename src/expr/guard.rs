#![forbid(unsafe_code)]

//! Pre-parse rejection of features outside the supported subset
//!
//! The guard works on the raw text so that unsupported extensions fail with
//! a precise reason instead of a generic syntax error.

use crate::error::ExprError;
use regex::Regex;
use std::sync::LazyLock;

static STRING_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.\s*(split|lowerAscii|upperAscii|replace|trim|substring|charAt|indexOf|lastIndexOf|join|format|quote|reverse)\s*\(",
    )
    .expect("string method pattern is valid")
});

static MATH_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmath\s*\.").expect("math pattern is valid"));

static OPTIONAL_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\?\.|\.\?|\boptional\s*\.|\.\s*(orValue|hasValue|optMap|optFlatMap)\s*\(")
        .expect("optional pattern is valid")
});

static RANGE_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\.").expect("range pattern is valid"));

static SLICE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*-?\d*\s*:\s*-?\d*\s*\]").expect("slice pattern is valid")
});

static TRY_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?\s*(\)|,|$)").expect("try pattern is valid"));

/// Rejects the expression if it uses a known-unsupported feature
pub fn check(source: &str) -> Result<(), ExprError> {
    if let Some(caps) = STRING_METHOD.captures(source) {
        return Err(rejected(format!("string method '{}'", &caps[1])));
    }
    if MATH_FUNCTION.is_match(source) {
        return Err(rejected("math extension functions".to_string()));
    }
    if OPTIONAL_SYNTAX.is_match(source) {
        return Err(rejected("optional values".to_string()));
    }
    if RANGE_SYNTAX.is_match(source) {
        return Err(rejected("range syntax '..'".to_string()));
    }
    if SLICE_SYNTAX.is_match(source) {
        return Err(rejected("slice notation".to_string()));
    }
    if TRY_SYNTAX.is_match(source) {
        return Err(rejected("error propagation '?'".to_string()));
    }
    Ok(())
}

fn rejected(feature: String) -> ExprError {
    ExprError::Rejected { feature }
}
