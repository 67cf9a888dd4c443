#![forbid(unsafe_code)]

//! Compiler for the CEL-like expression subset
//!
//! An expression goes through three stages: a textual guard that rejects
//! unsupported extensions, a parser producing an [`ast::Expr`], and a
//! translator producing a Rust boolean expression that is `true` when the
//! value is valid. Comprehension macros (`all`, `exists`, `exists_one`,
//! `filter`, `map`) are tagged by the parser and lowered to iterator chains
//! or loops.

pub mod ast;
mod compiler;
mod guard;
mod lexer;
mod parser;

pub use compiler::{
    CompiledExpr, ExprEnv, ExprType, escape_ident, raw_string_literal, string_literal, translate,
};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;

use crate::error::ExprError;

/// Compiles `source` against `env`
///
/// # Errors
///
/// Returns `ExprError` if the expression uses a rejected feature, does not
/// parse, or uses a construct the translator cannot express.
pub fn compile(source: &str, env: &ExprEnv<'_>) -> Result<CompiledExpr, ExprError> {
    guard::check(source)?;
    let ast = parser::parse(source)?;
    let compiled = compiler::translate(&ast, env)?;
    tracing::trace!(source, code = %compiled.code, "compiled expression");
    Ok(compiled)
}

/// Always-true stand-in for an expression that failed to compile
pub fn placeholder(reason: &str) -> String {
    format!("true /* fieldguard: {} */", reason.replace("*/", "* /"))
}
