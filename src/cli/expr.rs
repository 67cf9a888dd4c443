//! Expr command implementation
//!
//! Compiles a single expression against a value of the given Rust type and
//! prints the resulting guard, with the imports it needs.

use crate::cli::common::{EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
use crate::error::{ExprError, FrontendError};
use crate::expr::{self, CompiledExpr, ExprEnv};
use crate::frontend;

/// Error type specific to expr command
#[derive(Debug, thiserror::Error)]
enum ExprCommandError {
    #[error("Invalid type: {0}")]
    Type(#[from] FrontendError),

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),
}

/// Run the expr command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Expression uses an unsupported feature or construct
/// - 3: Type or expression does not parse
pub fn run_expr(expression: &str, value_type: &str) -> i32 {
    match compile_expr(expression, value_type) {
        Ok(compiled) => {
            print!("{}", render(&compiled));
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                ExprCommandError::Type(_)
                | ExprCommandError::Expr(ExprError::Lex { .. } | ExprError::Parse(_)) => {
                    EXIT_PARSE_ERROR
                }
                ExprCommandError::Expr(_) => EXIT_ERROR,
            }
        }
    }
}

fn compile_expr(expression: &str, value_type: &str) -> Result<CompiledExpr, ExprCommandError> {
    let ty = frontend::parse_type(value_type)?;
    let env = ExprEnv::new("value", ty);
    Ok(expr::compile(expression, &env)?)
}

fn render(compiled: &CompiledExpr) -> String {
    let mut output = String::new();
    for import in &compiled.imports {
        output.push_str(&format!("use {import};\n"));
    }
    if !compiled.imports.is_empty() {
        output.push('\n');
    }
    output.push_str(&compiled.code);
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_expr_uses_declared_type() {
        let compiled = compile_expr("value >= 18", "i32").unwrap();
        assert_eq!(render(&compiled), "(value >= 18)\n");
    }

    #[test]
    fn test_invalid_type() {
        let err = compile_expr("value > 1", "Vec<").unwrap_err();
        assert!(matches!(err, ExprCommandError::Type(_)));
    }

    #[test]
    fn test_rejected_expression() {
        let err = compile_expr("value.split(',').size() > 2", "String").unwrap_err();
        assert!(matches!(err, ExprCommandError::Expr(ExprError::Rejected { .. })));
    }
}
