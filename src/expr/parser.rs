#![forbid(unsafe_code)]

//! Recursive-descent parser for the expression subset
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, relations and `in`,
//! `+ -`, `* / %`, unary `! -`, then member access and calls.

use super::ast::{BinaryOp, Expr, Literal, MacroKind, UnaryOp};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::ExprError;

/// Parses a complete expression
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, position: 0 };
    let expr = parser.parse_expression()?;
    match parser.current() {
        TokenKind::Eof => Ok(expr),
        other => Err(ExprError::Parse(format!(
            "unexpected trailing token {other:?} at offset {}",
            parser.offset()
        ))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn current(&self) -> &TokenKind {
        self.tokens
            .get(self.position)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.position).map_or(0, |t| t.offset)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.current() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(ExprError::Parse(format!(
                "expected {kind:?}, found {:?} at offset {}",
                self.current(),
                self.offset()
            )))
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ExprError> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then_expr = self.parse_or()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_relation()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_relation()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_relation(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                TokenKind::In => BinaryOp::In,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.current() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_member(),
        };
        self.advance();
        let operand = self.parse_unary()?;

        // Fold `-<number>` so negative literals stay literals
        if op == UnaryOp::Neg {
            match operand {
                Expr::Literal(Literal::Int(n)) => return Ok(Expr::Literal(Literal::Int(-n))),
                Expr::Literal(Literal::Double(n)) => {
                    return Ok(Expr::Literal(Literal::Double(-n)));
                }
                _ => {}
            }
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_member(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                TokenKind::Dot => {
                    self.advance();
                    let TokenKind::Ident(name) = self.current().clone() else {
                        return Err(ExprError::Parse(format!(
                            "expected field or method name after '.' at offset {}",
                            self.offset()
                        )));
                    };
                    self.advance();
                    if self.current() == &TokenKind::LParen {
                        let args = self.parse_args()?;
                        expr = method_call(name, expr, args)?;
                    } else {
                        expr = Expr::Select {
                            operand: Box::new(expr),
                            field: name,
                        };
                    }
                }
                TokenKind::LBracket => {
                    return Err(ExprError::Unsupported(
                        "index access with '[...]'".to_string(),
                    ));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        let token = self.current().clone();
        self.advance();
        match token {
            TokenKind::Int(n) => Ok(Expr::Literal(Literal::Int(n))),
            TokenKind::Uint(n) => Ok(Expr::Literal(Literal::Uint(n))),
            TokenKind::Double(n) => Ok(Expr::Literal(Literal::Double(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::Bytes(b) => Ok(Expr::Literal(Literal::Bytes(b))),
            TokenKind::True => Ok(Expr::Literal(Literal::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Bool(false))),
            TokenKind::Ident(name) => {
                if self.current() == &TokenKind::LParen {
                    let args = self.parse_args()?;
                    Ok(Expr::Call {
                        function: name,
                        target: None,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                let elements = self.parse_sequence(TokenKind::RBracket)?;
                Ok(Expr::List(elements))
            }
            TokenKind::LBrace => Err(ExprError::Unsupported("map literals".to_string())),
            other => Err(ExprError::Parse(format!(
                "unexpected token {other:?} at offset {offset}"
            ))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        self.expect(TokenKind::LParen)?;
        self.parse_sequence(TokenKind::RParen)
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed
    fn parse_sequence(&mut self, close: TokenKind) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        while self.current() != &close {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Builds a receiver call, tagging comprehension macros
fn method_call(name: String, target: Expr, mut args: Vec<Expr>) -> Result<Expr, ExprError> {
    let Some(kind) = MacroKind::from_name(&name) else {
        return Ok(Expr::Call {
            function: name,
            target: Some(Box::new(target)),
            args,
        });
    };

    if args.len() != 2 {
        return Err(ExprError::Parse(format!(
            "macro '{kind}' expects (variable, predicate), got {} argument(s)",
            args.len()
        )));
    }
    let body = args.pop().unwrap_or(Expr::Literal(Literal::Bool(true)));
    let Some(Expr::Ident(var)) = args.pop() else {
        return Err(ExprError::Parse(format!(
            "macro '{kind}' expects an identifier as its first argument"
        )));
    };
    Ok(Expr::Comprehension {
        kind,
        range: Box::new(target),
        var,
        body: Box::new(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse("a || b && c").unwrap();
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3 > 6").unwrap();
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Gt);
        let Expr::Binary { op, right, .. } = *left else {
            panic!("expected sum");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let expr = parse("a ? 1 : b ? 2 : 3").unwrap();
        let Expr::Conditional { else_expr, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*else_expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(parse("-5").unwrap(), Expr::Literal(Literal::Int(-5)));
        assert!(matches!(
            parse("-value").unwrap(),
            Expr::Unary { op: UnaryOp::Neg, .. }
        ));
    }

    #[test]
    fn test_member_and_method_calls() {
        let expr = parse("this.name.startsWith('a')").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                function: "startsWith".to_string(),
                target: Some(Box::new(Expr::Select {
                    operand: ident("this"),
                    field: "name".to_string(),
                })),
                args: vec![Expr::Literal(Literal::String("a".to_string()))],
            }
        );
    }

    #[test]
    fn test_macros_are_tagged() {
        let expr = parse("value.exists_one(x, x > 1)").unwrap();
        let Expr::Comprehension { kind, var, range, .. } = expr else {
            panic!("expected comprehension");
        };
        assert_eq!(kind, MacroKind::ExistsOne);
        assert_eq!(var, "x");
        assert_eq!(range, ident("value"));
    }

    #[test]
    fn test_macro_shape_errors() {
        assert!(matches!(parse("value.all(x)"), Err(ExprError::Parse(_))));
        assert!(matches!(parse("value.all(1, true)"), Err(ExprError::Parse(_))));
    }

    #[test]
    fn test_list_and_membership() {
        let expr = parse("value in ['a', 'b',]").unwrap();
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::In);
        assert!(matches!(*right, Expr::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(parse("a b"), Err(ExprError::Parse(_))));
        assert!(matches!(parse("(a"), Err(ExprError::Parse(_))));
    }

    #[test]
    fn test_indexing_unsupported() {
        assert!(matches!(parse("value[0]"), Err(ExprError::Unsupported(_))));
    }
}
