#![forbid(unsafe_code)]

//! Tokenizer for the expression subset

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Uint(u64),
    Double(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ident(String),
    True,
    False,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Eof,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Tokenizes the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        self.skip_whitespace();
        let offset = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset,
            });
        };

        let kind = match ch {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            ',' => self.single(TokenKind::Comma),
            '.' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.single(TokenKind::Dot)
            }
            '?' => self.single(TokenKind::Question),
            ':' => self.single(TokenKind::Colon),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::NotEq),
            '<' => self.one_or_two('=', TokenKind::Lt, TokenKind::Le),
            '>' => self.one_or_two('=', TokenKind::Gt, TokenKind::Ge),
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::EqEq
                } else {
                    return Err(self.error("expected '==', found '='"));
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    return Err(self.error("expected '&&'"));
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(self.error("expected '||'"));
                }
            }
            '\'' | '"' => TokenKind::Str(self.read_string(ch)?),
            'b' | 'B' if matches!(self.peek(), Some('\'' | '"')) => {
                self.advance();
                let quote = self.current_char().unwrap_or('"');
                TokenKind::Bytes(self.read_string(quote)?.into_bytes())
            }
            c if c.is_ascii_digit() || c == '.' => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            other => return Err(self.error(&format!("unexpected character '{other}'"))),
        };

        Ok(Token { kind, offset })
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let current = self.current_char()?;
        self.input[self.position + current.len_utf8()..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn one_or_two(&mut self, second: char, one: TokenKind, two: TokenKind) -> TokenKind {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            two
        } else {
            one
        }
    }

    fn error(&self, message: &str) -> ExprError {
        ExprError::Lex {
            offset: self.position,
            message: message.to_string(),
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, ExprError> {
        let start = self.position;
        self.advance();
        let mut out = String::new();
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                return Ok(out);
            }
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            let Some(escaped) = self.current_char() else {
                break;
            };
            self.advance();
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
        }
        Err(ExprError::Lex {
            offset: start,
            message: "unterminated string literal".to_string(),
        })
    }

    fn read_number(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.position;

        if self.current_char() == Some('0') && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            let digits_start = self.position;
            while self.current_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.input[digits_start..self.position];
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.error("invalid hexadecimal literal"))?;
            return self.finish_integer(value.to_string(), start);
        }

        let mut is_double = false;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !is_double && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_double = true;
                self.advance();
            } else if matches!(ch, 'e' | 'E') {
                is_double = true;
                self.advance();
                if matches!(self.current_char(), Some('+' | '-')) {
                    self.advance();
                }
            } else {
                break;
            }
        }

        let text = self.input[start..self.position].to_string();
        if is_double {
            return text
                .parse::<f64>()
                .map(TokenKind::Double)
                .map_err(|_| ExprError::Lex {
                    offset: start,
                    message: format!("invalid number '{text}'"),
                });
        }
        self.finish_integer(text, start)
    }

    fn finish_integer(&mut self, digits: String, start: usize) -> Result<TokenKind, ExprError> {
        if matches!(self.current_char(), Some('u' | 'U')) {
            self.advance();
            return digits
                .parse::<u64>()
                .map(TokenKind::Uint)
                .map_err(|_| ExprError::Lex {
                    offset: start,
                    message: format!("unsigned literal '{digits}' out of range"),
                });
        }
        digits
            .parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| ExprError::Lex {
                offset: start,
                message: format!("integer literal '{digits}' out of range"),
            })
    }

    fn read_identifier(&mut self) -> TokenKind {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        match &self.input[start..self.position] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "in" => TokenKind::In,
            ident => TokenKind::Ident(ident.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_and_identifiers() {
        assert_eq!(
            kinds("value >= 18 && !done"),
            vec![
                TokenKind::Ident("value".to_string()),
                TokenKind::Ge,
                TokenKind::Int(18),
                TokenKind::AndAnd,
                TokenKind::Bang,
                TokenKind::Ident("done".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(kinds("18u")[0], TokenKind::Uint(18));
        assert_eq!(kinds("2.5")[0], TokenKind::Double(2.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Double(1000.0));
        assert_eq!(kinds("0x1F")[0], TokenKind::Int(31));
    }

    #[test]
    fn test_string_literals_both_quotes() {
        assert_eq!(kinds("'a\\'b'")[0], TokenKind::Str("a'b".to_string()));
        assert_eq!(kinds("\"x\\ny\"")[0], TokenKind::Str("x\ny".to_string()));
        assert_eq!(kinds("b'ab'")[0], TokenKind::Bytes(b"ab".to_vec()));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("x in [true, false]"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::True,
                TokenKind::Comma,
                TokenKind::False,
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_offset() {
        let err = Lexer::new("a = b").tokenize().unwrap_err();
        assert!(matches!(err, ExprError::Lex { offset: 2, .. }));

        let err = Lexer::new("'open").tokenize().unwrap_err();
        assert!(matches!(err, ExprError::Lex { offset: 0, .. }));
    }
}
