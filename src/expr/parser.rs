//! Recursive-descent parser for the condition DSL.
//!
//! ```text
//! expr := or
//! or   := and ("or" and)*
//! and  := not ("and" not)*
//! not  := "not" not | cmp
//! cmp  := primary (("==" | "!=" | "contains" | "in" | "is" ["defined"]) primary)?
//! ```
//! `X in [a, b, c]` is handled structurally: the right-hand side of `in` may
//! be a bracketed list literal instead of a single primary. `X contains Y` is
//! parsed directly as `In(Y, X)` — equivalent to, but simpler than, the
//! reference evaluator's iterative textual rewrite, and it covers chained
//! `contains` for free since each occurrence is parsed independently.

use super::ast::Expr;
use super::lexer::{tokenize, LexError, Token};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("unexpected token {0} at position {1}")]
    Unexpected(Token, usize),
    #[error("unexpected end of expression")]
    Eof,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: &Token) -> Result<(), ParseError> {
        if self.peek() == t {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::Unexpected(self.peek().clone(), self.pos))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_primary()?;
        match self.peek().clone() {
            Token::EqEq => {
                self.advance();
                let rhs = self.parse_primary()?;
                Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
            }
            Token::NotEq => {
                self.advance();
                let rhs = self.parse_primary()?;
                Ok(Expr::NotEq(Box::new(lhs), Box::new(rhs)))
            }
            Token::Contains => {
                self.advance();
                let rhs = self.parse_primary()?;
                // `X contains Y` == `Y in X`
                Ok(Expr::In(Box::new(rhs), Box::new(lhs)))
            }
            Token::In => {
                self.advance();
                let rhs = self.parse_in_rhs()?;
                Ok(Expr::In(Box::new(lhs), Box::new(rhs)))
            }
            Token::Is => {
                self.advance();
                if *self.peek() == Token::Defined {
                    self.advance();
                    Ok(Expr::IsDefined(Box::new(lhs)))
                } else {
                    let rhs = self.parse_primary()?;
                    Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
                }
            }
            _ => Ok(lhs),
        }
    }

    fn parse_in_rhs(&mut self) -> Result<Expr, ParseError> {
        if *self.peek() == Token::LBracket {
            self.advance();
            let mut items = Vec::new();
            if *self.peek() != Token::RBracket {
                items.push(self.parse_primary()?);
                while *self.peek() == Token::Comma {
                    self.advance();
                    items.push(self.parse_primary()?);
                }
            }
            self.expect(&Token::RBracket)?;
            Ok(Expr::List(items))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Token::Num(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Ok(Expr::Lit(Value::Int(n as i64)))
                } else {
                    Ok(Expr::Lit(Value::Float(n)))
                }
            }
            Token::True => Ok(Expr::Lit(Value::Bool(true))),
            Token::False => Ok(Expr::Lit(Value::Bool(false))),
            Token::Null => Ok(Expr::Lit(Value::Null)),
            Token::Eof => Err(ParseError::Eof),
            other => Err(ParseError::Unexpected(other, self.pos)),
        }
    }
}

/// Compile a condition string into an [`Expr`].
///
/// The bare sentinel `"else"` (any case, surrounding whitespace trimmed) is
/// special-cased before tokenizing — it always means "match unconditionally"
/// and never goes through the grammar above.
pub fn compile(source: &str) -> Result<Expr, ParseError> {
    if source.trim().eq_ignore_ascii_case("else") {
        return Ok(Expr::Else);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if *parser.peek() != Token::Eof {
        return Err(ParseError::Unexpected(parser.peek().clone(), parser.pos));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_else_sentinel() {
        assert_eq!(compile("  ElsE ").unwrap(), Expr::Else);
    }

    #[test]
    fn compiles_equality() {
        let e = compile("q1 == True").unwrap();
        assert_eq!(
            e,
            Expr::Eq(
                Box::new(Expr::Ident("q1".into())),
                Box::new(Expr::Lit(Value::Bool(true)))
            )
        );
    }

    #[test]
    fn compiles_in_list_sugar() {
        let e = compile("Role in ['a', 'b']").unwrap();
        assert_eq!(
            e,
            Expr::In(
                Box::new(Expr::Ident("Role".into())),
                Box::new(Expr::List(vec![
                    Expr::Lit(Value::Str("a".into())),
                    Expr::Lit(Value::Str("b".into())),
                ]))
            )
        );
    }

    #[test]
    fn compiles_contains_as_reversed_in() {
        let e = compile("Tags contains 'x'").unwrap();
        assert_eq!(
            e,
            Expr::In(
                Box::new(Expr::Lit(Value::Str("x".into()))),
                Box::new(Expr::Ident("Tags".into()))
            )
        );
    }

    #[test]
    fn compiles_is_defined() {
        let e = compile("Role is defined").unwrap();
        assert_eq!(e, Expr::IsDefined(Box::new(Expr::Ident("Role".into()))));
    }

    #[test]
    fn compiles_and_or_not_precedence() {
        let e = compile("a and not b or c").unwrap();
        // (a and (not b)) or c
        assert_eq!(
            e,
            Expr::Or(
                Box::new(Expr::And(
                    Box::new(Expr::Ident("a".into())),
                    Box::new(Expr::Not(Box::new(Expr::Ident("b".into())))),
                )),
                Box::new(Expr::Ident("c".into())),
            )
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(compile("a == b c").is_err());
    }

    #[test]
    fn rejects_unterminated_paren() {
        assert!(compile("(a == b").is_err());
    }
}
