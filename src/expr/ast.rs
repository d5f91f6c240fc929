//! Compiled form of a condition expression.
//!
//! [`crate::model::Variable`]/[`crate::model::RouterRule`] cache the compiled
//! [`Expr`] alongside the source text so repeated evaluation (every pruning
//! pass re-checks every dependency) never re-parses.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The bare sentinel `else` (case-insensitive, trimmed) — always true.
    Else,
    Lit(Value),
    Ident(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    NotEq(Box<Expr>, Box<Expr>),
    In(Box<Expr>, Box<Expr>),
    IsDefined(Box<Expr>),
}
