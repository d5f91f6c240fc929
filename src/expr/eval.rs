//! Interpreter for the condition DSL.
//!
//! The environment is a flat `name -> Value` map built by merging derived
//! parameters with raw answers (answers take precedence — same order the
//! reference evaluator builds its `{**params, **answers}` dict), all keys
//! normalized the same way identifiers are at parse time. An identifier
//! missing from the environment binds to [`Value::Null`] rather than erroring,
//! and a comparison between mismatched types is `false` rather than a fault —
//! both mirror `simpleeval`'s permissive behaviour on this data.

use std::collections::HashMap;

use super::ast::Expr;
use super::lexer::normalize_name;
use crate::value::Value;

/// Name-normalized read-only view over the variables an expression may reference.
pub struct Env<'a> {
    vars: HashMap<String, &'a Value>,
}

impl<'a> Env<'a> {
    /// Build an environment from parameters overlaid with answers; answers win
    /// on key collision.
    pub fn new(params: &'a HashMap<String, Value>, answers: &'a HashMap<String, Value>) -> Self {
        let mut vars = HashMap::with_capacity(params.len() + answers.len());
        for (k, v) in params {
            vars.insert(normalize_name(k), v);
        }
        for (k, v) in answers {
            vars.insert(normalize_name(k), v);
        }
        Env { vars }
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).copied()
    }

    fn contains(&self, name: &str) -> bool {
        self.vars.get(name).is_some_and(|v| !v.is_null())
    }
}

/// Evaluate a compiled expression against an environment.
///
/// Never fails: unknown identifiers are null, type-mismatched comparisons are
/// false. This lets pruning and routing sweep every rule in a module without
/// special-casing rules that reference not-yet-answered questions.
pub fn evaluate(expr: &Expr, env: &Env) -> bool {
    truthy(&eval_value(expr, env))
}

fn eval_value(expr: &Expr, env: &Env) -> Value {
    match expr {
        Expr::Else => Value::Bool(true),
        Expr::Lit(v) => v.clone(),
        Expr::Ident(name) => env.get(name).cloned().unwrap_or(Value::Null),
        Expr::List(items) => Value::List(items.iter().map(|i| eval_value(i, env)).collect()),
        Expr::Not(inner) => Value::Bool(!truthy(&eval_value(inner, env))),
        Expr::And(lhs, rhs) => {
            let l = eval_value(lhs, env);
            if !truthy(&l) {
                l
            } else {
                eval_value(rhs, env)
            }
        }
        Expr::Or(lhs, rhs) => {
            let l = eval_value(lhs, env);
            if truthy(&l) {
                l
            } else {
                eval_value(rhs, env)
            }
        }
        Expr::Eq(lhs, rhs) => Value::Bool(values_equal(&eval_value(lhs, env), &eval_value(rhs, env))),
        Expr::NotEq(lhs, rhs) => {
            Value::Bool(!values_equal(&eval_value(lhs, env), &eval_value(rhs, env)))
        }
        Expr::In(needle, haystack) => {
            let needle = eval_value(needle, env);
            let haystack = eval_value(haystack, env);
            Value::Bool(haystack.contains_value(&needle))
        }
        Expr::IsDefined(inner) => match inner.as_ref() {
            Expr::Ident(name) => Value::Bool(env.contains(name)),
            other => Value::Bool(!eval_value(other, env).is_null()),
        },
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
    }
}

/// Loose equality: numeric kinds compare by value across `Int`/`Float`, and a
/// mismatched-type comparison is `false` rather than a type error.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            (*x as f64 - y).abs() < f64::EPSILON
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::compile;

    fn env_of<'a>(
        params: &'a HashMap<String, Value>,
        answers: &'a HashMap<String, Value>,
    ) -> Env<'a> {
        Env::new(params, answers)
    }

    #[test]
    fn unbound_identifier_is_falsy_null() {
        let params = HashMap::new();
        let answers = HashMap::new();
        let env = env_of(&params, &answers);
        let expr = compile("missing == 'x'").unwrap();
        assert!(!evaluate(&expr, &env));
    }

    #[test]
    fn else_sentinel_always_true() {
        let params = HashMap::new();
        let answers = HashMap::new();
        let env = env_of(&params, &answers);
        assert!(evaluate(&compile("else").unwrap(), &env));
    }

    #[test]
    fn answers_shadow_params_on_collision() {
        let mut params = HashMap::new();
        params.insert("role".to_string(), Value::from("vendor"));
        let mut answers = HashMap::new();
        answers.insert("role".to_string(), Value::from("provider"));
        let env = env_of(&params, &answers);
        let expr = compile("role == 'provider'").unwrap();
        assert!(evaluate(&expr, &env));
    }

    #[test]
    fn in_list_checks_membership() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("role".to_string(), Value::from("provider"));
        let env = env_of(&params, &answers);
        let expr = compile("role in ['provider', 'deployer']").unwrap();
        assert!(evaluate(&expr, &env));
    }

    #[test]
    fn contains_checks_list_membership_of_list_answer() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert(
            "tags".to_string(),
            Value::List(vec![Value::from("gpai"), Value::from("high_risk")]),
        );
        let env = env_of(&params, &answers);
        let expr = compile("tags contains 'high_risk'").unwrap();
        assert!(evaluate(&expr, &env));
    }

    #[test]
    fn is_defined_false_for_null_and_missing() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("role".to_string(), Value::Null);
        let env = env_of(&params, &answers);
        assert!(!evaluate(&compile("role is defined").unwrap(), &env));
        assert!(!evaluate(&compile("ghost is defined").unwrap(), &env));
    }

    #[test]
    fn type_mismatch_comparison_is_false_not_error() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("count".to_string(), Value::Int(3));
        let env = env_of(&params, &answers);
        assert!(!evaluate(&compile("count == 'three'").unwrap(), &env));
    }

    #[test]
    fn bare_identifier_condition_uses_general_truthiness() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("Tags".to_string(), Value::from("gpai"));
        let env = env_of(&params, &answers);
        assert!(evaluate(&compile("Tags").unwrap(), &env));

        let mut empty_answers = HashMap::new();
        empty_answers.insert("Tags".to_string(), Value::from(""));
        let env = env_of(&params, &empty_answers);
        assert!(!evaluate(&compile("Tags").unwrap(), &env));
    }

    #[test]
    fn and_chain_resolves_to_trailing_operand_truthiness() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("role".to_string(), Value::from("provider"));
        answers.insert("notes".to_string(), Value::from("flagged"));
        let env = env_of(&params, &answers);
        assert!(evaluate(&compile("role == 'provider' and notes").unwrap(), &env));
    }

    #[test]
    fn int_float_equality_is_numeric() {
        let params = HashMap::new();
        let mut answers = HashMap::new();
        answers.insert("score".to_string(), Value::Int(3));
        let env = env_of(&params, &answers);
        assert!(evaluate(&compile("score == 3.0").unwrap(), &env));
    }
}
