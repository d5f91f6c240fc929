//! Pure functions over an [`Engine`] and a set of answers: validation,
//! visibility, parameter derivation, template rendering, pruning, routing,
//! and the conclusion projection. None of this touches the session store —
//! [`crate::orchestrator`] is the only caller that threads in session state.

use std::collections::HashMap;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, AppResult};
use crate::expr::{evaluate, Env};
use crate::model::{Engine, Module, Question, QuestionType, RouteAction};
use crate::value::Value;

static TEMPLATE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex"));

pub type Answers = HashMap<String, Value>;
pub type Parameters = HashMap<String, Value>;

/// Validate a raw answer against a question's declared type and options,
/// returning the (possibly normalized) value to store. Error shapes mirror
/// the reference service's `HTTPException(400, detail={...})` payloads.
pub fn validate_answer(question: &Question, value: Value) -> AppResult<Value> {
    match question.question_type {
        QuestionType::Boolean => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(invalid_answer(&question.id, "expected", Value::from("boolean"))),
        },
        QuestionType::SingleChoice => {
            if question.option_values().any(|v| v == &value) {
                Ok(value)
            } else {
                Err(invalid_answer(&question.id, "value", value))
            }
        }
        QuestionType::MultiChoice => {
            let items = match &value {
                Value::List(items) => items.clone(),
                _ => return Err(invalid_answer(&question.id, "expected", Value::from("list"))),
            };
            let mut seen: Vec<&Value> = Vec::new();
            for item in &items {
                if seen.contains(&item) {
                    return Err(invalid_answer(&question.id, "duplicates", Value::Bool(true)));
                }
                seen.push(item);
            }
            let invalid: Vec<Value> = items
                .iter()
                .filter(|item| !question.option_values().any(|v| v == *item))
                .cloned()
                .collect();
            if !invalid.is_empty() {
                return Err(invalid_answer(&question.id, "invalid", Value::List(invalid)));
            }
            let exclusive_selected = items
                .iter()
                .any(|item| question.exclusive_values().any(|v| v == item));
            if exclusive_selected && items.len() != 1 {
                return Err(invalid_answer(&question.id, "exclusive", Value::Bool(true)));
            }
            Ok(Value::List(items))
        }
    }
}

/// Build the structured 400 detail the reference service raises: a flat
/// object keyed on `invalid_answer` (the offending question id) plus one
/// reason key describing why the value was rejected.
fn invalid_answer(question_id: &str, reason_key: &str, reason_value: Value) -> AppError {
    let mut detail = serde_json::Map::new();
    detail.insert(
        "invalid_answer".into(),
        serde_json::Value::String(question_id.to_string()),
    );
    detail.insert(reason_key.into(), reason_value.into());
    AppError::InvalidAnswer {
        question_id: question_id.to_string(),
        detail: serde_json::Value::Object(detail),
    }
}

/// `true` when `question` has no dependency, or its dependency evaluates
/// true against `params` + `answers`.
pub fn question_visible(question: &Question, params: &Parameters, answers: &Answers) -> bool {
    match &question.dependency {
        None => true,
        Some(cond) => {
            let env = Env::new(params, answers);
            evaluate(&cond.expr, &env)
        }
    }
}

/// A module is complete once every currently-visible question has an answer.
pub fn module_complete(module: &Module, params: &Parameters, answers: &Answers) -> bool {
    module
        .questions
        .iter()
        .filter(|q| question_visible(q, params, answers))
        .all(|q| answers.contains_key(&q.id))
}

/// The questions a module presents right now: the first unanswered visible
/// question, or — if everything visible is already answered — the last
/// answered visible one, or the last visible one, or nothing.
pub fn module_payload_questions<'a>(
    module: &'a Module,
    params: &Parameters,
    answers: &Answers,
) -> Vec<&'a Question> {
    let visible: Vec<&Question> = module
        .questions
        .iter()
        .filter(|q| question_visible(q, params, answers))
        .collect();

    if let Some(q) = visible.iter().find(|q| !answers.contains_key(&q.id)) {
        return vec![q];
    }
    if let Some(q) = visible.iter().rev().find(|q| answers.contains_key(&q.id)) {
        return vec![q];
    }
    if let Some(q) = visible.last() {
        return vec![q];
    }
    Vec::new()
}

/// Drop answers in `module` that are no longer visible under the current
/// parameters. Returns whether anything was removed.
pub fn prune_hidden_answers(module: &Module, params: &Parameters, answers: &mut Answers) -> bool {
    let mut removed = false;
    for question in &module.questions {
        if answers.contains_key(&question.id) && !question_visible(question, params, answers) {
            answers.remove(&question.id);
            removed = true;
        }
    }
    removed
}

/// Recompute every parameter from scratch as a pure function of the engine
/// and the current answers, then render `{{ name }}` placeholders.
pub fn compute_parameters(engine: &Engine, answers: &Answers) -> Parameters {
    let mut params: Parameters = HashMap::new();

    for module in &engine.modules {
        for variable in &module.variables {
            let seed = variable.seed();
            let value = if variable.is_list_typed() {
                let mut collected = Vec::new();
                let mut else_value: Option<Value> = None;
                for rule in &variable.rules {
                    if rule.condition.is_else() {
                        else_value = Some(rule.value.clone());
                        continue;
                    }
                    let env = Env::new(&params, answers);
                    if evaluate(&rule.condition.expr, &env) {
                        collected.push(rule.value.clone());
                    }
                }
                if !collected.is_empty() {
                    Value::List(collected)
                } else if let Some(v) = else_value {
                    Value::List(v.into_list())
                } else {
                    seed
                }
            } else {
                let mut chosen = None;
                for rule in &variable.rules {
                    let env = Env::new(&params, answers);
                    let matches = rule.condition.is_else() || evaluate(&rule.condition.expr, &env);
                    if matches {
                        chosen = Some(rule.value.clone());
                        break;
                    }
                }
                chosen.unwrap_or(seed)
            };
            params.insert(variable.name.clone(), value);
        }
    }

    render_templates(&mut params, answers);
    params
}

fn render_templates(params: &mut Parameters, answers: &Answers) {
    let snapshot = params.clone();
    for value in params.values_mut() {
        render_value(value, &snapshot, answers);
    }
}

fn render_value(value: &mut Value, params: &Parameters, answers: &Answers) {
    match value {
        Value::Str(s) => {
            if TEMPLATE_VAR.is_match(s) {
                *s = render_template_string(s, params, answers);
            }
        }
        Value::List(items) => {
            for item in items {
                render_value(item, params, answers);
            }
        }
        _ => {}
    }
}

fn render_template_string(template: &str, params: &Parameters, answers: &Answers) -> String {
    TEMPLATE_VAR
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            params
                .get(name)
                .or_else(|| answers.get(name))
                .map(Value::render)
                .unwrap_or_default()
        })
        .into_owned()
}

pub enum NextAction {
    Module {
        target: String,
        message: Option<String>,
    },
    Result {
        message: Option<String>,
    },
}

/// Evaluate a module's router rules against `params`/`answers` (extended
/// with `Module_finished`). Falls back to staying on the same module if no
/// rule matches.
pub fn next_action(
    module: &Module,
    params: &Parameters,
    answers: &Answers,
    module_done: bool,
) -> AppResult<NextAction> {
    let mut env_params = params.clone();
    env_params.insert("Module_finished".to_string(), Value::Bool(module_done));

    for rule in &module.router {
        let matches = match &rule.condition {
            None => true,
            Some(cond) => {
                let env = Env::new(&env_params, answers);
                evaluate(&cond.expr, &env)
            }
        };
        if !matches {
            continue;
        }
        return match rule.action {
            RouteAction::Jump => {
                let target = rule
                    .target_module_id
                    .clone()
                    .ok_or_else(|| AppError::RouterTargetMissing(module.module_id.clone()))?;
                Ok(NextAction::Module {
                    target,
                    message: rule.message.clone(),
                })
            }
            RouteAction::Terminate => Ok(NextAction::Result {
                message: rule.message.clone(),
            }),
        };
    }

    Ok(NextAction::Module {
        target: module.module_id.clone(),
        message: None,
    })
}

/// Project `{Role, Type, Risk_level, View}` out of the derived parameters.
pub fn compute_conclusion(params: &Parameters) -> HashMap<String, Value> {
    let mut conclusion = HashMap::new();
    for key in ["Role", "Type", "Risk_level", "View"] {
        conclusion.insert(
            key.to_string(),
            params.get(key).cloned().unwrap_or(Value::Null),
        );
    }
    conclusion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionOption, QuestionType};

    fn question(id: &str, qt: QuestionType, options: Vec<&str>, exclusive: Vec<&str>) -> Question {
        Question {
            id: id.to_string(),
            question_type: qt,
            dependency: None,
            options: options
                .into_iter()
                .map(|v| QuestionOption {
                    value: Value::from(v),
                    exclusive: exclusive.contains(&v),
                    extra: serde_json::Map::new(),
                })
                .collect(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn boolean_answer_rejects_non_bool() {
        let q = question("q1", QuestionType::Boolean, vec![], vec![]);
        assert!(validate_answer(&q, Value::from("yes")).is_err());
        assert!(validate_answer(&q, Value::Bool(true)).is_ok());
    }

    #[test]
    fn single_choice_rejects_unknown_value() {
        let q = question("q2", QuestionType::SingleChoice, vec!["a", "b"], vec![]);
        assert!(validate_answer(&q, Value::from("c")).is_err());
        assert!(validate_answer(&q, Value::from("a")).is_ok());
    }

    #[test]
    fn multi_choice_rejects_duplicates_and_enforces_exclusive() {
        let q = question("q3", QuestionType::MultiChoice, vec!["a", "b", "none"], vec!["none"]);

        let err = validate_answer(&q, Value::List(vec![Value::from("a"), Value::from("a")]))
            .unwrap_err();
        match err {
            AppError::InvalidAnswer { question_id, detail } => {
                assert_eq!(question_id, "q3");
                assert_eq!(detail["invalid_answer"], "q3");
                assert_eq!(detail["duplicates"], true);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = validate_answer(
            &q,
            Value::List(vec![Value::from("a"), Value::from("none")]),
        )
        .unwrap_err();
        match err {
            AppError::InvalidAnswer { detail, .. } => {
                assert_eq!(detail["invalid_answer"], "q3");
                assert_eq!(detail["exclusive"], true);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(validate_answer(&q, Value::List(vec![Value::from("none")])).is_ok());
        assert!(validate_answer(&q, Value::List(vec![Value::from("a"), Value::from("b")])).is_ok());
    }

    #[test]
    fn template_rendering_substitutes_params_then_answers() {
        let mut params: Parameters = HashMap::new();
        params.insert("Greeting".to_string(), Value::from("hi {{ Name }}"));
        params.insert("Name".to_string(), Value::from("Ada"));
        let answers: Answers = HashMap::new();
        render_templates(&mut params, &answers);
        assert_eq!(params["Greeting"], Value::from("hi Ada"));
    }

    #[test]
    fn conclusion_defaults_missing_keys_to_null() {
        let params: Parameters = HashMap::new();
        let conclusion = compute_conclusion(&params);
        assert_eq!(conclusion["Role"], Value::Null);
        assert_eq!(conclusion.len(), 4);
    }
}
