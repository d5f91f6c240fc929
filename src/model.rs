//! Domain model built by the loader: modules, questions, variables, router
//! rules, and the immutable [`Engine`] that bundles them for one language.
//!
//! YAML deserializes into the `Raw*` structs (shaped exactly like the
//! resource-file schema, including the legacy `module`/`target_module`
//! aliases); [`crate::loader`] compiles each condition string into an
//! [`crate::expr::Expr`] once and produces the `Raw`-free domain structs
//! below, which is what the rest of the crate operates on.

use std::collections::HashMap;

use serde::Deserialize;

use crate::expr::Expr;
use crate::value::Value;

/// A compiled condition alongside the source text it was parsed from, kept
/// for error messages and for round-tripping into diagnostics.
#[derive(Debug, Clone)]
pub struct Condition {
    pub source: String,
    pub expr: Expr,
}

impl Condition {
    pub fn is_else(&self) -> bool {
        matches!(self.expr, Expr::Else)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOption {
    pub value: Value,
    #[serde(default)]
    pub exclusive: bool,
    /// Labels, help text, anything else presentation needs — opaque here.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Boolean,
    SingleChoice,
    #[serde(alias = "multiple_choice")]
    MultiChoice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub dependency: Option<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRule {
    pub condition: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVariable {
    pub name: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub initial_value: Option<Value>,
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRouterRule {
    #[serde(default)]
    pub condition: Option<String>,
    pub action: String,
    #[serde(default)]
    pub target_module_id: Option<String>,
    #[serde(default)]
    pub target_module: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawModule {
    #[serde(default, alias = "module")]
    pub module_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    #[serde(default)]
    pub router: Vec<RawRouterRule>,
}

/// A selectable option on a choice question.
#[derive(Debug, Clone)]
pub struct QuestionOption {
    pub value: Value,
    pub exclusive: bool,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub question_type: QuestionType,
    pub dependency: Option<Condition>,
    pub options: Vec<QuestionOption>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Question {
    pub fn option_values(&self) -> impl Iterator<Item = &Value> {
        self.options.iter().map(|o| &o.value)
    }

    pub fn exclusive_values(&self) -> impl Iterator<Item = &Value> {
        self.options.iter().filter(|o| o.exclusive).map(|o| &o.value)
    }
}

#[derive(Debug, Clone)]
pub struct VariableRule {
    pub condition: Condition,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub var_type: Option<String>,
    pub initial_value: Option<Value>,
    pub rules: Vec<VariableRule>,
}

impl Variable {
    pub fn is_list_typed(&self) -> bool {
        matches!(
            self.var_type.as_deref().map(str::to_lowercase).as_deref(),
            Some("string_list") | Some("list")
        )
    }

    pub fn seed(&self) -> Value {
        self.initial_value
            .clone()
            .unwrap_or_else(|| Value::default_for_type(self.var_type.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    Jump,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct RouterRule {
    pub condition: Option<Condition>,
    pub action: RouteAction,
    pub target_module_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub module_id: String,
    pub module_num: i64,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub questions_by_id: HashMap<String, usize>,
    pub variables: Vec<Variable>,
    pub router: Vec<RouterRule>,
}

impl Module {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions_by_id.get(id).map(|&i| &self.questions[i])
    }
}

/// An immutable, fully-resolved engine for one language. Cheap to share via
/// `Arc` since nothing inside it is ever mutated after [`crate::loader`]
/// finishes building it.
#[derive(Debug, Clone)]
pub struct Engine {
    pub modules: Vec<Module>,
    pub modules_by_id: HashMap<String, usize>,
    pub questions_by_id: HashMap<String, (String, usize)>,
    pub constants: HashMap<String, Value>,
}

impl Engine {
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules_by_id.get(id).map(|&i| &self.modules[i])
    }

    pub fn first_module(&self) -> Option<&Module> {
        self.modules.first()
    }

    pub fn find_question(&self, id: &str) -> Option<&Question> {
        let (module_id, idx) = self.questions_by_id.get(id)?;
        self.modules_by_id
            .get(module_id)
            .map(|&mi| &self.modules[mi].questions[*idx])
    }
}
