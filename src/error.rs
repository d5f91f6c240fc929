//! Unified error type for the engine, the session store, and the HTTP layer.
//!
//! Three kinds, matching the reference service's fault taxonomy: client
//! faults (bad input), authoring faults (broken resource data), and
//! not-found. Conversion to the JSON envelope lives in
//! [`crate::protocol::error`] so this module stays transport-agnostic.

use serde_json::Value as Json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // -- client faults (400) --
    #[error("module_id_required")]
    ModuleIdRequired,
    #[error("invalid answer")]
    InvalidAnswer { question_id: String, detail: Json },
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    // -- not found (404) --
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("question not found: {0}")]
    QuestionNotFound(String),

    // -- authoring / loader faults (500) --
    #[error("resources directory missing: {0}")]
    ResourcesDirMissing(String),
    #[error("module id missing in {0}")]
    ModuleIdMissing(String),
    #[error("no modules loaded for language {0}")]
    NoModulesLoaded(String),
    #[error("router target missing for module {0}")]
    RouterTargetMissing(String),
    #[error("invalid condition `{condition}`: {reason}")]
    InvalidCondition { condition: String, reason: String },

    // -- infra faults (500) --
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("session store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn status(&self) -> u16 {
        match self {
            AppError::ModuleIdRequired
            | AppError::InvalidAnswer { .. }
            | AppError::UnknownQuestion(_) => 400,
            AppError::SessionNotFound(_)
            | AppError::ModuleNotFound(_)
            | AppError::QuestionNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Structured detail for the JSON error envelope — either a bare string
    /// token or an object, matching the reference service's
    /// `HTTPException(detail=...)` shapes exactly.
    pub fn detail(&self) -> Json {
        match self {
            AppError::ModuleIdRequired => Json::String("module_id_required".into()),
            AppError::SessionNotFound(_) => Json::String("session_not_found".into()),
            AppError::ModuleNotFound(_) => Json::String("module_not_found".into()),
            AppError::QuestionNotFound(_) => Json::String("question_not_found".into()),
            AppError::ResourcesDirMissing(_) => Json::String("resources_dir_missing".into()),
            AppError::NoModulesLoaded(_) => Json::String("no_modules_loaded".into()),
            // `detail` is already the flat `{invalid_answer: question_id, ...}`
            // object the reference service raises; `question_id` is kept on
            // the variant for callers that want it without re-parsing JSON.
            AppError::InvalidAnswer { detail, .. } => detail.clone(),
            AppError::UnknownQuestion(qid) => {
                let mut obj = serde_json::Map::new();
                obj.insert("error".into(), Json::String("unknown_question".into()));
                obj.insert("question_id".into(), Json::String(qid.clone()));
                Json::Object(obj)
            }
            AppError::RouterTargetMissing(module_id) => {
                let mut obj = serde_json::Map::new();
                obj.insert("error".into(), Json::String("router_target_missing".into()));
                obj.insert("module_id".into(), Json::String(module_id.clone()));
                Json::Object(obj)
            }
            AppError::InvalidCondition { condition, reason } => {
                let mut obj = serde_json::Map::new();
                obj.insert("error".into(), Json::String("invalid_condition".into()));
                obj.insert("condition".into(), Json::String(condition.clone()));
                obj.insert("reason".into(), Json::String(reason.clone()));
                Json::Object(obj)
            }
            AppError::ModuleIdMissing(file) => {
                let mut obj = serde_json::Map::new();
                obj.insert("error".into(), Json::String("module_id_missing".into()));
                obj.insert("file".into(), Json::String(file.clone()));
                Json::Object(obj)
            }
            AppError::Io(e) => Json::String(e.to_string()),
            AppError::Yaml(e) => Json::String(e.to_string()),
            AppError::Store(msg) => Json::String(msg.clone()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
