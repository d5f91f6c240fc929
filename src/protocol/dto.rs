//! Request/response DTOs for the HTTP surface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::orchestrator::ModulePayload;
use crate::value::Value;

#[derive(Debug, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionLangQuery {
    pub session_id: String,
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub module: ModulePayload,
}

#[derive(Debug, Serialize)]
pub struct ModuleResponse {
    pub module: ModulePayload,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub session_id: String,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub answers: HashMap<String, Value>,
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub parameters: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<HashMap<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: Json,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
