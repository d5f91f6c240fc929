//! Axum handlers. Each is a thin translation layer: pull inputs out of the
//! request, call into [`crate::orchestrator::QuestionnaireService`], wrap the
//! result (or propagate the error via [`ApiError`]).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::orchestrator::QuestionnaireService;

use super::dto::{
    HealthResponse, LangQuery, ModuleResponse, QuestionResponse, ResultResponse, SessionLangQuery,
    StartResponse, SubmitAnswerRequest,
};
use super::error::ApiError;

pub type AppState = Arc<QuestionnaireService>;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn start(
    State(service): State<AppState>,
    Query(query): Query<LangQuery>,
) -> Result<Json<StartResponse>, ApiError> {
    let (session_id, module) = service.start(query.lang.as_deref()).await?;
    Ok(Json(StartResponse { session_id, module }))
}

pub async fn get_module(
    State(service): State<AppState>,
    Path(module_id): Path<String>,
    Query(query): Query<SessionLangQuery>,
) -> Result<Json<ModuleResponse>, ApiError> {
    let module = service
        .get_module(&query.session_id, &module_id, query.lang.as_deref())
        .await?;
    Ok(Json(ModuleResponse { module }))
}

pub async fn submit_answer(
    State(service): State<AppState>,
    Query(query): Query<LangQuery>,
    Json(body): Json<SubmitAnswerRequest>,
) -> Result<Json<crate::orchestrator::SubmitOutcome>, ApiError> {
    let outcome = service
        .submit_answer(
            &body.session_id,
            body.module_id,
            body.answers,
            body.replace,
            query.lang.as_deref(),
        )
        .await?;
    Ok(Json(outcome))
}

pub async fn result(
    State(service): State<AppState>,
    Query(query): Query<SessionLangQuery>,
) -> Result<Json<ResultResponse>, ApiError> {
    let (parameters, conclusion) = service.result(&query.session_id, query.lang.as_deref()).await?;
    Ok(Json(ResultResponse {
        parameters,
        conclusion,
    }))
}

pub async fn get_question(
    State(service): State<AppState>,
    Path(question_id): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = service
        .get_question(&question_id, query.lang.as_deref())
        .await?;
    Ok(Json(QuestionResponse { question }))
}
