//! Per-request orchestration: the only component that threads session state
//! through the engine and evaluator and persists the result.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::{AppError, AppResult};
use crate::evaluator::{
    compute_conclusion, compute_parameters, module_complete, module_payload_questions,
    next_action, prune_hidden_answers, validate_answer, NextAction,
};
use crate::loader::EngineLoader;
use crate::model::{Engine, Module, Question};
use crate::session::{Session, SessionId};
use crate::store::SessionStore;
use crate::value::Value;

const MAX_PRUNE_ITERATIONS: u32 = 5;

/// Normalise a `lang` query parameter: unrecognised or absent values fall
/// back to `fallback` (typically the session's stored language, else "en").
pub fn normalize_lang(lang: Option<&str>, fallback: &str) -> String {
    match lang.map(|l| l.to_lowercase()) {
        Some(l) if matches!(l.as_str(), "zh" | "cn" | "zh-cn" | "zh-hans" | "zh-hans-cn") => {
            "cn".to_string()
        }
        Some(_) => "en".to_string(),
        None => fallback.to_string(),
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModulePayload {
    pub module_id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<Json>,
}

fn question_json(question: &Question) -> Json {
    let mut obj = question.extra.clone();
    obj.insert("id".into(), Json::String(question.id.clone()));
    obj.insert(
        "options".into(),
        Json::Array(
            question
                .options
                .iter()
                .map(|o| {
                    let mut m = o.extra.clone();
                    m.insert("value".into(), o.value.clone().into());
                    m.insert("exclusive".into(), Json::Bool(o.exclusive));
                    Json::Object(m)
                })
                .collect(),
        ),
    );
    Json::Object(obj)
}

fn module_payload(module: &Module, params: &HashMap<String, Value>, answers: &HashMap<String, Value>) -> ModulePayload {
    ModulePayload {
        module_id: module.module_id.clone(),
        title: module.title.clone(),
        description: module.description.clone(),
        questions: module_payload_questions(module, params, answers)
            .into_iter()
            .map(question_json)
            .collect(),
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStep {
    Module {
        module_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Result {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitOutcome {
    pub session_id: SessionId,
    pub parameters: HashMap<String, Value>,
    pub next: NextStep,
    pub module_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModulePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<HashMap<String, Value>>,
}

pub struct QuestionnaireService {
    loader: Arc<EngineLoader>,
    store: Arc<dyn SessionStore>,
}

impl QuestionnaireService {
    pub fn new(loader: Arc<EngineLoader>, store: Arc<dyn SessionStore>) -> Self {
        QuestionnaireService { loader, store }
    }

    fn engine_for(&self, lang: &str) -> AppResult<Arc<Engine>> {
        self.loader.get_engine(lang)
    }

    pub async fn start(&self, lang: Option<&str>) -> AppResult<(SessionId, ModulePayload)> {
        let lang = normalize_lang(lang, "en");
        let engine = self.engine_for(&lang)?;
        let first = engine
            .first_module()
            .ok_or_else(|| AppError::NoModulesLoaded(lang.clone()))?;
        let mut session = self.store.create(first.module_id.clone(), lang).await?;
        session.parameters = compute_parameters(&engine, &session.answers);
        let payload = module_payload(first, &session.parameters, &session.answers);
        self.store.save(&session).await?;
        Ok((session.id, payload))
    }

    pub async fn get_module(
        &self,
        session_id: &SessionId,
        module_id: &str,
        lang: Option<&str>,
    ) -> AppResult<ModulePayload> {
        let mut session = self.store.get(session_id).await?;
        let lang = normalize_lang(lang, &session.lang);
        let lang_changed = lang != session.lang;
        session.lang = lang.clone();
        let engine = self.engine_for(&lang)?;
        let module = engine
            .module(module_id)
            .ok_or_else(|| AppError::ModuleNotFound(module_id.to_string()))?;
        let payload = module_payload(module, &session.parameters, &session.answers);
        if lang_changed {
            self.store.save(&session).await?;
        }
        Ok(payload)
    }

    pub async fn get_question(&self, question_id: &str, lang: Option<&str>) -> AppResult<Json> {
        let lang = normalize_lang(lang, "en");
        let engine = self.engine_for(&lang)?;
        let question = engine
            .find_question(question_id)
            .ok_or_else(|| AppError::QuestionNotFound(question_id.to_string()))?;
        Ok(question_json(question))
    }

    pub async fn result(
        &self,
        session_id: &SessionId,
        lang: Option<&str>,
    ) -> AppResult<(HashMap<String, Value>, Option<HashMap<String, Value>>)> {
        let mut session = self.store.get(session_id).await?;
        let lang = normalize_lang(lang, &session.lang);
        let lang_changed = lang != session.lang;
        session.lang = lang;
        if lang_changed {
            self.store.save(&session).await?;
        }
        Ok((session.parameters, session.conclusion))
    }

    pub async fn submit_answer(
        &self,
        session_id: &SessionId,
        module_id: Option<String>,
        answers_in: HashMap<String, Value>,
        replace: bool,
        lang: Option<&str>,
    ) -> AppResult<SubmitOutcome> {
        let mut session: Session = self.store.get(session_id).await?;
        let lang = normalize_lang(lang, &session.lang);
        session.lang = lang.clone();
        let engine = self.engine_for(&lang)?;

        let active_id = module_id
            .clone()
            .or_else(|| session.current_module_id.clone())
            .ok_or(AppError::ModuleIdRequired)?;
        let active_module_def = engine
            .module(&active_id)
            .ok_or_else(|| AppError::ModuleNotFound(active_id.clone()))?;

        if module_id.is_some() {
            session.current_module_id = Some(active_id.clone());
        }

        if replace {
            session.answers.clear();
        }

        for (qid, value) in answers_in {
            let question = engine
                .find_question(&qid)
                .ok_or_else(|| AppError::UnknownQuestion(qid.clone()))?;
            let validated = validate_answer(question, value)?;
            session.answers.insert(qid, validated);
        }

        session.parameters = compute_parameters(&engine, &session.answers);
        for _ in 0..MAX_PRUNE_ITERATIONS {
            let active_module = engine
                .module(&active_id)
                .ok_or_else(|| AppError::ModuleNotFound(active_id.clone()))?;
            let removed = prune_hidden_answers(active_module, &session.parameters, &mut session.answers);
            if !removed {
                break;
            }
            session.parameters = compute_parameters(&engine, &session.answers);
        }

        let active_module = engine
            .module(&active_id)
            .ok_or_else(|| AppError::ModuleNotFound(active_id.clone()))?;
        let complete = module_complete(active_module, &session.parameters, &session.answers);

        let outcome = if !complete {
            SubmitOutcome {
                session_id: session.id.clone(),
                parameters: session.parameters.clone(),
                next: NextStep::Module {
                    module_id: active_id.clone(),
                    message: None,
                },
                module_complete: false,
                module: Some(module_payload(active_module, &session.parameters, &session.answers)),
                conclusion: None,
            }
        } else {
            match next_action(active_module, &session.parameters, &session.answers, true)? {
                NextAction::Module { target, message } => {
                    let target_module = engine.module(&target);
                    session.current_module_id = Some(target.clone());
                    SubmitOutcome {
                        session_id: session.id.clone(),
                        parameters: session.parameters.clone(),
                        next: NextStep::Module {
                            module_id: target,
                            message,
                        },
                        module_complete: true,
                        module: target_module
                            .map(|m| module_payload(m, &session.parameters, &session.answers)),
                        conclusion: None,
                    }
                }
                NextAction::Result { message } => {
                    session.current_module_id = None;
                    let conclusion = compute_conclusion(&session.parameters);
                    session.conclusion = Some(conclusion.clone());
                    SubmitOutcome {
                        session_id: session.id.clone(),
                        parameters: session.parameters.clone(),
                        next: NextStep::Result { message },
                        module_complete: true,
                        module: None,
                        conclusion: Some(conclusion),
                    }
                }
            }
        };

        self.store.save(&session).await?;
        Ok(outcome)
    }
}
