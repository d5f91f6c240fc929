//! Builds an immutable [`Engine`] from a directory of YAML module files, and
//! caches it per language with mtime-signature invalidation.
//!
//! Mirrors the reference loader's `EngineLoader.get_engine()` exactly: a TTL
//! short-circuits the disk check entirely; past the TTL, a signature made of
//! `(filename, mtime)` pairs decides whether to reuse the cached engine or
//! rebuild. Rebuilds replace the cached `(signature, engine)` pair under a
//! single mutex so no reader ever observes a half-built engine.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::expr;
use crate::model::{
    Condition, Engine, Module, QuestionOption, Question, RawModule, RouteAction, RouterRule, Variable,
    VariableRule,
};
use crate::value::Value;

static CITE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[cite:[^\]]*\]").expect("static regex"));
static FIRST_INT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

/// Strip citation-marker annotation artefacts the source YAML sometimes
/// carries from its authoring tool.
fn strip_citation_markers(text: &str) -> String {
    let without_end = text.replace("[cite_end]", "");
    CITE_MARKER.replace_all(&without_end, "").into_owned()
}

fn parse_module_number(module_id: &str, filename: &str) -> i64 {
    if let Some(m) = FIRST_INT_RUN.find(module_id) {
        if let Ok(n) = m.as_str().parse() {
            return n;
        }
    }
    if let Some(m) = FIRST_INT_RUN.find(filename) {
        if let Ok(n) = m.as_str().parse() {
            return n;
        }
    }
    9999
}

fn parse_target_module(raw: &str) -> String {
    FIRST_INT_RUN
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn compile_condition(source: &str) -> AppResult<Condition> {
    let expr = expr::compile(source).map_err(|e| AppError::InvalidCondition {
        condition: source.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Condition {
        source: source.to_string(),
        expr,
    })
}

fn build_module(raw: RawModule, filename: &str) -> AppResult<Module> {
    let module_id = raw
        .module_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::ModuleIdMissing(filename.to_string()))?;
    let module_num = parse_module_number(&module_id, filename);

    let mut questions = Vec::with_capacity(raw.questions.len());
    let mut questions_by_id = HashMap::new();
    for q in raw.questions {
        let dependency = match q.dependency {
            Some(d) if !d.trim().is_empty() => Some(compile_condition(&d)?),
            _ => None,
        };
        let options = q
            .options
            .into_iter()
            .map(|o| QuestionOption {
                value: o.value,
                exclusive: o.exclusive,
                extra: o.extra,
            })
            .collect();
        questions_by_id.insert(q.id.clone(), questions.len());
        questions.push(Question {
            id: q.id,
            question_type: q.question_type,
            dependency,
            options,
            extra: q.extra,
        });
    }

    let mut variables = Vec::with_capacity(raw.variables.len());
    for v in raw.variables {
        let mut rules = Vec::with_capacity(v.rules.len());
        for r in v.rules {
            rules.push(VariableRule {
                condition: compile_condition(&r.condition)?,
                value: r.value,
            });
        }
        variables.push(Variable {
            name: v.name,
            var_type: v.r#type,
            initial_value: v.initial_value,
            rules,
        });
    }

    let mut router = Vec::with_capacity(raw.router.len());
    for r in raw.router {
        let condition = match r.condition {
            Some(c) if !c.trim().is_empty() => Some(compile_condition(&c)?),
            _ => None,
        };
        let action = match r.action.to_lowercase().as_str() {
            "jump" | "next" => RouteAction::Jump,
            "terminate" | "end" | "finish" => RouteAction::Terminate,
            other => {
                return Err(AppError::InvalidCondition {
                    condition: r.action.clone(),
                    reason: format!("unknown router action `{other}`"),
                })
            }
        };
        let target_module_id = r
            .target_module_id
            .or_else(|| r.target_module.as_deref().map(parse_target_module));
        router.push(RouterRule {
            condition,
            action,
            target_module_id,
            message: r.message,
        });
    }

    Ok(Module {
        module_id: module_id.clone(),
        module_num,
        title: raw
            .title
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(module_id),
        description: raw.description.unwrap_or_default(),
        questions,
        questions_by_id,
        variables,
        router,
    })
}

fn load_constants(dir: &Path) -> AppResult<HashMap<String, Value>> {
    let path = dir.join("constants.yaml");
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let text = fs::read_to_string(&path)?;
    #[derive(serde::Deserialize)]
    struct ConstantsFile {
        #[serde(default)]
        constants: HashMap<String, Value>,
    }
    let parsed: ConstantsFile = serde_yaml::from_str(&strip_citation_markers(&text))?;
    Ok(parsed.constants)
}

fn directory_signature(dir: &Path) -> AppResult<Vec<(String, u64)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let meta = entry.metadata()?;
        let mtime = meta
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, mtime));
    }
    entries.sort();
    Ok(entries)
}

fn build_engine(dir: &Path) -> AppResult<Engine> {
    if !dir.is_dir() {
        return Err(AppError::ResourcesDirMissing(dir.display().to_string()));
    }
    let constants = load_constants(dir)?;

    let mut modules = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename == "constants.yaml" {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        let raw: RawModule = serde_yaml::from_str(&strip_citation_markers(&text))?;
        modules.push(build_module(raw, &filename)?);
    }
    modules.sort_by_key(|m| m.module_num);

    let mut modules_by_id = HashMap::new();
    let mut questions_by_id = HashMap::new();
    for (idx, module) in modules.iter().enumerate() {
        modules_by_id.insert(module.module_id.clone(), idx);
        for (qidx, question) in module.questions.iter().enumerate() {
            questions_by_id.insert(question.id.clone(), (module.module_id.clone(), qidx));
        }
    }

    Ok(Engine {
        modules,
        modules_by_id,
        questions_by_id,
        constants,
    })
}

struct CacheEntry {
    signature: Vec<(String, u64)>,
    engine: Arc<Engine>,
    checked_at: Instant,
}

/// Caches one [`Engine`] per language directory under `resources_root`.
pub struct EngineLoader {
    resources_root: PathBuf,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl EngineLoader {
    pub fn new(resources_root: impl Into<PathBuf>, cache_ttl: Duration) -> Self {
        EngineLoader {
            resources_root: resources_root.into(),
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn dir_for(&self, lang: &str) -> PathBuf {
        self.resources_root.join(lang)
    }

    /// Return the engine for `lang`, rebuilding it if the resource directory
    /// changed since the last check and the TTL has elapsed.
    pub fn get_engine(&self, lang: &str) -> AppResult<Arc<Engine>> {
        let dir = self.dir_for(lang);
        let mut cache = self.cache.lock();

        if let Some(entry) = cache.get(lang) {
            if !self.cache_ttl.is_zero() && entry.checked_at.elapsed() < self.cache_ttl {
                return Ok(Arc::clone(&entry.engine));
            }
        }

        let signature = directory_signature(&dir)?;
        if let Some(entry) = cache.get_mut(lang) {
            if entry.signature == signature {
                entry.checked_at = Instant::now();
                return Ok(Arc::clone(&entry.engine));
            }
        }

        let engine = Arc::new(build_engine(&dir)?);
        cache.insert(
            lang.to_string(),
            CacheEntry {
                signature,
                engine: Arc::clone(&engine),
                checked_at: Instant::now(),
            },
        );
        Ok(engine)
    }
}
