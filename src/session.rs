//! Session identity and state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

pub type SessionId = String;

/// A fresh opaque session id: 32 lowercase hex characters, matching the
/// reference service's `uuid4().hex`.
pub fn new_session_id() -> SessionId {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub answers: HashMap<String, Value>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default)]
    pub current_module_id: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub conclusion: Option<HashMap<String, Value>>,
}

fn default_lang() -> String {
    "en".to_string()
}

impl Session {
    pub fn new(first_module_id: String, lang: String) -> Self {
        Session {
            id: new_session_id(),
            answers: HashMap::new(),
            parameters: HashMap::new(),
            current_module_id: Some(first_module_id),
            lang,
            conclusion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_id_is_32_lowercase_hex_chars() {
        let id = new_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn session_round_trips_through_json_with_defaults() {
        let session = Session::new("m1".to_string(), "en".to_string());
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(back.current_module_id.as_deref(), Some("m1"));
    }

    #[test]
    fn session_deserializes_with_missing_optional_fields() {
        let minimal = r#"{"id":"abc","current_module_id":null,"lang":"en"}"#;
        let session: Session = serde_json::from_str(minimal).unwrap();
        assert!(session.answers.is_empty());
        assert!(session.conclusion.is_none());
    }
}
