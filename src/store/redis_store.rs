//! Redis-backed session store for multi-replica deployments. Sessions are
//! JSON blobs under `aiq:sessions:{id}`, with the TTL refreshed on every
//! read and write so an active session never expires mid-conversation.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{AppError, AppResult};
use crate::session::{Session, SessionId};

use super::SessionStore;

fn key(id: &str) -> String {
    format!("aiq:sessions:{id}")
}

pub struct RedisSessionStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = redis::Client::open(url).map_err(|e| AppError::Store(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(RedisSessionStore { conn, ttl_seconds })
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, first_module_id: String, lang: String) -> AppResult<Session> {
        let session = Session::new(first_module_id, lang);
        self.save(&session).await?;
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> AppResult<Session> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key(id))
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        let raw = raw.ok_or_else(|| AppError::SessionNotFound(id.clone()))?;
        let session: Session =
            serde_json::from_str(&raw).map_err(|e| AppError::Store(e.to_string()))?;
        if self.ttl_seconds > 0 {
            let _: () = conn
                .expire(key(id), self.ttl_seconds as i64)
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;
        }
        Ok(session)
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(session).map_err(|e| AppError::Store(e.to_string()))?;
        if self.ttl_seconds > 0 {
            let _: () = conn
                .set_ex(key(&session.id), raw, self.ttl_seconds)
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;
        } else {
            let _: () = conn
                .set(key(&session.id), raw)
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;
        }
        Ok(())
    }
}
