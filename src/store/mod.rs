//! Pluggable session persistence: an in-memory store with a background
//! reaper, or a Redis-backed store for multi-replica deployments.

pub mod memory;
pub mod redis_store;

use crate::error::AppResult;
use crate::session::{Session, SessionId};

/// Session lifecycle, independent of backend.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    // async_trait desugars these into boxed futures so `Arc<dyn SessionStore>`
    // stays usable for runtime backend selection.
    async fn create(&self, first_module_id: String, lang: String) -> AppResult<Session>;
    async fn get(&self, id: &SessionId) -> AppResult<Session>;
    async fn save(&self, session: &Session) -> AppResult<()>;
}

pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;
