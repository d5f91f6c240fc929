//! In-process session store guarded by a `parking_lot::Mutex`, with a
//! background tokio task that reaps entries idle past the configured TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::session::{Session, SessionId};

use super::SessionStore;

struct Entry {
    session: Session,
    last_access: Instant,
}

pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Entry>>>,
    _shutdown_tx: Option<watch::Sender<bool>>,
}

impl MemorySessionStore {
    /// `ttl`: `None` disables expiry entirely (no reaper task spawned).
    pub fn new(ttl: Option<Duration>, cleanup_interval: Duration) -> Self {
        let sessions: Arc<Mutex<HashMap<SessionId, Entry>>> = Arc::new(Mutex::new(HashMap::new()));
        let shutdown_tx = ttl.map(|ttl| {
            let (tx, mut rx) = watch::channel(false);
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            let mut guard = sessions.lock();
                            let before = guard.len();
                            guard.retain(|_, e| e.last_access.elapsed() < ttl);
                            let reaped = before - guard.len();
                            drop(guard);
                            if reaped > 0 {
                                debug!(reaped, "reaped expired sessions");
                            }
                        }
                        _ = rx.changed() => {
                            if *rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            });
            tx
        });
        MemorySessionStore {
            sessions,
            _shutdown_tx: shutdown_tx,
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, first_module_id: String, lang: String) -> AppResult<Session> {
        let session = Session::new(first_module_id, lang);
        self.sessions.lock().insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                last_access: Instant::now(),
            },
        );
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> AppResult<Session> {
        let mut guard = self.sessions.lock();
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.clone()))?;
        entry.last_access = Instant::now();
        Ok(entry.session.clone())
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        self.sessions.lock().insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                last_access: Instant::now(),
            },
        );
        Ok(())
    }
}

impl Drop for MemorySessionStore {
    fn drop(&mut self) {
        if let Some(tx) = &self._shutdown_tx {
            let _ = tx.send(true);
        }
    }
}
