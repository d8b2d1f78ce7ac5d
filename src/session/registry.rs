use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::RuntimeSession;
use crate::core::SessionKey;

pub type SessionHandle = Arc<Mutex<RuntimeSession>>;

/// Keyed lookup/creation of live runtime sessions.
///
/// Every session sits behind its own mutex: all mutation for one key is
/// serialized by holding that lock across the whole read-modify-write of
/// an action, while distinct keys proceed fully in parallel. The registry
/// is process-local; multi-instance deployments need sticky routing or an
/// externally lockable store.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Insert `session` unless another caller created one first.
    ///
    /// Returns the winning handle and whether this call created it; the
    /// loser's session is discarded, which keeps initialize idempotent
    /// under racing launches.
    pub async fn insert_if_absent(
        &self,
        key: SessionKey,
        session: RuntimeSession,
    ) -> (SessionHandle, bool) {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&key) {
            Some(existing) => (existing.clone(), false),
            None => {
                let handle: SessionHandle = Arc::new(Mutex::new(session));
                sessions.insert(key, handle.clone());
                (handle, true)
            }
        }
    }

    /// Remove the session for `key`. Only terminate does this, after the
    /// final durable write succeeded.
    pub async fn remove(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.write().await.remove(key)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
