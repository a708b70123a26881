use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::RepositoryResult;
use super::session_repository::{BoxFuture, SessionRecord, SessionRepository, SessionSummary};

/// In-memory session store, useful for testing and development.
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn list_sessions(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionSummary>>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            let store = sessions.lock();
            let mut index: Vec<SessionSummary> = store.values().map(|r| r.summary()).collect();
            index.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Ok(index)
        })
    }

    fn load_session(
        &self,
        id: &str,
    ) -> BoxFuture<'static, RepositoryResult<Option<SessionRecord>>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();
        Box::pin(async move { Ok(sessions.lock().get(&id).cloned()) })
    }

    fn save_session(
        &self,
        id: &str,
        record: SessionRecord,
    ) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();
        Box::pin(async move {
            sessions.lock().insert(id, record);
            Ok(())
        })
    }

    fn delete_session(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();
        Box::pin(async move {
            sessions.lock().remove(&id);
            Ok(())
        })
    }

    fn rename_session(&self, id: &str, title: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions = self.sessions.clone();
        let id = id.to_string();
        let title = title.to_string();
        Box::pin(async move {
            if let Some(record) = sessions.lock().get_mut(&id) {
                record.title = title;
            }
            Ok(())
        })
    }
}
