use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RepositoryResult;
use crate::models::message::{Message, Mode};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lightweight session metadata for the sidebar index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub mode: Mode,
    pub title: String,
    /// Last-update time as Unix milliseconds (index sort key, newest first).
    pub timestamp: i64,
}

/// Full persisted state of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub mode: Mode,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            mode: self.mode,
            title: self.title.clone(),
            timestamp: self.updated_at.timestamp_millis(),
        }
    }
}

/// Persistence seam for conversation sessions. The streaming core never
/// touches storage directly; it hands finalized message sequences to an
/// implementation of this trait between turns.
pub trait SessionRepository: Send + Sync + 'static {
    /// Ordered session index, newest first.
    fn list_sessions(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionSummary>>>;

    /// Load one session's full record, or `None` if unknown.
    fn load_session(&self, id: &str)
    -> BoxFuture<'static, RepositoryResult<Option<SessionRecord>>>;

    /// Persist a session snapshot, inserting or replacing.
    fn save_session(
        &self,
        id: &str,
        record: SessionRecord,
    ) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Remove a session and its index entry. Unknown ids are ignored.
    fn delete_session(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Update a session's title without rewriting its messages.
    fn rename_session(&self, id: &str, title: &str) -> BoxFuture<'static, RepositoryResult<()>>;
}
