use std::path::PathBuf;

use tracing::warn;

use super::error::{RepositoryError, RepositoryResult};
use super::session_repository::{BoxFuture, SessionRecord, SessionRepository, SessionSummary};

const INDEX_FILE: &str = "index.json";

/// JSON file-based session store.
/// Keeps one file per session plus an index of summaries under
/// `~/.config/pstral/sessions/`.
pub struct JsonSessionRepository {
    sessions_dir: PathBuf,
}

impl JsonSessionRepository {
    pub fn new() -> RepositoryResult<Self> {
        let sessions_dir = dirs::config_dir()
            .ok_or_else(|| RepositoryError::InitializationError {
                message: "Could not determine config directory".to_string(),
            })?
            .join("pstral")
            .join("sessions");

        Ok(Self { sessions_dir })
    }

    /// Store sessions under an explicit directory (tests, portable installs).
    pub fn with_dir(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.sessions_dir.join(INDEX_FILE)
    }
}

fn read_index(path: &PathBuf) -> RepositoryResult<Vec<SessionSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(index) => Ok(index),
        Err(error) => {
            // A corrupt index is recoverable: sessions themselves are intact.
            warn!(%error, "Session index unreadable, starting from empty");
            Ok(Vec::new())
        }
    }
}

/// Write to a temp file, then rename into place.
fn write_atomically(path: &PathBuf, json: &str) -> RepositoryResult<()> {
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_index(path: &PathBuf, mut index: Vec<SessionSummary>) -> RepositoryResult<()> {
    index.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    write_atomically(path, &serde_json::to_string_pretty(&index)?)
}

impl SessionRepository for JsonSessionRepository {
    fn list_sessions(&self) -> BoxFuture<'static, RepositoryResult<Vec<SessionSummary>>> {
        let index_path = self.index_path();
        Box::pin(async move { read_index(&index_path) })
    }

    fn load_session(
        &self,
        id: &str,
    ) -> BoxFuture<'static, RepositoryResult<Option<SessionRecord>>> {
        let path = self.session_path(id);
        Box::pin(async move {
            if !path.exists() {
                return Ok(None);
            }
            let content = std::fs::read_to_string(&path)?;
            let record: SessionRecord = serde_json::from_str(&content)?;
            Ok(Some(record))
        })
    }

    fn save_session(
        &self,
        id: &str,
        record: SessionRecord,
    ) -> BoxFuture<'static, RepositoryResult<()>> {
        let sessions_dir = self.sessions_dir.clone();
        let path = self.session_path(id);
        let index_path = self.index_path();
        let id = id.to_string();

        Box::pin(async move {
            std::fs::create_dir_all(&sessions_dir)?;

            write_atomically(&path, &serde_json::to_string_pretty(&record)?)?;

            let mut index = read_index(&index_path)?;
            let summary = record.summary();
            match index.iter_mut().find(|s| s.id == id) {
                Some(existing) => *existing = summary,
                None => index.push(summary),
            }
            write_index(&index_path, index)
        })
    }

    fn delete_session(&self, id: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.session_path(id);
        let index_path = self.index_path();
        let id = id.to_string();

        Box::pin(async move {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            let mut index = read_index(&index_path)?;
            index.retain(|s| s.id != id);
            if index_path.exists() {
                write_index(&index_path, index)?;
            }
            Ok(())
        })
    }

    fn rename_session(&self, id: &str, title: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.session_path(id);
        let index_path = self.index_path();
        let id = id.to_string();
        let title = title.to_string();

        Box::pin(async move {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                let mut record: SessionRecord = serde_json::from_str(&content)?;
                record.title = title.clone();
                write_atomically(&path, &serde_json::to_string_pretty(&record)?)?;
            }

            let mut index = read_index(&index_path)?;
            if let Some(summary) = index.iter_mut().find(|s| s.id == id) {
                summary.title = title;
                write_index(&index_path, index)?;
            }
            Ok(())
        })
    }
}
