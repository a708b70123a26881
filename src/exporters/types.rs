use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::message::{Message, Mode};

/// Portable JSON snapshot of one conversation.
///
/// `exported_at` is serialized camelCase so files stay interchangeable with
/// the web client's downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub mode: Mode,
    pub title: String,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    /// The file is not valid JSON at all.
    #[error("Échec de l'importation: {0}")]
    ParseFailed(#[from] serde_json::Error),

    /// Parsed, but missing a `messages` array or a `mode`.
    #[error("Format de fichier invalide.")]
    InvalidFormat,
}
