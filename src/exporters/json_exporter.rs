use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::exporters::types::{ConversationExport, ImportError};
use crate::models::conversation::Conversation;
use crate::models::message::{Message, Mode};
use crate::repositories::SessionRecord;

/// Serialize a conversation to the portable JSON export shape.
pub fn conversation_to_json(conversation: &Conversation) -> serde_json::Result<String> {
    let export = ConversationExport {
        mode: conversation.mode(),
        title: format!("Conversation Pstral - {}", conversation.mode()),
        exported_at: Utc::now(),
        messages: conversation.messages().to_vec(),
    };
    serde_json::to_string_pretty(&export)
}

/// Parse an exported conversation back into a fresh session record.
///
/// Validation is shallow on purpose: a `messages` array and a `mode` are
/// required, everything else is optional. The title falls back to
/// `"Discussion {mode} Importée"` when absent or empty.
pub fn import_conversation(json: &str) -> Result<SessionRecord, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    let Some(raw_messages) = value.get("messages").and_then(|m| m.as_array()) else {
        return Err(ImportError::InvalidFormat);
    };
    let Some(mode_value) = value.get("mode").filter(|m| !m.is_null()) else {
        return Err(ImportError::InvalidFormat);
    };

    let mode: Mode =
        serde_json::from_value(mode_value.clone()).map_err(|_| ImportError::InvalidFormat)?;
    let messages: Vec<Message> = serde_json::from_value(serde_json::Value::Array(
        raw_messages.clone(),
    ))
    .map_err(|_| ImportError::InvalidFormat)?;

    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Discussion {mode} Importée"));

    debug!(%mode, message_count = messages.len(), "Imported conversation");

    let now = Utc::now();
    Ok(SessionRecord {
        id: Uuid::new_v4().to_string(),
        mode,
        title,
        messages,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Role;

    #[test]
    fn export_includes_mode_and_messages() {
        let mut conv = Conversation::new("s-1".into(), Mode::Email, "Brouillon".into());
        conv.push(Message::user("écris un mail", vec![]));

        let json = conversation_to_json(&conv).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "email");
        assert_eq!(value["title"], "Conversation Pstral - email");
        assert!(value["exportedAt"].is_string());
        assert_eq!(value["messages"][0]["content"], "écris un mail");
    }

    #[test]
    fn import_round_trips_an_export() {
        let mut conv = Conversation::new("s-1".into(), Mode::Sql, "Requête".into());
        conv.push(Message::user("select 1", vec![]));
        conv.push(Message {
            role: Role::Assistant,
            content: "SELECT 1;".into(),
            images: vec![],
            is_thinking: false,
        });

        let record = import_conversation(&conversation_to_json(&conv).unwrap()).unwrap();
        assert_eq!(record.mode, Mode::Sql);
        assert_eq!(record.title, "Conversation Pstral - sql");
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[1].content, "SELECT 1;");
    }

    #[test]
    fn missing_messages_is_invalid_format() {
        let err = import_conversation(r#"{"mode": "chat"}"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidFormat));
    }

    #[test]
    fn messages_must_be_an_array() {
        let err = import_conversation(r#"{"mode": "chat", "messages": "nope"}"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidFormat));
    }

    #[test]
    fn missing_mode_is_invalid_format() {
        let err = import_conversation(r#"{"messages": []}"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidFormat));
    }

    #[test]
    fn missing_title_gets_the_imported_fallback() {
        let record =
            import_conversation(r#"{"mode": "wiki", "messages": []}"#).unwrap();
        assert_eq!(record.title, "Discussion wiki Importée");
    }

    #[test]
    fn not_json_is_a_parse_error() {
        let err = import_conversation("not json at all").unwrap_err();
        assert!(matches!(err, ImportError::ParseFailed(_)));
    }
}
