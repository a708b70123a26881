use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Specialized assistant behavior, fixed per conversation at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sql,
    Email,
    Wiki,
    Chat,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sql => "sql",
            Mode::Email => "email",
            Mode::Wiki => "wiki",
            Mode::Chat => "chat",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in a conversation.
///
/// For an in-progress assistant message `content` grows by append until the
/// turn reaches a terminal state. `is_thinking` is true only between placeholder
/// creation and the first delta (or terminal state). Both transient concerns
/// are kept off the wire/persisted form: `is_thinking` is skipped when false
/// and `images` when empty, so serialized messages keep the
/// `{role, content, images?}` shape the backend expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Base64-encoded image attachments (user messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(
        default,
        rename = "isThinking",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_thinking: bool,
}

impl Message {
    pub fn user(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images,
            is_thinking: false,
        }
    }

    /// The placeholder appended on send, before any content arrives.
    pub fn thinking_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            images: Vec::new(),
            is_thinking: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_message_keeps_wire_shape() {
        let msg = Message::user("hello", vec![]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn images_survive_round_trip() {
        let msg = Message::user("look", vec!["aGVsbG8=".to_string()]);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.images.len(), 1);
        assert!(!back.is_thinking);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Mode::Sql).unwrap(), "sql");
        assert_eq!(Mode::Wiki.to_string(), "wiki");
    }
}
