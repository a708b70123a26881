use chrono::{DateTime, Utc};

use crate::models::message::{Message, Mode};
use crate::repositories::SessionRecord;

/// A single conversation with the assistant.
///
/// The message sequence is exclusively owned by the controller while a stream
/// is active; external components only read committed snapshots between turns.
pub struct Conversation {
    id: String,
    mode: Mode,
    title: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: String, mode: Mode, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            mode,
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore a conversation from a persisted session record.
    pub fn from_record(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            mode: record.mode,
            title: record.title,
            messages: record.messages,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Snapshot for persistence through the session store.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            mode: self.mode,
            title: self.title.clone(),
            messages: self.messages.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub(crate) fn pop(&mut self) -> Option<Message> {
        let popped = self.messages.pop();
        self.updated_at = Utc::now();
        popped
    }

    /// Replace the last message with a new value. Observers relying on value
    /// identity see a fresh `Message` every delta.
    pub(crate) fn replace_last(&mut self, message: Message) {
        if let Some(last) = self.messages.last_mut() {
            *last = message;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Role;

    #[test]
    fn record_round_trip_preserves_messages() {
        let mut conv = Conversation::new("s-1".into(), Mode::Chat, "Titre".into());
        conv.push(Message::user("bonjour", vec![]));
        conv.push(Message {
            role: Role::Assistant,
            content: "salut".into(),
            images: vec![],
            is_thinking: false,
        });

        let restored = Conversation::from_record(conv.to_record());
        assert_eq!(restored.id(), "s-1");
        assert_eq!(restored.mode(), Mode::Chat);
        assert_eq!(restored.message_count(), 2);
        assert_eq!(restored.messages()[1].content, "salut");
    }
}
