use crate::models::conversation::Conversation;
use crate::services::sql_service::escape_csv_field;

/// Render a conversation as `role,content` CSV rows, header included.
/// Uses the same quoting rules as the SQL result export.
pub fn conversation_to_csv(conversation: &Conversation) -> String {
    let mut out = String::from("role,content");
    for message in conversation.messages() {
        out.push('\n');
        out.push_str(message.role.as_str());
        out.push(',');
        out.push_str(&escape_csv_field(&message.content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::{Message, Mode, Role};

    #[test]
    fn renders_header_and_rows() {
        let mut conv = Conversation::new("s-1".into(), Mode::Chat, "Titre".into());
        conv.push(Message::user("bonjour", vec![]));
        conv.push(Message {
            role: Role::Assistant,
            content: "salut".into(),
            images: vec![],
            is_thinking: false,
        });

        assert_eq!(
            conversation_to_csv(&conv),
            "role,content\nuser,bonjour\nassistant,salut"
        );
    }

    #[test]
    fn quotes_content_with_commas_and_newlines() {
        let mut conv = Conversation::new("s-1".into(), Mode::Chat, "Titre".into());
        conv.push(Message::user("ligne 1\nligne 2, suite", vec![]));

        assert_eq!(
            conversation_to_csv(&conv),
            "role,content\nuser,\"ligne 1\nligne 2, suite\""
        );
    }

    #[test]
    fn empty_conversation_is_just_the_header() {
        let conv = Conversation::new("s-1".into(), Mode::Wiki, "Titre".into());
        assert_eq!(conversation_to_csv(&conv), "role,content");
    }
}
