/// Title used before any content exists to derive one from.
pub const DEFAULT_TITLE: &str = "Nouvelle discussion";

const MAX_TITLE_CHARS: usize = 40;
const TITLE_WORD_COUNT: usize = 6;

/// Derive a conversation title from the first user message: the first six
/// whitespace-separated words joined by single spaces, truncated to 37
/// characters plus an ellipsis when the joined form exceeds 40.
pub fn derive_title(content: &str) -> String {
    let joined = content
        .split_whitespace()
        .take(TITLE_WORD_COUNT)
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    if joined.chars().count() > MAX_TITLE_CHARS {
        let truncated: String = joined.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_six_words() {
        assert_eq!(
            derive_title("Show me all orders from last month please"),
            "Show me all orders from last"
        );
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(derive_title("  bonjour\t le   monde "), "bonjour le monde");
    }

    #[test]
    fn truncates_long_titles_to_37_chars_plus_ellipsis() {
        let title = derive_title(
            "Anticonstitutionnellement interprofessionnelle intergouvernementale oui",
        );
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 40);
    }

    #[test]
    fn short_title_is_left_untouched() {
        assert_eq!(derive_title("SELECT"), "SELECT");
    }

    #[test]
    fn empty_content_falls_back_to_default() {
        assert_eq!(derive_title(""), DEFAULT_TITLE);
        assert_eq!(derive_title("   "), DEFAULT_TITLE);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let title = derive_title(&"é".repeat(50));
        assert_eq!(title.chars().count(), 40);
        assert!(title.ends_with("..."));
    }
}
