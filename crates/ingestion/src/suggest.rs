//! Completion input derived from page titles

/// Words of the title kept in the suggestion
const SUGGESTION_WORDS: usize = 2;

/// First two title words followed by "..."; `None` for a blank title
pub fn generate_suggestion(title: &str) -> Option<String> {
    let words: Vec<&str> = title.split_whitespace().take(SUGGESTION_WORDS).collect();
    if words.is_empty() {
        return None;
    }
    Some(format!("{}...", words.join(" ")))
}
