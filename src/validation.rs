//! Validation module for user supplied input
//!
//! Album titles come from free text and photo captions, so they are checked
//! in one place before they reach the session or the store.

/// Longest accepted album title, in characters
pub const MAX_TITLE_CHARS: usize = 64;

/// Validates an album title
///
/// # Arguments
/// * `title` - The raw title typed by the user
///
/// # Returns
/// * `Ok(String)` - The trimmed title if valid
/// * `Err(&str)` - Error type: "empty" or "too_long"
///
/// # Examples
/// ```
/// use photo_album_bot::validation::validate_album_title;
///
/// assert_eq!(validate_album_title("  Summer  "), Ok("Summer".to_string()));
/// assert_eq!(validate_album_title("   "), Err("empty"));
/// assert_eq!(validate_album_title(&"a".repeat(65)), Err("too_long"));
/// ```
pub fn validate_album_title(title: &str) -> Result<String, &'static str> {
    // Newlines would break the one-line list buttons
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return Err("empty");
    }

    // Count characters, not bytes, so accented titles get the full budget
    if collapsed.chars().count() > MAX_TITLE_CHARS {
        return Err("too_long");
    }

    Ok(collapsed)
}

/// Shorten text for an inline button label
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_counts_characters() {
        let accented = "é".repeat(MAX_TITLE_CHARS);
        assert_eq!(validate_album_title(&accented), Ok(accented.clone()));
        assert_eq!(validate_album_title(&format!("{accented}é")), Err("too_long"));
    }

    #[test]
    fn test_title_collapses_whitespace() {
        assert_eq!(
            validate_album_title("Road\ntrip   2024"),
            Ok("Road trip 2024".to_string())
        );
    }

    #[test]
    fn test_length_is_checked_after_collapsing() {
        let padded = format!("a{}b", " ".repeat(70));
        assert_eq!(validate_album_title(&padded), Ok("a b".to_string()));

        let words = vec!["word"; 13].join("\n\n"); // 64 chars once collapsed
        assert_eq!(validate_album_title(&words).map(|t| t.chars().count()), Ok(64));
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a very long album title", 10), "a very lo…");
    }
}
