//! Utilities for sanitizing page text and error messages before logging or
//! persisting them.
//!
//! Detail-dialog text and WebDriver error messages can be long and contain
//! control characters; these helpers keep log lines and the metrics history
//! readable.

use crate::config::MAX_LOGGED_TEXT_LENGTH;

/// Removes control characters (0x00-0x1F except tab, newline and carriage
/// return) from a message.
pub fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| {
            let code = *c as u32;
            code >= 0x20 || code == 0x09 || code == 0x0A || code == 0x0D
        })
        .collect()
}

/// Single-line, length-bounded rendering of arbitrary text for log output.
///
/// # Arguments
///
/// * `text` - Text to render (page text, dialog contents, error messages)
///
/// # Returns
///
/// The sanitized text with whitespace runs collapsed to one space, cut at
/// `MAX_LOGGED_TEXT_LENGTH` characters with a truncation note appended.
pub fn preview(text: &str) -> String {
    let collapsed = sanitize_message(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let length = collapsed.chars().count();
    if length > MAX_LOGGED_TEXT_LENGTH {
        let kept: String = collapsed.chars().take(MAX_LOGGED_TEXT_LENGTH).collect();
        format!("{}... (truncated, original length: {} chars)", kept, length)
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_message_removes_control_chars() {
        let input = "Error\x00message\x01with\x02control\x03chars";
        assert_eq!(sanitize_message(input), "Errormessagewithcontrolchars");
    }

    #[test]
    fn test_sanitize_message_preserves_newlines_and_unicode() {
        let input = "Адрес\n1.2.3.4\t✓";
        assert_eq!(sanitize_message(input), input);
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview("Address:\n   1.2.3.4\t DNSCrypt"), "Address: 1.2.3.4 DNSCrypt");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "✓".repeat(MAX_LOGGED_TEXT_LENGTH + 10);
        let rendered = preview(&long);
        assert!(rendered.starts_with(&"✓".repeat(MAX_LOGGED_TEXT_LENGTH)));
        assert!(rendered.ends_with(&format!(
            "(truncated, original length: {} chars)",
            MAX_LOGGED_TEXT_LENGTH + 10
        )));
    }

    #[test]
    fn test_preview_empty() {
        assert_eq!(preview(""), "");
    }
}
