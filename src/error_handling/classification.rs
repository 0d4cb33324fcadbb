//! Error classification.
//!
//! Maps an error message onto one of the recoverable `ErrorCategory` values by
//! lower-casing it and testing disjoint keyword sets in a fixed order.

use super::types::ErrorCategory;

/// Markers that mean the page is still showing an anti-bot interstitial. Also
/// the `AntiBotChallenge` keyword set.
pub const CHALLENGE_MARKERS: &[&str] = &[
    "cloudflare",
    "checking your browser",
    "security check",
    "bot protection",
];

/// Keyword sets in classification order. `Unclassified` has no keywords and is
/// the fallback.
const CATEGORY_KEYWORDS: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::AntiBotChallenge, CHALLENGE_MARKERS),
    (
        ErrorCategory::RateLimited,
        &["too many requests", "rate limit", "throttled"],
    ),
    (
        ErrorCategory::StaleContent,
        &["no data available", "loading", "please wait"],
    ),
    (
        ErrorCategory::TransientNetwork,
        &["network error", "connection timeout", "dns error"],
    ),
    (
        ErrorCategory::ScriptFault,
        &["script error", "uncaught", "is not a function"],
    ),
];

/// Classifies an error message.
///
/// # Arguments
///
/// * `message` - Any error text; case is ignored
///
/// # Returns
///
/// The first category whose keyword set matches, or `Unclassified`.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Unclassified)
}

/// Classifies any displayable error by its message.
pub fn classify_error<E: std::fmt::Display + ?Sized>(error: &E) -> ErrorCategory {
    classify_message(&error.to_string())
}

/// Whether page text still shows an anti-bot challenge.
pub fn shows_challenge(page_text: &str) -> bool {
    let lowered = page_text.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lowered.contains(m))
}
