//! Structured field extraction from detail-dialog text.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{ExtractedServerInfo, Protocol, ServerFlags};

use super::ip::extract_ipv4;

/// Protocol labels in priority order. The relay label contains the plain
/// DNSCrypt label, so it must be checked first.
const PROTOCOL_LABELS: &[(&str, Protocol)] = &[
    ("DNSCrypt relay", Protocol::DNSCryptRelay),
    ("DNSCrypt", Protocol::DNSCrypt),
    ("DoH", Protocol::DoH),
    ("DNS-over-HTTPS", Protocol::DoH),
    ("DoT", Protocol::DoT),
    ("DNS-over-TLS", Protocol::DoT),
];

// "no filter" also covers "no filtering", "no log" covers "no logs"/"no logging".
const DNSSEC_KEYWORDS: &[&str] = &["dnssec"];
const NO_FILTER_KEYWORDS: &[&str] = &["no filter"];
const NO_LOG_KEYWORDS: &[&str] = &["no log"];

/// Tokens the page renders next to a flag label when the flag is set.
const AFFIRMATIVE_TOKENS: &[&str] = &["true", "yes", "✓", "✔", "✅", "enabled"];

static NAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    match Regex::new(r"\b(?:Server|Name|Hostname):[ \t]*([^\s|,;]+)") {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Failed to compile server name pattern: {}", e);
            None
        }
    }
});

/// Parses dialog text into a server record.
///
/// # Arguments
///
/// * `raw_text` - Text read from the detail dialog
/// * `fallback_name` - Identifier used to reach the dialog; used unless the
///   text carries an explicit `Server:` / `Name:` / `Hostname:` label
///
/// # Returns
///
/// Always returns a record. `ip_address` is `None` when no octet-valid
/// address was found; callers treat that as an extraction failure.
pub fn parse_server_info(raw_text: &str, fallback_name: &str) -> ExtractedServerInfo {
    let name = parse_labeled_name(raw_text).unwrap_or_else(|| fallback_name.to_string());

    ExtractedServerInfo {
        name,
        ip_address: extract_ipv4(raw_text),
        protocol: parse_protocol(raw_text),
        flags: parse_flags(raw_text),
    }
}

/// Detects the protocol by case-sensitive substring checks in priority order.
pub fn parse_protocol(text: &str) -> Protocol {
    PROTOCOL_LABELS
        .iter()
        .find(|(label, _)| text.contains(label))
        .map(|(_, protocol)| *protocol)
        .unwrap_or(Protocol::Unknown)
}

/// Detects the three boolean flags.
///
/// A flag is set only when one of its keywords AND an affirmative token both
/// appear in the lower-cased text. The check spans the whole text, not the
/// neighbourhood of the keyword.
pub fn parse_flags(text: &str) -> ServerFlags {
    let lowered = text.to_lowercase();
    let affirmative = AFFIRMATIVE_TOKENS
        .iter()
        .any(|token| lowered.contains(token));
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    ServerFlags {
        dnssec: affirmative && has_any(DNSSEC_KEYWORDS),
        no_filters: affirmative && has_any(NO_FILTER_KEYWORDS),
        no_logs: affirmative && has_any(NO_LOG_KEYWORDS),
    }
}

/// Returns the value of the first `Server:`, `Name:` or `Hostname:` label.
pub fn parse_labeled_name(text: &str) -> Option<String> {
    let pattern = NAME_PATTERN.as_ref()?;
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
