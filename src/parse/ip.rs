//! IPv4 extraction and validation.

use regex::Regex;
use std::sync::LazyLock;

// Candidates are whole dotted numeric runs so that "1.2.3.4.5" is seen as one
// five-part token (and rejected) instead of yielding "1.2.3.4".
const LABELED_ADDRESS_PATTERN: &str = r"Address:\s*(\d+(?:\.\d+)+)";
const LABELED_IP_PATTERN: &str = r"IP:\s*(\d+(?:\.\d+)+)";
const BARE_DOTTED_PATTERN: &str = r"(\d+(?:\.\d+)+)";

static IP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        LABELED_ADDRESS_PATTERN,
        LABELED_IP_PATTERN,
        BARE_DOTTED_PATTERN,
    ]
    .iter()
    .filter_map(|pattern| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Failed to compile IP pattern '{}': {}", pattern, e);
            None
        }
    })
    .collect()
});

/// Returns true iff `candidate` is exactly four dot-separated decimal octets,
/// each in `0..=255`.
///
/// # Examples
///
/// ```
/// use dnscrypt_refresh::parse::validate_ipv4;
///
/// assert!(validate_ipv4("8.8.8.8"));
/// assert!(!validate_ipv4("999.1.1.1"));
/// assert!(!validate_ipv4("1.2.3"));
/// ```
pub fn validate_ipv4(candidate: &str) -> bool {
    let octets: Vec<&str> = candidate.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    octets.iter().all(|octet| {
        !octet.is_empty()
            && octet.len() <= 3
            && octet.bytes().all(|b| b.is_ascii_digit())
            && octet.parse::<u16>().map(|v| v <= 255).unwrap_or(false)
    })
}

/// Finds the first valid IPv4 address in `text`.
///
/// Patterns are tried in order: `Address:`-labeled, `IP:`-labeled, then any
/// dotted numeric run. Within a pattern every match is validated before it is
/// accepted, so a version string such as `2.0.1.999` never wins over a real
/// address that appears later.
pub fn extract_ipv4(text: &str) -> Option<String> {
    for pattern in IP_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(candidate) = captures.get(1) {
                if validate_ipv4(candidate.as_str()) {
                    return Some(candidate.as_str().to_string());
                }
                log::debug!("Rejected IP candidate '{}'", candidate.as_str());
            }
        }
    }
    None
}
