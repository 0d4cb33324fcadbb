//! Markup-to-text fallback.

use scraper::Html;

/// Strips tags from an HTML fragment and collapses whitespace.
///
/// Used as the last text-retrieval strategy for a detail dialog, when the
/// rendered text and the DOM text properties all came back empty. The output
/// is noisier than rendered text (hidden nodes are included), which is fine
/// for the pattern-based field parser.
pub fn strip_markup(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let text: Vec<&str> = fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect();
    text.join(" ")
}
