//! Server list parsing.

use crate::models::ServerReference;

/// What a single list line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    /// Blank line or `#` comment
    Skip,
    /// `[Country]` section header
    Country(&'a str),
    /// `"City"` sub-header
    City(&'a str),
    /// Server entry; the payload is its name (first whitespace-separated token)
    Server(&'a str),
}

pub(crate) fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return LineKind::Skip;
    }
    if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
        return LineKind::Country(&line[1..line.len() - 1]);
    }
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        return LineKind::City(&line[1..line.len() - 1]);
    }
    if line.starts_with('[') || line.starts_with('"') {
        return LineKind::Skip;
    }
    match line.split_whitespace().next() {
        Some(name) => LineKind::Server(name),
        None => LineKind::Skip,
    }
}

/// Parses a server or relay list into references, in file order.
///
/// Server lines seen before the first `[Country]` header are ignored. A city
/// applies until the next city or country header.
pub fn parse_server_list(text: &str) -> Vec<ServerReference> {
    let mut references = Vec::new();
    let mut country: Option<&str> = None;
    let mut city: Option<&str> = None;

    for line in text.lines() {
        match classify_line(line) {
            LineKind::Skip => {}
            LineKind::Country(name) => {
                country = Some(name);
                city = None;
            }
            LineKind::City(name) => city = Some(name),
            LineKind::Server(name) => {
                let Some(country) = country else {
                    log::debug!("Ignoring '{}' outside any country section", name);
                    continue;
                };
                references.push(ServerReference {
                    name: name.to_string(),
                    group_country: Some(country.to_string()),
                    group_city: city.map(str::to_string),
                });
            }
        }
    }

    references
}
