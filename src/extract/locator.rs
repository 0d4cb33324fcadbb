//! Element locator.
//!
//! Finds the element carrying a server name by trying XPath strategies from the
//! most specific (first cell of a table row, exact text) to the broadest
//! (substring anywhere in the document). Every strategy returns the first
//! *displayed* match; later strategies run only when earlier ones found nothing
//! visible.

use crate::error_handling::SessionError;
use crate::session::{first_displayed, first_displayed_within, BrowserSession, Locator};

/// One way of turning a server name into a locator.
#[derive(Debug, Clone, Copy)]
pub struct LocatorStrategy {
    pub name: &'static str,
    build: fn(&str) -> String,
}

impl LocatorStrategy {
    /// XPath locator for `identifier`, relative to the search root.
    pub fn locator(&self, identifier: &str) -> Locator {
        Locator::XPath((self.build)(&xpath_literal(identifier)))
    }
}

/// Locator strategies in the order they are tried.
pub const LOCATOR_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "table-first-cell-exact",
        build: |lit| format!(".//table//tbody/tr/td[1][normalize-space(.)={lit}]"),
    },
    LocatorStrategy {
        name: "cell-exact",
        build: |lit| {
            format!(
                ".//td[normalize-space(.)={lit}] | .//span[normalize-space(.)={lit}] | .//a[normalize-space(.)={lit}]"
            )
        },
    },
    LocatorStrategy {
        name: "cell-contains",
        build: |lit| {
            format!(
                ".//td[contains(., {lit})] | .//span[contains(., {lit})] | .//a[contains(., {lit})]"
            )
        },
    },
    LocatorStrategy {
        name: "document-contains",
        // Any text node, not just the first: names often follow an icon
        build: |lit| format!(".//body//*[text()[contains(., {lit})]]"),
    },
];

/// An element found by the locator, with the strategy that found it.
#[derive(Debug, Clone)]
pub struct LocatedElement<E> {
    pub element: E,
    pub strategy: &'static str,
}

/// Quotes `value` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so a value containing both quote kinds is
/// built with `concat()`.
///
/// # Examples
///
/// ```
/// use dnscrypt_refresh::extract::xpath_literal;
///
/// assert_eq!(xpath_literal("fast-dns"), "'fast-dns'");
/// assert_eq!(xpath_literal("it's"), "\"it's\"");
/// ```
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect::<Vec<_>>()
            .join(", \"'\", ");
        format!("concat({})", parts)
    }
}

/// Finds the element for `identifier` below `root`, or in the whole page when
/// `root` is `None`.
///
/// # Returns
///
/// `Ok(None)` when no strategy finds a displayed element. That is an expected
/// outcome, not an error.
pub async fn locate<S: BrowserSession + ?Sized>(
    session: &S,
    root: Option<&S::Element>,
    identifier: &str,
) -> Result<Option<LocatedElement<S::Element>>, SessionError> {
    for strategy in LOCATOR_STRATEGIES {
        let locator = strategy.locator(identifier);
        let found = match root {
            Some(root) => first_displayed_within(session, root, &locator).await?,
            None => first_displayed(session, &locator).await?,
        };
        if let Some(element) = found {
            log::debug!("Located '{}' with strategy {}", identifier, strategy.name);
            return Ok(Some(LocatedElement {
                element,
                strategy: strategy.name,
            }));
        }
        log::trace!("Strategy {} found nothing for '{}'", strategy.name, identifier);
    }
    Ok(None)
}
