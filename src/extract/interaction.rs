//! Interaction engine: activates a located element and waits for its detail
//! dialog.

use std::sync::LazyLock;

use strum::IntoEnumIterator;
use tokio::time::Instant;

use super::detail::extract_text;
use crate::config::ExtractionSettings;
use crate::error_handling::SessionError;
use crate::session::{ActivationMethod, BrowserSession, Locator};
use crate::utils::poll_until;

/// CSS selectors for an open detail dialog, most specific first.
pub const DIALOG_SELECTORS: &[&str] = &[
    ".v-overlay__content .v-card",
    ".v-dialog--active .v-card",
    ".v-menu--active .v-card",
    ".v-dialog.v-dialog--active .v-card",
    ".v-menu__content--active .v-card",
    "[role='dialog'][aria-hidden='false'] .v-card",
    "[role='dialog'][aria-hidden='false']",
    "[role='dialog']",
    ".modal.show .modal-content",
    ".popup-content.active",
];

/// XPath fallback for dialogs that are shown through inline styles only.
pub const DIALOG_XPATH_FALLBACK: &str = "//div[contains(@class, 'v-dialog') and contains(@style, 'display') and not(contains(@style, 'none'))]//div[contains(@class, 'v-card')]";

/// Every dialog locator in probe order.
pub static DIALOG_LOCATORS: LazyLock<Vec<Locator>> = LazyLock::new(|| {
    DIALOG_SELECTORS
        .iter()
        .map(|s| Locator::css(*s))
        .chain(std::iter::once(Locator::xpath(DIALOG_XPATH_FALLBACK)))
        .collect()
});

/// A detail dialog that appeared after activating an element.
#[derive(Debug, Clone)]
pub struct RevealedDetail<E> {
    pub surface: E,
    pub method: ActivationMethod,
}

/// Result of trying to open an element's detail dialog.
#[derive(Debug, Clone)]
pub enum RevealOutcome<E> {
    Revealed(RevealedDetail<E>),
    /// The element is not displayed even after scrolling to it
    NotInteractable,
    /// No activation method opened a dialog in time
    TimedOut,
}

/// First displayed dialog with text in any of its text sources, if any.
///
/// Content that only exists in the DOM (hidden from `innerText`, or markup
/// only) still counts, so the text fallbacks of the detail extractor get a
/// chance to read it.
pub async fn find_open_dialog<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Option<S::Element>, SessionError> {
    for locator in DIALOG_LOCATORS.iter() {
        for candidate in session.find_all(locator).await? {
            match dialog_has_content(session, &candidate).await {
                Ok(true) => return Ok(Some(candidate)),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => log::debug!("Ignoring dialog candidate for {}: {}", locator, e),
            }
        }
    }
    Ok(None)
}

async fn dialog_has_content<S: BrowserSession + ?Sized>(
    session: &S,
    candidate: &S::Element,
) -> Result<bool, SessionError> {
    if !session.is_displayed(candidate).await? {
        return Ok(false);
    }
    Ok(extract_text(session, candidate).await?.is_some())
}

/// Activates `element` and waits for a detail dialog.
///
/// The element is scrolled to the viewport center first. Activation methods are
/// tried in order; after each, the dialog selectors are polled for up to
/// `strategy_probe_timeout`. The first method always runs; later methods run
/// while the overall `dialog_wait_timeout` has time left.
///
/// # Returns
///
/// * `Ok(RevealOutcome::Revealed(_))` - a dialog with text appeared
/// * `Ok(RevealOutcome::NotInteractable)` - the element stayed hidden
/// * `Ok(RevealOutcome::TimedOut)` - no dialog appeared in time
/// * `Err(_)` - a fatal session error, or every activation method failed with
///   an error (the last one is returned for classification)
pub async fn reveal_detail<S: BrowserSession + ?Sized>(
    session: &S,
    element: &S::Element,
    settings: &ExtractionSettings,
) -> Result<RevealOutcome<S::Element>, SessionError> {
    session.scroll_into_view(element).await?;
    if !session.is_displayed(element).await? {
        return Ok(RevealOutcome::NotInteractable);
    }

    let started = Instant::now();
    let mut last_error = None;
    let mut any_activated = false;

    for (index, method) in ActivationMethod::iter().enumerate() {
        let elapsed = started.elapsed();
        if index > 0 && elapsed >= settings.dialog_wait_timeout {
            log::debug!("Dialog wait budget spent after {} methods", index);
            break;
        }

        if let Err(e) = session.activate(element, method).await {
            if e.is_fatal() {
                return Err(e);
            }
            log::debug!("Activation by {} failed: {}", method.as_str(), e);
            last_error = Some(e);
            continue;
        }
        any_activated = true;

        let remaining = settings.dialog_wait_timeout.saturating_sub(elapsed);
        let probe = settings.strategy_probe_timeout.min(remaining);
        let dialog = poll_until(probe, settings.poll_interval, || find_open_dialog(session)).await?;
        if let Some(surface) = dialog {
            log::debug!("Detail dialog opened by {}", method.as_str());
            return Ok(RevealOutcome::Revealed(RevealedDetail { surface, method }));
        }
    }

    match last_error {
        Some(e) if !any_activated => Err(e),
        _ => Ok(RevealOutcome::TimedOut),
    }
}
