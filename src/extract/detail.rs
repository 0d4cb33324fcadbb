//! Detail extractor: reads the text of an open dialog and closes it.

use strum::IntoEnumIterator;

use super::interaction::DIALOG_LOCATORS;
use crate::config::ExtractionSettings;
use crate::error_handling::SessionError;
use crate::parse::strip_markup;
use crate::session::{
    first_displayed, first_displayed_within, ActivationMethod, BrowserSession, Key, Locator,
    TextSource,
};
use crate::utils::poll_until;

/// Close-button selectors searched inside an open dialog.
pub const CLOSE_BUTTON_SELECTORS: &[&str] = &[
    ".v-btn[aria-label*='close' i]",
    ".v-icon[aria-label*='close' i]",
    "[aria-label='Close']",
    "[aria-label='close']",
    ".v-btn[data-dismiss]",
    "button[data-dismiss]",
    ".close",
    ".close-btn",
    ".v-card__actions .v-btn",
    ".v-card-actions .v-btn",
];

/// Text read from a dialog and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailText {
    pub text: String,
    pub source: TextSource,
}

/// How a dialog was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMethod {
    EscapeKey,
    CloseButton,
    ClickOutside,
}

/// Reads the dialog text, trying each `TextSource` until one is non-empty.
///
/// Markup read from `innerHTML` is stripped of tags and whitespace-collapsed.
///
/// # Returns
///
/// `Ok(None)` when every source is empty. Errors from individual sources are
/// skipped; if every source errored, the last error is returned.
pub async fn extract_text<S: BrowserSession + ?Sized>(
    session: &S,
    surface: &S::Element,
) -> Result<Option<DetailText>, SessionError> {
    let mut last_error = None;
    let mut any_read = false;

    for source in TextSource::iter() {
        let raw = match session.read_text(surface, source).await {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::debug!("Reading {} failed: {}", source.as_str(), e);
                last_error = Some(e);
                continue;
            }
        };
        any_read = true;

        let text = match source {
            TextSource::InnerHtml => strip_markup(&raw),
            _ => raw.trim().to_string(),
        };
        if !text.is_empty() {
            return Ok(Some(DetailText { text, source }));
        }
    }

    match last_error {
        Some(e) if !any_read => Err(e),
        _ => Ok(None),
    }
}

/// Whether the dialog is no longer shown. A stale handle counts as gone.
async fn is_gone<S: BrowserSession + ?Sized>(
    session: &S,
    surface: &S::Element,
) -> Result<Option<()>, SessionError> {
    match session.is_displayed(surface).await {
        Ok(true) => Ok(None),
        Ok(false) => Ok(Some(())),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok(Some(())),
    }
}

async fn wait_gone<S: BrowserSession + ?Sized>(
    session: &S,
    surface: &S::Element,
    settings: &ExtractionSettings,
) -> Result<bool, SessionError> {
    let gone = poll_until(settings.close_probe_timeout, settings.poll_interval, || {
        is_gone(session, surface)
    })
    .await?;
    Ok(gone.is_some())
}

async fn click_close_button<S: BrowserSession + ?Sized>(
    session: &S,
    surface: &S::Element,
) -> Result<bool, SessionError> {
    for selector in CLOSE_BUTTON_SELECTORS {
        let locator = Locator::css(*selector);
        if let Some(button) = first_displayed_within(session, surface, &locator).await? {
            session
                .activate(&button, ActivationMethod::NativeClick)
                .await?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Closes an open dialog.
///
/// Tries the Escape key, then a close button inside the dialog, then a click
/// outside the dialog's bounding box, checking after each whether the dialog is
/// gone.
///
/// # Returns
///
/// The method that closed it, or `None` when the dialog is still shown. Only
/// fatal session errors are returned as errors; the next locate step dismisses
/// leftover overlays anyway.
pub async fn close_surface<S: BrowserSession + ?Sized>(
    session: &S,
    surface: &S::Element,
    settings: &ExtractionSettings,
) -> Result<Option<CloseMethod>, SessionError> {
    for method in [
        CloseMethod::EscapeKey,
        CloseMethod::CloseButton,
        CloseMethod::ClickOutside,
    ] {
        let attempted = match method {
            CloseMethod::EscapeKey => session.press_key(Key::Escape).await.map(|_| true),
            CloseMethod::CloseButton => click_close_button(session, surface).await,
            CloseMethod::ClickOutside => session.click_outside(surface).await.map(|_| true),
        };
        match attempted {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::debug!("Close by {:?} failed: {}", method, e);
                continue;
            }
        }
        if wait_gone(session, surface, settings).await? {
            log::debug!("Dialog closed by {:?}", method);
            return Ok(Some(method));
        }
    }
    log::warn!("Detail dialog is still open after every close method");
    Ok(None)
}

/// Closes any dialog left open by an earlier attempt.
///
/// # Returns
///
/// Number of dialogs closed.
pub async fn dismiss_overlays<S: BrowserSession + ?Sized>(
    session: &S,
    settings: &ExtractionSettings,
) -> Result<usize, SessionError> {
    let mut closed = 0;
    for locator in DIALOG_LOCATORS.iter() {
        let Some(overlay) = first_displayed(session, locator).await? else {
            continue;
        };
        log::debug!("Dismissing stale overlay matched by {}", locator);
        if close_surface(session, &overlay, settings).await?.is_some() {
            closed += 1;
        }
    }
    Ok(closed)
}
