//! Page readiness and accessibility checks.

use crate::config::ExtractionSettings;
use crate::error_handling::{shows_challenge, SessionError};
use crate::session::{first_displayed, BrowserSession, Locator};
use crate::utils::poll_until;

/// Selectors for the server results table, most specific first.
pub const RESULTS_TABLE_SELECTORS: &[&str] = &[
    ".v-data-table table",
    ".v-table table",
    ".v-datatable",
    "table",
];

/// First displayed results table on the page.
pub async fn find_results_table<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Option<S::Element>, SessionError> {
    for selector in RESULTS_TABLE_SELECTORS {
        if let Some(table) = first_displayed(session, &Locator::css(*selector)).await? {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// First results table present on the page, displayed or not.
pub async fn find_any_results_table<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Option<S::Element>, SessionError> {
    for selector in RESULTS_TABLE_SELECTORS {
        if let Some(table) = session
            .find_all(&Locator::css(*selector))
            .await?
            .into_iter()
            .next()
        {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

// Non-fatal errors while probing mean "not yet"
fn not_yet<T>(result: Result<Option<T>, SessionError>) -> Result<Option<T>, SessionError> {
    match result {
        Err(e) if !e.is_fatal() => {
            log::debug!("Readiness probe failed: {}", e);
            Ok(None)
        }
        other => other,
    }
}

async fn document_complete<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Option<()>, SessionError> {
    let state = session.ready_state().await;
    not_yet(state.map(|s| (s == "complete").then_some(())))
}

async fn body_present<S: BrowserSession + ?Sized>(session: &S) -> Result<Option<()>, SessionError> {
    let bodies = session.find_all(&Locator::css("body")).await;
    not_yet(bodies.map(|b| (!b.is_empty()).then_some(())))
}

/// Waits for `document.readyState == "complete"` and a `body` element.
///
/// # Returns
///
/// `Ok(false)` when either wait runs out. Only fatal session errors are
/// returned as errors.
pub async fn wait_for_page_ready<S: BrowserSession + ?Sized>(
    session: &S,
    settings: &ExtractionSettings,
) -> Result<bool, SessionError> {
    let complete = poll_until(settings.page_load_timeout, settings.poll_interval, || {
        document_complete(session)
    })
    .await?;
    if complete.is_none() {
        log::debug!("Document did not reach readyState complete");
        return Ok(false);
    }
    let body = poll_until(settings.element_wait_timeout, settings.poll_interval, || {
        body_present(session)
    })
    .await?;
    Ok(body.is_some())
}

/// Whether the page can be scraped: the document is complete, a results table
/// is present and no anti-bot challenge text is shown.
pub async fn page_is_accessible<S: BrowserSession + ?Sized>(
    session: &S,
    settings: &ExtractionSettings,
) -> Result<bool, SessionError> {
    let timeout = settings.accessibility_check_timeout;
    if poll_until(timeout, settings.poll_interval, || document_complete(session))
        .await?
        .is_none()
    {
        return Ok(false);
    }
    let table = poll_until(timeout, settings.poll_interval, move || async move {
        not_yet(find_any_results_table(session).await)
    })
    .await?;
    if table.is_none() {
        log::debug!("No results table on the page");
        return Ok(false);
    }
    match session.page_text().await {
        Ok(text) => Ok(!shows_challenge(&text)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            log::debug!("Could not read page text: {}", e);
            Ok(false)
        }
    }
}
