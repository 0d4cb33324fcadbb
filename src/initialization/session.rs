//! Browser session provisioning.

use fantoccini::ClientBuilder;
use serde_json::{json, Map, Value};

use crate::config::ExtractionSettings;
use crate::error_handling::{InitializationError, SessionError};
use crate::recovery::{page_is_accessible, select_all_rows, wait_for_page_ready};
use crate::session::{BrowserSession, WebDriverSession};

/// Chrome arguments for an unattended scraping session.
const CHROME_ARGS: &[&str] = &[
    "--window-size=1920,1080",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-blink-features=AutomationControlled",
    "--lang=en-US",
];

/// WebDriver capabilities for Chrome, optionally headless.
pub fn chrome_capabilities(headless: bool) -> Map<String, Value> {
    let mut args: Vec<&str> = CHROME_ARGS.to_vec();
    if headless {
        args.push("--headless=new");
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("acceptInsecureCerts".to_string(), json!(true));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": args,
            "excludeSwitches": ["enable-automation"],
        }),
    );
    caps
}

/// Opens a WebDriver session, navigates to `page_url` and waits for the page.
///
/// # Arguments
///
/// * `webdriver_url` - WebDriver endpoint (chromedriver)
/// * `page_url` - Page to open
/// * `headless` - Run Chrome without a window
/// * `settings` - Timeouts for the readiness wait
///
/// # Errors
///
/// `InitializationError::SessionError` if the endpoint cannot be reached or
/// navigation fails, `PageNotReady` if the page never finishes loading. The
/// session is closed before returning an error.
pub async fn connect_session(
    webdriver_url: &str,
    page_url: &str,
    headless: bool,
    settings: &ExtractionSettings,
) -> Result<WebDriverSession, InitializationError> {
    log::info!(
        "Connecting to WebDriver at {} (headless: {})",
        webdriver_url,
        headless
    );
    let client = ClientBuilder::native()
        .capabilities(chrome_capabilities(headless))
        .connect(webdriver_url)
        .await
        .map_err(|e| SessionError::Connect(e.to_string()))?;
    let session = WebDriverSession::new(client);

    match prepare_page(&session, page_url, settings).await {
        Ok(()) => Ok(session),
        Err(e) => {
            if let Err(close_err) = session.close().await {
                log::debug!("Failed to close session after setup error: {}", close_err);
            }
            Err(e)
        }
    }
}

/// Opens `page_url`, waits for it and switches the table to show all rows.
///
/// # Errors
///
/// `PageNotReady` if the page never finishes loading, or the session error of
/// a failed navigation.
pub async fn prepare_page<S: BrowserSession + ?Sized>(
    session: &S,
    page_url: &str,
    settings: &ExtractionSettings,
) -> Result<(), InitializationError> {
    log::info!("Opening {}", page_url);
    session.navigate(page_url).await?;
    if !wait_for_page_ready(session, settings).await? {
        return Err(InitializationError::PageNotReady(page_url.to_string()));
    }
    // A challenge page is left to the recovery procedures of the first attempt
    if !page_is_accessible(session, settings).await? {
        log::warn!("Page loaded but the server table is not accessible yet");
    }
    select_all_rows(session, settings).await?;
    Ok(())
}
