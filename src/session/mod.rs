//! Browser session abstraction.
//!
//! The extraction pipeline never talks to WebDriver directly. It drives a
//! `BrowserSession`, a small set of DOM-level primitives over one live page.
//! `webdriver::WebDriverSession` implements it over a `fantoccini` client; tests
//! implement it with a scripted in-memory page.
//!
//! Expected negative outcomes (no element found, empty text, element not
//! displayed) are plain values. `SessionError` is reserved for failures the
//! error classifier should look at.

pub mod webdriver;

use std::fmt;

use async_trait::async_trait;

use crate::error_handling::SessionError;

pub use webdriver::WebDriverSession;

/// How to find elements: a CSS selector or an XPath expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// The raw selector or expression.
    pub fn query(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Ways to activate (click) an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum ActivationMethod {
    /// WebDriver element click
    NativeClick,
    /// Pointer moved onto the element, then pressed and released
    PointerClick,
    /// `click()` dispatched from a script
    ScriptClick,
    /// Enter key sent to the element
    KeyEnter,
    /// Space key sent to the element
    KeySpace,
}

impl ActivationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationMethod::NativeClick => "native click",
            ActivationMethod::PointerClick => "pointer click",
            ActivationMethod::ScriptClick => "script click",
            ActivationMethod::KeyEnter => "enter key",
            ActivationMethod::KeySpace => "space key",
        }
    }
}

/// Where to read an element's text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum TextSource {
    /// Rendered, visible text as WebDriver reports it
    Rendered,
    TextContent,
    InnerText,
    /// Raw markup; callers strip tags themselves
    InnerHtml,
}

impl TextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSource::Rendered => "rendered text",
            TextSource::TextContent => "textContent",
            TextSource::InnerText => "innerText",
            TextSource::InnerHtml => "innerHTML",
        }
    }
}

/// Keys sent to the page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
}

/// A live, scriptable browser page.
///
/// All methods take `&self`; the session is driven by one caller at a time.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opaque handle to an element on the page.
    type Element: Clone + Send + Sync + fmt::Debug;

    /// All elements on the page matching `locator`, in document order.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, SessionError>;

    /// All descendants of `root` matching `locator`, in document order.
    async fn find_within(
        &self,
        root: &Self::Element,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, SessionError>;

    /// Whether the element is rendered and has a non-zero size.
    async fn is_displayed(&self, element: &Self::Element) -> Result<bool, SessionError>;

    /// Scrolls the element to the center of the viewport.
    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), SessionError>;

    async fn activate(
        &self,
        element: &Self::Element,
        method: ActivationMethod,
    ) -> Result<(), SessionError>;

    /// Text of the element from the given source; may be empty.
    async fn read_text(
        &self,
        element: &Self::Element,
        source: TextSource,
    ) -> Result<String, SessionError>;

    /// Sends a key to the page body.
    async fn press_key(&self, key: Key) -> Result<(), SessionError>;

    /// Clicks a point just outside the element's bounding box.
    async fn click_outside(&self, element: &Self::Element) -> Result<(), SessionError>;

    /// `document.readyState`.
    async fn ready_state(&self) -> Result<String, SessionError>;

    /// Visible text of the whole page.
    async fn page_text(&self) -> Result<String, SessionError>;

    /// Evaluates a script returning a boolean; non-boolean results count as false.
    async fn eval_bool(&self, script: &str) -> Result<bool, SessionError>;

    async fn current_url(&self) -> Result<String, SessionError>;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    async fn reload(&self) -> Result<(), SessionError>;

    /// Clears cookies, local storage and session storage.
    async fn clear_storage(&self) -> Result<(), SessionError>;
}

/// First element matching `locator` that reports itself displayed.
pub async fn first_displayed<S: BrowserSession + ?Sized>(
    session: &S,
    locator: &Locator,
) -> Result<Option<S::Element>, SessionError> {
    let candidates = session.find_all(locator).await?;
    pick_displayed(session, candidates).await
}

/// First displayed descendant of `root` matching `locator`.
pub async fn first_displayed_within<S: BrowserSession + ?Sized>(
    session: &S,
    root: &S::Element,
    locator: &Locator,
) -> Result<Option<S::Element>, SessionError> {
    let candidates = session.find_within(root, locator).await?;
    pick_displayed(session, candidates).await
}

async fn pick_displayed<S: BrowserSession + ?Sized>(
    session: &S,
    candidates: Vec<S::Element>,
) -> Result<Option<S::Element>, SessionError> {
    for element in candidates {
        match session.is_displayed(&element).await {
            Ok(true) => return Ok(Some(element)),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            // Candidates can go stale while the table re-renders
            Err(e) => log::debug!("Skipping candidate {:?}: {}", element, e),
        }
    }
    Ok(None)
}
