//! `BrowserSession` over a WebDriver client.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::Client;
use serde_json::Value;

use super::{ActivationMethod, BrowserSession, Key, Locator, TextSource};
use crate::error_handling::SessionError;

// WebDriver key codepoints
const KEY_ENTER: &str = "\u{E007}";
const KEY_SPACE: &str = "\u{E00D}";
const KEY_ESCAPE: &str = "\u{E00C}";

const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({block: 'center', inline: 'center'});";

const SCRIPT_CLICK_SCRIPT: &str = "arguments[0].click();";

// Emulates a pointer moving onto the element before pressing it
const POINTER_CLICK_SCRIPT: &str = r#"
const el = arguments[0];
const r = el.getBoundingClientRect();
const opts = {bubbles: true, cancelable: true, view: window,
              clientX: r.left + r.width / 2, clientY: r.top + r.height / 2};
for (const type of ['pointerover', 'mouseover', 'pointermove', 'mousemove',
                    'pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click']) {
    const Ctor = type.startsWith('pointer') && window.PointerEvent ? PointerEvent : MouseEvent;
    el.dispatchEvent(new Ctor(type, opts));
}
"#;

const CLICK_OUTSIDE_SCRIPT: &str = r#"
const r = arguments[0].getBoundingClientRect();
const x = r.left > 10 ? r.left - 10 : Math.min(r.right + 10, window.innerWidth - 1);
const y = r.top > 10 ? r.top - 10 : Math.min(r.bottom + 10, window.innerHeight - 1);
const target = document.elementFromPoint(x, y) || document.body;
const opts = {bubbles: true, cancelable: true, view: window, clientX: x, clientY: y};
for (const type of ['mousedown', 'mouseup', 'click']) {
    target.dispatchEvent(new MouseEvent(type, opts));
}
"#;

const CLEAR_STORAGE_SCRIPT: &str =
    "try { window.localStorage.clear(); } catch (e) {} try { window.sessionStorage.clear(); } catch (e) {}";

/// Markers in WebDriver error messages meaning the session is gone.
const SESSION_LOST_MARKERS: &[&str] = &[
    "invalid session id",
    "no such window",
    "session deleted",
    "chrome not reachable",
    "disconnected",
    "target window already closed",
];

/// A `fantoccini` client wrapped as a `BrowserSession`.
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Ends the WebDriver session and closes the browser window.
    pub async fn close(self) -> Result<(), SessionError> {
        self.client.close().await.map_err(map_cmd_error)
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        self.client
            .execute(script, args)
            .await
            .map_err(map_cmd_error)
    }

    async fn execute_on(&self, script: &str, element: &Element) -> Result<Value, SessionError> {
        let arg = serde_json::to_value(element)
            .map_err(|e| SessionError::Command(format!("cannot serialize element: {}", e)))?;
        self.execute(script, vec![arg]).await
    }

    async fn body(&self) -> Result<Element, SessionError> {
        self.client
            .find(fantoccini::Locator::Css("body"))
            .await
            .map_err(map_cmd_error)
    }
}

/// Maps a WebDriver command error onto `SessionError`.
fn map_cmd_error(error: CmdError) -> SessionError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if SESSION_LOST_MARKERS.iter().any(|m| lowered.contains(m)) {
        SessionError::SessionLost(message)
    } else if lowered.contains("javascript error") {
        SessionError::Script(message)
    } else if matches!(error, CmdError::WaitTimeout) {
        SessionError::Timeout(message)
    } else {
        SessionError::Command(message)
    }
}

fn to_fantoccini(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = Element;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, SessionError> {
        match self.client.find_all(to_fantoccini(locator)).await {
            Ok(elements) => Ok(elements),
            Err(e) if e.is_no_such_element() => Ok(Vec::new()),
            Err(e) => Err(map_cmd_error(e)),
        }
    }

    async fn find_within(
        &self,
        root: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, SessionError> {
        match root.find_all(to_fantoccini(locator)).await {
            Ok(elements) => Ok(elements),
            Err(e) if e.is_no_such_element() => Ok(Vec::new()),
            Err(e) => Err(map_cmd_error(e)),
        }
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool, SessionError> {
        element.is_displayed().await.map_err(map_cmd_error)
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<(), SessionError> {
        self.execute_on(SCROLL_INTO_VIEW_SCRIPT, element).await?;
        Ok(())
    }

    async fn activate(&self, element: &Element, method: ActivationMethod) -> Result<(), SessionError> {
        match method {
            ActivationMethod::NativeClick => element.click().await.map_err(map_cmd_error),
            ActivationMethod::PointerClick => {
                self.execute_on(POINTER_CLICK_SCRIPT, element).await?;
                Ok(())
            }
            ActivationMethod::ScriptClick => {
                self.execute_on(SCRIPT_CLICK_SCRIPT, element).await?;
                Ok(())
            }
            ActivationMethod::KeyEnter => element.send_keys(KEY_ENTER).await.map_err(map_cmd_error),
            ActivationMethod::KeySpace => element.send_keys(KEY_SPACE).await.map_err(map_cmd_error),
        }
    }

    async fn read_text(&self, element: &Element, source: TextSource) -> Result<String, SessionError> {
        match source {
            TextSource::Rendered => element.text().await.map_err(map_cmd_error),
            TextSource::TextContent => {
                let value = self
                    .execute_on("return arguments[0].textContent;", element)
                    .await?;
                Ok(value.as_str().unwrap_or_default().to_string())
            }
            TextSource::InnerText => {
                let value = self
                    .execute_on("return arguments[0].innerText;", element)
                    .await?;
                Ok(value.as_str().unwrap_or_default().to_string())
            }
            TextSource::InnerHtml => element.html(true).await.map_err(map_cmd_error),
        }
    }

    async fn press_key(&self, key: Key) -> Result<(), SessionError> {
        let body = self.body().await?;
        let keys = match key {
            Key::Escape => KEY_ESCAPE,
        };
        body.send_keys(keys).await.map_err(map_cmd_error)
    }

    async fn click_outside(&self, element: &Element) -> Result<(), SessionError> {
        self.execute_on(CLICK_OUTSIDE_SCRIPT, element).await?;
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, SessionError> {
        let value = self.execute("return document.readyState;", vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_text(&self) -> Result<String, SessionError> {
        let value = self
            .execute(
                "return document.body ? document.body.innerText : '';",
                vec![],
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, SessionError> {
        let value = self.execute(script, vec![]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(map_cmd_error)
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.client.goto(url).await.map_err(map_cmd_error)
    }

    async fn reload(&self) -> Result<(), SessionError> {
        self.client.refresh().await.map_err(map_cmd_error)
    }

    async fn clear_storage(&self) -> Result<(), SessionError> {
        self.client.delete_all_cookies().await.map_err(map_cmd_error)?;
        self.execute(CLEAR_STORAGE_SCRIPT, vec![]).await?;
        Ok(())
    }
}
