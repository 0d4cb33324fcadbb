// Shared test helpers: a scripted in-memory browser page.
//
// `FakeSession` implements `BrowserSession` over a table of elements. Elements
// are registered under the exact locators that should find them, so a test
// decides which locator strategy succeeds. Activating a trigger element opens
// its dialog (or shows a hidden element, such as a menu entry); Escape, a
// click outside or a close button closes every open dialog. Every `find_all`
// query is logged so tests can assert the order strategies ran in.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use dnscrypt_refresh::error_handling::SessionError;
use dnscrypt_refresh::extract::LOCATOR_STRATEGIES;
use dnscrypt_refresh::recovery::FRAMEWORK_READY_SCRIPT;
use dnscrypt_refresh::session::{ActivationMethod, BrowserSession, Key, Locator, TextSource};
use dnscrypt_refresh::ExtractionSettings;

pub type ElementId = usize;

/// Locator the fake results table is registered under.
pub const TABLE_SELECTOR: &str = ".v-data-table table";
/// Locator every fake dialog is registered under.
pub const DIALOG_SELECTOR: &str = "[role='dialog']";
pub const PAGE_URL: &str = "https://dnscrypt.info/public-servers";

#[derive(Debug, Clone, Default)]
struct ElementState {
    displayed: bool,
    displayed_after_scroll: bool,
    text: String,
    text_overrides: HashMap<TextSource, String>,
    opens: Option<ElementId>,
    opens_with: Option<ActivationMethod>,
    is_dialog: bool,
    open: bool,
    closes_dialogs: bool,
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<ElementState>,
    by_locator: HashMap<Locator, Vec<ElementId>>,
    within: HashMap<(ElementId, Locator), Vec<ElementId>>,
    queries: Vec<Locator>,
    activations: Vec<(ElementId, ActivationMethod)>,
    failures: HashMap<&'static str, VecDeque<SessionError>>,
    ready_state: String,
    page_text: String,
    app_mounted: bool,
    page_size_script_applies: bool,
    scripts: Vec<String>,
    ignore_escape: bool,
    url: String,
    navigations: Vec<String>,
    reloads: usize,
    storage_clears: usize,
    keys: Vec<Key>,
}

pub struct FakeSession {
    state: Mutex<PageState>,
}

impl FakeSession {
    /// A loaded page with a displayed results table and no rows.
    pub fn new() -> Self {
        let session = Self {
            state: Mutex::new(PageState {
                ready_state: "complete".to_string(),
                page_text: "DNSCrypt public servers".to_string(),
                app_mounted: true,
                url: PAGE_URL.to_string(),
                ..Default::default()
            }),
        };
        session.add_element(&[Locator::css(TABLE_SELECTOR)], "", true);
        session.add_element(&[Locator::css("body")], "", true);
        session
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().expect("fake page lock poisoned")
    }

    /// Registers an element findable through each of `locators`.
    pub fn add_element(&self, locators: &[Locator], text: &str, displayed: bool) -> ElementId {
        let mut state = self.state();
        let id = state.elements.len();
        state.elements.push(ElementState {
            displayed,
            text: text.to_string(),
            ..Default::default()
        });
        for locator in locators {
            state.by_locator.entry(locator.clone()).or_default().push(id);
        }
        id
    }

    /// Registers an element found by `locator` inside `parent` only.
    pub fn add_child(&self, parent: ElementId, locator: Locator, text: &str) -> ElementId {
        let id = self.add_element(&[], text, true);
        self.state()
            .within
            .entry((parent, locator))
            .or_default()
            .push(id);
        id
    }

    /// Adds a close button inside `dialog`; activating it closes every dialog.
    pub fn add_close_button(&self, dialog: ElementId) -> ElementId {
        let button = self.add_child(dialog, Locator::css("[aria-label='Close']"), "");
        self.state().elements[button].closes_dialogs = true;
        button
    }

    /// Registers a closed dialog with `text`.
    pub fn add_dialog(&self, text: &str) -> ElementId {
        let id = self.add_element(&[Locator::css(DIALOG_SELECTOR)], text, false);
        self.state().elements[id].is_dialog = true;
        id
    }

    /// Makes activating `trigger` open `dialog` (or show a hidden element),
    /// optionally only by `method`.
    pub fn link(&self, trigger: ElementId, dialog: ElementId, method: Option<ActivationMethod>) {
        let mut state = self.state();
        state.elements[trigger].opens = Some(dialog);
        state.elements[trigger].opens_with = method;
    }

    /// Adds a table cell found by the most specific locator strategy, opening a
    /// dialog with `detail_text` on any activation.
    ///
    /// # Returns
    ///
    /// The cell and the dialog.
    pub fn add_server_row(&self, name: &str, detail_text: &str) -> (ElementId, ElementId) {
        let cell = self.add_element(&[LOCATOR_STRATEGIES[0].locator(name)], name, true);
        let dialog = self.add_dialog(detail_text);
        self.link(cell, dialog, None);
        (cell, dialog)
    }

    /// Replaces what one text source returns for an element.
    pub fn set_text(&self, id: ElementId, source: TextSource, text: &str) {
        self.state().elements[id]
            .text_overrides
            .insert(source, text.to_string());
    }

    /// Hides an element until it is scrolled into view.
    pub fn hide_until_scrolled(&self, id: ElementId) {
        let mut state = self.state();
        state.elements[id].displayed = false;
        state.elements[id].displayed_after_scroll = true;
    }

    pub fn set_displayed(&self, id: ElementId, displayed: bool) {
        self.state().elements[id].displayed = displayed;
    }

    pub fn open_dialog(&self, id: ElementId) {
        self.state().elements[id].open = true;
    }

    pub fn is_open(&self, id: ElementId) -> bool {
        self.state().elements[id].open
    }

    /// Makes the next call of `operation` fail with `error`. Operations are
    /// named after the trait methods.
    pub fn fail_next(&self, operation: &'static str, error: SessionError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn set_page_text(&self, text: &str) {
        self.state().page_text = text.to_string();
    }

    pub fn set_ready_state(&self, ready_state: &str) {
        self.state().ready_state = ready_state.to_string();
    }

    /// Whether the page app reports itself mounted.
    pub fn set_app_mounted(&self, mounted: bool) {
        self.state().app_mounted = mounted;
    }

    /// Whether the page-size script finds something to change.
    pub fn set_page_size_script_applies(&self, applies: bool) {
        self.state().page_size_script_applies = applies;
    }

    /// Makes Escape leave dialogs open.
    pub fn ignore_escape(&self) {
        self.state().ignore_escape = true;
    }

    /// Scripts run through `eval_bool`, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    pub fn queries(&self) -> Vec<Locator> {
        self.state().queries.clone()
    }

    /// Number of `find_all` calls made with exactly `locator`.
    pub fn query_count(&self, locator: &Locator) -> usize {
        self.state().queries.iter().filter(|q| *q == locator).count()
    }

    pub fn activations(&self) -> Vec<(ElementId, ActivationMethod)> {
        self.state().activations.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state().reloads
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn storage_clears(&self) -> usize {
        self.state().storage_clears
    }

    pub fn keys(&self) -> Vec<Key> {
        self.state().keys.clone()
    }

    fn take_failure(&self, operation: &'static str) -> Result<(), SessionError> {
        match self
            .state()
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close_dialogs(state: &mut PageState) {
        for element in state.elements.iter_mut().filter(|e| e.is_dialog) {
            element.open = false;
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = ElementId;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementId>, SessionError> {
        self.take_failure("find_all")?;
        let mut state = self.state();
        state.queries.push(locator.clone());
        Ok(state.by_locator.get(locator).cloned().unwrap_or_default())
    }

    async fn find_within(
        &self,
        root: &ElementId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>, SessionError> {
        self.take_failure("find_within")?;
        Ok(self
            .state()
            .within
            .get(&(*root, locator.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool, SessionError> {
        self.take_failure("is_displayed")?;
        let state = self.state();
        let element = &state.elements[*element];
        Ok(if element.is_dialog {
            element.open
        } else {
            element.displayed
        })
    }

    async fn scroll_into_view(&self, element: &ElementId) -> Result<(), SessionError> {
        self.take_failure("scroll_into_view")?;
        let mut state = self.state();
        let element = &mut state.elements[*element];
        if element.displayed_after_scroll {
            element.displayed = true;
        }
        Ok(())
    }

    async fn activate(
        &self,
        element: &ElementId,
        method: ActivationMethod,
    ) -> Result<(), SessionError> {
        self.take_failure("activate")?;
        let mut state = self.state();
        state.activations.push((*element, method));
        let trigger = state.elements[*element].clone();
        if trigger.closes_dialogs {
            Self::close_dialogs(&mut state);
        }
        if let Some(target) = trigger.opens {
            if trigger.opens_with.is_none_or(|m| m == method) {
                let target = &mut state.elements[target];
                if target.is_dialog {
                    target.open = true;
                } else {
                    target.displayed = true;
                }
            }
        }
        Ok(())
    }

    async fn read_text(
        &self,
        element: &ElementId,
        source: TextSource,
    ) -> Result<String, SessionError> {
        self.take_failure("read_text")?;
        let state = self.state();
        let element = &state.elements[*element];
        Ok(element
            .text_overrides
            .get(&source)
            .cloned()
            .unwrap_or_else(|| element.text.clone()))
    }

    async fn press_key(&self, key: Key) -> Result<(), SessionError> {
        self.take_failure("press_key")?;
        let mut state = self.state();
        state.keys.push(key);
        if key == Key::Escape && !state.ignore_escape {
            Self::close_dialogs(&mut state);
        }
        Ok(())
    }

    async fn click_outside(&self, _element: &ElementId) -> Result<(), SessionError> {
        self.take_failure("click_outside")?;
        Self::close_dialogs(&mut self.state());
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, SessionError> {
        self.take_failure("ready_state")?;
        Ok(self.state().ready_state.clone())
    }

    async fn page_text(&self) -> Result<String, SessionError> {
        self.take_failure("page_text")?;
        Ok(self.state().page_text.clone())
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, SessionError> {
        self.take_failure("eval_bool")?;
        let mut state = self.state();
        state.scripts.push(script.to_string());
        Ok(if script == FRAMEWORK_READY_SCRIPT {
            state.app_mounted
        } else {
            state.page_size_script_applies
        })
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.take_failure("current_url")?;
        Ok(self.state().url.clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.take_failure("navigate")?;
        let mut state = self.state();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Self::close_dialogs(&mut state);
        Ok(())
    }

    async fn reload(&self) -> Result<(), SessionError> {
        self.take_failure("reload")?;
        let mut state = self.state();
        state.reloads += 1;
        Self::close_dialogs(&mut state);
        Ok(())
    }

    async fn clear_storage(&self) -> Result<(), SessionError> {
        self.take_failure("clear_storage")?;
        self.state().storage_clears += 1;
        Ok(())
    }
}

/// Pipeline settings without any sleeping.
pub fn fast_settings(max_attempts: u32) -> ExtractionSettings {
    ExtractionSettings {
        max_attempts,
        ..ExtractionSettings::without_delays()
    }
}

/// Fast settings with a dialog budget large enough for every activation
/// method to get a turn.
pub fn fallback_settings(max_attempts: u32) -> ExtractionSettings {
    ExtractionSettings {
        dialog_wait_timeout: std::time::Duration::from_secs(30),
        ..fast_settings(max_attempts)
    }
}
