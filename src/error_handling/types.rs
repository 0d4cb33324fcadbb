//! Error type definitions.
//!
//! This module defines the error enums used throughout the application and the
//! recoverable error categories the classifier maps them to.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Errors raised by a browser session.
///
/// Expected negative outcomes (nothing found, empty text) are never reported
/// through this type; they are plain `Option`/enum values. A `SessionError`
/// means something unexpected happened and the classifier should look at it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A WebDriver command failed (stale element, click intercepted, ...).
    #[error("webdriver command failed: {0}")]
    Command(String),

    /// Script evaluation raised inside the page.
    #[error("script error: {0}")]
    Script(String),

    /// A bounded wait expired where the caller required an answer.
    #[error("wait timed out: {0}")]
    Timeout(String),

    /// The browser session is gone (crashed tab, closed window, dead driver).
    #[error("browser session lost: {0}")]
    SessionLost(String),

    /// The WebDriver endpoint could not be reached when creating a session.
    #[error("session connect failed: {0}")]
    Connect(String),
}

impl SessionError {
    /// Whether no further work can succeed on this session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::SessionLost(_) | SessionError::Connect(_))
    }
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error creating or preparing the browser session.
    #[error("Browser session initialization error: {0}")]
    SessionError(#[from] SessionError),

    /// The page never became ready after navigation.
    #[error("Page not ready after navigation to {0}")]
    PageNotReady(String),
}

/// Error types for publishing rewritten lists.
#[derive(Error, Debug)]
pub enum PublishError {
    /// No API token configured.
    #[error("GitHub token is not configured (set GITHUB_TOKEN)")]
    MissingToken,

    /// A local file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure talking to the API.
    #[error("GitHub API request failed: {0}")]
    Http(#[from] ReqwestError),

    /// The API answered with an unexpected status.
    #[error("GitHub API step '{step}' returned status {status}")]
    UnexpectedStatus { step: &'static str, status: u16 },

    /// The API answered without a field we need.
    #[error("GitHub API step '{step}' response is missing '{field}'")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },
}

/// Recoverable error categories recognized by the classifier.
///
/// The order of the variants is the order in which their keyword sets are
/// tested; the first match wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIterMacro,
    serde::Serialize, serde::Deserialize,
)]
pub enum ErrorCategory {
    AntiBotChallenge,
    RateLimited,
    StaleContent,
    TransientNetwork,
    ScriptFault,
    Unclassified,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::AntiBotChallenge => "Anti-bot challenge",
            ErrorCategory::RateLimited => "Rate limited",
            ErrorCategory::StaleContent => "Stale content",
            ErrorCategory::TransientNetwork => "Transient network error",
            ErrorCategory::ScriptFault => "Script fault",
            ErrorCategory::Unclassified => "Unclassified error",
        }
    }
}

/// Recovery procedure steps, used to describe what a recovery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum RecoveryAction {
    WaitedOutChallenge,
    ReloadedPastChallenge,
    WaitedOutRateLimit,
    SoftReload,
    CacheBustingReload,
    FreshNavigation,
    StorageClearingReload,
    ConnectivityUnavailable,
    Renavigated,
    ScriptReinitialized,
    GenericReload,
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::WaitedOutChallenge => "waited for the anti-bot check to pass",
            RecoveryAction::ReloadedPastChallenge => "reloaded after the anti-bot wait",
            RecoveryAction::WaitedOutRateLimit => "paused for the rate limit to lift",
            RecoveryAction::SoftReload => "soft reload",
            RecoveryAction::CacheBustingReload => "cache-busting reload",
            RecoveryAction::FreshNavigation => "fresh navigation",
            RecoveryAction::StorageClearingReload => "storage-clearing reload",
            RecoveryAction::ConnectivityUnavailable => "outbound connectivity unavailable",
            RecoveryAction::Renavigated => "re-navigated after connectivity check",
            RecoveryAction::ScriptReinitialized => "reloaded until the page app re-initialized",
            RecoveryAction::GenericReload => "waited and reloaded",
        }
    }

    /// Whether the step reloaded or re-navigated the page, which puts the
    /// results table back on its first page.
    pub fn resets_table(&self) -> bool {
        !matches!(
            self,
            RecoveryAction::WaitedOutChallenge
                | RecoveryAction::WaitedOutRateLimit
                | RecoveryAction::ConnectivityUnavailable
        )
    }
}
