//! Core data types shared across the extraction pipeline.
//!
//! - `ServerReference`: one entry from a local server list that should be refreshed
//! - `ExtractedServerInfo`: what was scraped from one server's detail dialog
//! - `Protocol` / `ServerFlags`: structured metadata parsed from the dialog text
//! - `ExtractionAttempt` / `ExtractionReport`: how one extraction went, attempt by attempt

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter as EnumIterMacro};

use crate::error_handling::ErrorCategory;
use crate::parse::validate_ipv4;

/// A server entry from a local list file, identified by its name.
///
/// Country and city are carried through untouched so the list rewriter can
/// report where an entry lives; extraction only ever looks at `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReference {
    /// Unique key correlating a website row with a list line
    pub name: String,
    /// `[Country]` section the entry appeared under
    pub group_country: Option<String>,
    /// `"City"` sub-header the entry appeared under
    pub group_city: Option<String>,
}

impl ServerReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_country: None,
            group_city: None,
        }
    }
}

/// Transport protocol advertised for a server.
///
/// `Display` renders the label used in the published list files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIterMacro,
)]
pub enum Protocol {
    #[strum(serialize = "DNSCrypt")]
    DNSCrypt,
    #[strum(serialize = "DNSCrypt relay")]
    DNSCryptRelay,
    #[strum(serialize = "DoH")]
    DoH,
    #[strum(serialize = "DoT")]
    DoT,
    #[strum(serialize = "Unknown")]
    Unknown,
}

/// Boolean properties shown in a server's detail dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFlags {
    pub dnssec: bool,
    pub no_filters: bool,
    pub no_logs: bool,
}

/// Result of scraping one server's detail dialog.
///
/// Built once per extraction attempt and never mutated afterwards. A record
/// with no IP address is structurally valid but not usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedServerInfo {
    pub name: String,
    /// Dotted-quad IPv4 address, `None` when nothing valid was found
    pub ip_address: Option<String>,
    pub protocol: Protocol,
    pub flags: ServerFlags,
}

impl ExtractedServerInfo {
    /// Whether the record can be written back to a list file.
    ///
    /// Requires a present, octet-valid IPv4 address. With `strict` set,
    /// private and loopback addresses are rejected as well.
    pub fn is_usable(&self, strict: bool) -> bool {
        let Some(ip) = self.ip_address.as_deref() else {
            return false;
        };
        if !validate_ipv4(ip) {
            return false;
        }
        if !strict {
            return true;
        }
        match ip.parse::<Ipv4Addr>() {
            Ok(addr) => !(addr.is_private() || addr.is_loopback()),
            // Leading-zero octets are octet-valid but rejected by std's parser
            Err(_) => false,
        }
    }
}

/// What happened in one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A usable record was extracted
    Success(ExtractedServerInfo),
    /// The results table or the server's element was not found
    LocatorMiss,
    /// The element could not be brought into view for activation
    InteractionFailed,
    /// No detail dialog appeared in time
    DetailTimeout,
    /// The dialog opened but had no text
    EmptyDetail,
    /// The dialog text gave no usable record
    ParseRejected,
    /// An error occurred and the page was recovered
    RecoveredRetry(ErrorCategory),
    /// An error occurred and recovery did not restore the page
    FatalError {
        category: ErrorCategory,
        reason: String,
    },
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::LocatorMiss => "locator miss",
            AttemptOutcome::InteractionFailed => "interaction failed",
            AttemptOutcome::DetailTimeout => "detail timeout",
            AttemptOutcome::EmptyDetail => "empty detail",
            AttemptOutcome::ParseRejected => "parse rejected",
            AttemptOutcome::RecoveredRetry(_) => "recovered retry",
            AttemptOutcome::FatalError { .. } => "unrecovered error",
        }
    }

    /// Category of the error behind this outcome, if an error occurred.
    pub fn error_category(&self) -> Option<ErrorCategory> {
        match self {
            AttemptOutcome::RecoveredRetry(category) => Some(*category),
            AttemptOutcome::FatalError { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// One try within the retry loop; kept only for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt {
    /// Zero-based
    pub attempt_index: u32,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
}

/// Result of extracting one server, with its attempt history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// The usable record, `None` after the attempts ran out
    pub record: Option<ExtractedServerInfo>,
    pub attempts: Vec<ExtractionAttempt>,
    /// Locator strategy and activation method that produced the record
    pub method: Option<String>,
}

impl ExtractionReport {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Category of the most recent error, if any attempt hit one.
    pub fn last_error_category(&self) -> Option<ErrorCategory> {
        self.attempts
            .iter()
            .rev()
            .find_map(|a| a.outcome.error_category())
    }
}
