//! Extraction orchestrator: locate, reveal, read, close and parse, with retry.

use async_trait::async_trait;
use tokio::time::Instant;

use super::detail::{close_surface, dismiss_overlays, extract_text};
use super::interaction::{reveal_detail, RevealOutcome};
use super::locator::locate;
use crate::config::ExtractionSettings;
use crate::error_handling::SessionError;
use crate::models::{AttemptOutcome, ExtractionAttempt, ExtractionReport, ServerReference};
use crate::parse::parse_server_info;
use crate::recovery::{find_any_results_table, ErrorRecovery};
use crate::session::BrowserSession;
use crate::utils::{preview, retry_backoff, sleep_for};

/// Anything that can extract one server's record.
///
/// Implemented by `Orchestrator`; the batch coordinator only depends on this.
#[async_trait]
pub trait ServerExtractor: Send {
    /// Extracts the record for `reference`.
    ///
    /// # Errors
    ///
    /// Only fatal session errors; running out of attempts is an `Ok` report
    /// without a record.
    async fn extract(
        &mut self,
        reference: &ServerReference,
    ) -> Result<ExtractionReport, SessionError>;
}

/// Composes locator, interaction engine, detail extractor and field parser
/// into one retrying extraction.
pub struct Orchestrator<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    recovery: ErrorRecovery<'a, S>,
    settings: &'a ExtractionSettings,
}

/// One attempt's outcome plus the method that produced a success.
struct AttemptResult {
    outcome: AttemptOutcome,
    method: Option<String>,
}

impl AttemptResult {
    fn failed(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            method: None,
        }
    }
}

impl<'a, S: BrowserSession + ?Sized> Orchestrator<'a, S> {
    pub fn new(
        session: &'a S,
        recovery: ErrorRecovery<'a, S>,
        settings: &'a ExtractionSettings,
    ) -> Self {
        Self {
            session,
            recovery,
            settings,
        }
    }

    /// Runs up to `max_attempts` attempts for `reference`.
    ///
    /// Errors raised inside an attempt go to the error recovery and the loop
    /// continues whether or not recovery succeeds. Every failed attempt except
    /// the last is followed by an exponential backoff.
    pub async fn run(
        &self,
        reference: &ServerReference,
    ) -> Result<ExtractionReport, SessionError> {
        let max_attempts = self.settings.max_attempts;
        let mut report = ExtractionReport::default();
        let mut backoff = retry_backoff(
            self.settings.retry_base_delay,
            self.settings.retry_max_delay,
            self.settings.retry_jitter_max,
        );

        for attempt_index in 0..max_attempts {
            let started = Instant::now();
            let result = match self.attempt(reference).await {
                Ok(result) => result,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let decision = self.recovery.handle(&e, &reference.name).await?;
                    AttemptResult::failed(if decision.recovered {
                        AttemptOutcome::RecoveredRetry(decision.category)
                    } else {
                        AttemptOutcome::FatalError {
                            category: decision.category,
                            reason: e.to_string(),
                        }
                    })
                }
            };

            log::debug!(
                "Attempt {}/{} for '{}': {}",
                attempt_index + 1,
                max_attempts,
                reference.name,
                result.outcome.as_str()
            );
            report.attempts.push(ExtractionAttempt {
                attempt_index,
                outcome: result.outcome.clone(),
                duration: started.elapsed(),
            });

            if let AttemptOutcome::Success(info) = result.outcome {
                report.record = Some(info);
                report.method = result.method;
                return Ok(report);
            }

            if attempt_index + 1 < max_attempts {
                let delay = backoff.next().unwrap_or(self.settings.retry_max_delay);
                log::debug!("Backing off {:?} before retrying '{}'", delay, reference.name);
                sleep_for(delay).await;
            }
        }

        log::warn!(
            "Giving up on '{}' after {} attempts",
            reference.name,
            max_attempts
        );
        Ok(report)
    }

    /// Makes sure the results table is on screen, scrolling to it if needed.
    async fn ensure_table_visible(&self) -> Result<bool, SessionError> {
        let Some(table) = find_any_results_table(self.session).await? else {
            return Ok(false);
        };
        if self.session.is_displayed(&table).await? {
            return Ok(true);
        }
        self.session.scroll_into_view(&table).await?;
        self.session.is_displayed(&table).await
    }

    async fn attempt(&self, reference: &ServerReference) -> Result<AttemptResult, SessionError> {
        let dismissed = dismiss_overlays(self.session, self.settings).await?;
        if dismissed > 0 {
            log::debug!("Dismissed {} stale overlay(s)", dismissed);
        }

        if !self.ensure_table_visible().await? {
            return Ok(AttemptResult::failed(AttemptOutcome::LocatorMiss));
        }

        let Some(located) = locate(self.session, None, &reference.name).await? else {
            return Ok(AttemptResult::failed(AttemptOutcome::LocatorMiss));
        };

        let detail = match reveal_detail(self.session, &located.element, self.settings).await? {
            RevealOutcome::Revealed(detail) => detail,
            RevealOutcome::NotInteractable => {
                return Ok(AttemptResult::failed(AttemptOutcome::InteractionFailed))
            }
            RevealOutcome::TimedOut => {
                return Ok(AttemptResult::failed(AttemptOutcome::DetailTimeout))
            }
        };

        // The dialog is closed before anything else is decided
        let text = extract_text(self.session, &detail.surface).await;
        close_surface(self.session, &detail.surface, self.settings).await?;

        let Some(text) = text? else {
            return Ok(AttemptResult::failed(AttemptOutcome::EmptyDetail));
        };
        log::debug!(
            "Detail text for '{}' via {}: {}",
            reference.name,
            text.source.as_str(),
            preview(&text.text)
        );

        let info = parse_server_info(&text.text, &reference.name);
        if !info.is_usable(self.settings.strict_ip) {
            log::debug!(
                "Rejected record for '{}' (ip: {:?})",
                reference.name,
                info.ip_address
            );
            return Ok(AttemptResult::failed(AttemptOutcome::ParseRejected));
        }

        Ok(AttemptResult {
            outcome: AttemptOutcome::Success(info),
            method: Some(format!("{}+{}", located.strategy, detail.method.as_str())),
        })
    }
}

#[async_trait]
impl<'a, S: BrowserSession + ?Sized> ServerExtractor for Orchestrator<'a, S> {
    async fn extract(
        &mut self,
        reference: &ServerReference,
    ) -> Result<ExtractionReport, SessionError> {
        self.run(reference).await
    }
}

