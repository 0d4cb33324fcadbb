//! Error classification and recovery between extraction attempts.
//!
//! `ErrorRecovery::handle` classifies a non-fatal `SessionError` and runs the
//! recovery procedure for its category:
//!
//! | Category           | Procedure                                                       |
//! |--------------------|-----------------------------------------------------------------|
//! | Anti-bot challenge | wait, check; reload, settle, check again                        |
//! | Rate limited       | long wait, check (never reloads)                                |
//! | Stale content      | soft reload, cache-busting reload, fresh navigation, clear storage |
//! | Transient network  | connectivity probe, wait, re-navigate                           |
//! | Script fault       | reload, wait for the page app to re-initialize                  |
//! | Unclassified       | wait, reload                                                    |
//!
//! Every procedure reports whether the page is believed usable again. A reload
//! or navigation resets the table to its first page, so a successful one is
//! followed by `select_all_rows`. Fatal session errors are never handled; they
//! are returned to the caller.

mod connectivity;
mod page;
mod pagination;

use crate::config::ExtractionSettings;
use crate::error_handling::{
    classify_error, ErrorCategory, RecoveryAction, RecoveryStats, SessionError,
};
use crate::session::BrowserSession;
use crate::utils::{poll_until, preview};

pub use connectivity::{ConnectivityCheck, HttpConnectivityCheck, StaticConnectivity};
pub use page::{
    find_any_results_table, find_results_table, page_is_accessible, wait_for_page_ready,
    RESULTS_TABLE_SELECTORS,
};
pub use pagination::{
    select_all_rows, ALL_ROWS_OPTIONS, ROWS_PER_PAGE_DROPDOWNS, SCRIPT_PAGINATION,
    SELECT_ALL_ROWS_SCRIPT,
};

/// Globals and attributes present once the page's Vue app has mounted.
pub const FRAMEWORK_READY_SCRIPT: &str = r#"
const app = document.querySelector('#app') || document.querySelector('[data-v-app]');
return !!(window.Vue || window.__VUE__ || (app && (app.__vue__ || app.__vue_app__)));
"#;

/// Query parameter appended by the cache-busting reload.
const CACHE_BUST_PARAM: &str = "_refresh";

/// Outcome of handling one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryDecision {
    pub category: ErrorCategory,
    /// Last recovery step performed
    pub action_taken: RecoveryAction,
    /// Whether the page is believed usable again
    pub recovered: bool,
}

/// Runs category-specific recovery procedures against a browser session.
pub struct ErrorRecovery<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    connectivity: &'a dyn ConnectivityCheck,
    settings: &'a ExtractionSettings,
    stats: &'a RecoveryStats,
}

type Step = Result<(RecoveryAction, bool), SessionError>;

impl<'a, S: BrowserSession + ?Sized> ErrorRecovery<'a, S> {
    pub fn new(
        session: &'a S,
        connectivity: &'a dyn ConnectivityCheck,
        settings: &'a ExtractionSettings,
        stats: &'a RecoveryStats,
    ) -> Self {
        Self {
            session,
            connectivity,
            settings,
            stats,
        }
    }

    pub fn stats(&self) -> &RecoveryStats {
        self.stats
    }

    /// Classifies `error` and runs the matching recovery procedure.
    ///
    /// # Arguments
    ///
    /// * `error` - A non-fatal error raised during an extraction attempt
    /// * `context` - What was being done (the server name), for logging
    ///
    /// # Errors
    ///
    /// Returns the error itself when it is fatal, or a fatal error raised while
    /// recovering. Non-fatal errors during recovery mean `recovered == false`.
    pub async fn handle(
        &self,
        error: &SessionError,
        context: &str,
    ) -> Result<RecoveryDecision, SessionError> {
        if error.is_fatal() {
            return Err(error.clone());
        }
        let category = classify_error(error);
        log::warn!(
            "{} while extracting '{}': {}",
            category,
            context,
            preview(&error.to_string())
        );

        let result = match category {
            ErrorCategory::AntiBotChallenge => self.recover_from_challenge().await,
            ErrorCategory::RateLimited => self.recover_from_rate_limit().await,
            ErrorCategory::StaleContent => self.recover_from_stale_content().await,
            ErrorCategory::TransientNetwork => self.recover_from_network_error().await,
            ErrorCategory::ScriptFault => self.recover_from_script_fault().await,
            ErrorCategory::Unclassified => self.recover_generic().await,
        };

        let (action_taken, recovered) = match result {
            Ok(step) => step,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Recovery from {} failed: {}", category, e);
                (fallback_action(category), false)
            }
        };

        self.stats.record(category, action_taken, recovered);
        if recovered {
            log::info!("Recovered from {} ({})", category, action_taken);
            if action_taken.resets_table() {
                select_all_rows(self.session, self.settings).await?;
            }
        } else {
            log::warn!("Could not recover from {} ({})", category, action_taken);
        }
        Ok(RecoveryDecision {
            category,
            action_taken,
            recovered,
        })
    }

    async fn accessible(&self) -> Result<bool, SessionError> {
        page_is_accessible(self.session, self.settings).await
    }

    async fn ready(&self) -> Result<bool, SessionError> {
        wait_for_page_ready(self.session, self.settings).await
    }

    async fn recover_from_challenge(&self) -> Step {
        let waited = self.settings.anti_bot_wait.wait().await;
        log::info!("Waited {:?} for the anti-bot check", waited);
        if self.accessible().await? {
            return Ok((RecoveryAction::WaitedOutChallenge, true));
        }
        self.session.reload().await?;
        self.settings.anti_bot_reload_settle.wait().await;
        Ok((RecoveryAction::ReloadedPastChallenge, self.accessible().await?))
    }

    async fn recover_from_rate_limit(&self) -> Step {
        let waited = self.settings.rate_limit_wait.wait().await;
        log::info!("Paused {:?} for the rate limit", waited);
        Ok((RecoveryAction::WaitedOutRateLimit, self.accessible().await?))
    }

    async fn recover_from_stale_content(&self) -> Step {
        let url = self.session.current_url().await?;
        let steps = [
            RecoveryAction::SoftReload,
            RecoveryAction::CacheBustingReload,
            RecoveryAction::FreshNavigation,
            RecoveryAction::StorageClearingReload,
        ];
        for action in steps {
            let performed = match action {
                RecoveryAction::SoftReload => self.session.reload().await,
                RecoveryAction::CacheBustingReload => {
                    self.session.navigate(&cache_busting_url(&url)).await
                }
                RecoveryAction::FreshNavigation => self.session.navigate(&url).await,
                _ => match self.session.clear_storage().await {
                    Ok(()) => self.session.reload().await,
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = performed {
                if e.is_fatal() {
                    return Err(e);
                }
                log::debug!("{} failed: {}", action, e);
                continue;
            }
            self.settings.reload_settle.wait().await;
            if self.ready().await? {
                return Ok((action, true));
            }
        }
        Ok((RecoveryAction::StorageClearingReload, false))
    }

    async fn recover_from_network_error(&self) -> Step {
        if !self.connectivity.is_reachable().await {
            return Ok((RecoveryAction::ConnectivityUnavailable, false));
        }
        let url = self.session.current_url().await?;
        self.settings.network_wait.wait().await;
        self.session.navigate(&url).await?;
        Ok((RecoveryAction::Renavigated, self.ready().await?))
    }

    async fn recover_from_script_fault(&self) -> Step {
        self.session.reload().await?;
        self.settings.reload_settle.wait().await;
        if !self.ready().await? {
            return Ok((RecoveryAction::ScriptReinitialized, false));
        }
        let session = self.session;
        let mounted = poll_until(
            self.settings.element_wait_timeout,
            self.settings.poll_interval,
            move || async move {
                match session.eval_bool(FRAMEWORK_READY_SCRIPT).await {
                    Ok(true) => Ok(Some(())),
                    Ok(false) => Ok(None),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(_) => Ok(None),
                }
            },
        )
        .await?;
        Ok((RecoveryAction::ScriptReinitialized, mounted.is_some()))
    }

    async fn recover_generic(&self) -> Step {
        self.settings.generic_wait.wait().await;
        self.session.reload().await?;
        Ok((RecoveryAction::GenericReload, self.ready().await?))
    }
}

fn fallback_action(category: ErrorCategory) -> RecoveryAction {
    match category {
        ErrorCategory::AntiBotChallenge => RecoveryAction::WaitedOutChallenge,
        ErrorCategory::RateLimited => RecoveryAction::WaitedOutRateLimit,
        ErrorCategory::StaleContent => RecoveryAction::SoftReload,
        ErrorCategory::TransientNetwork => RecoveryAction::Renavigated,
        ErrorCategory::ScriptFault => RecoveryAction::ScriptReinitialized,
        ErrorCategory::Unclassified => RecoveryAction::GenericReload,
    }
}

/// `url` with a timestamp query parameter so caches are bypassed.
///
/// Unparseable URLs are returned unchanged.
pub fn cache_busting_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let stamp = chrono::Utc::now().timestamp_millis().to_string();
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != CACHE_BUST_PARAM)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            {
                let mut pairs = parsed.query_pairs_mut();
                pairs.clear();
                pairs.extend_pairs(kept);
                pairs.append_pair(CACHE_BUST_PARAM, &stamp);
            }
            parsed.to_string()
        }
        Err(e) => {
            log::debug!("Cannot add cache-busting parameter to '{}': {}", url, e);
            url.to_string()
        }
    }
}
