//! Error handling and recovery statistics.
//!
//! This module provides:
//! - Error type definitions (`SessionError`, `InitializationError`, `PublishError`)
//! - Recoverable error categories and message-based classification
//! - Recovery statistics tracking
//!
//! Errors are split into two groups:
//! - **Recoverable**: anti-bot challenges, rate limiting, stale content,
//!   transient network trouble and in-page script faults. These are classified
//!   and handed to a recovery procedure between retry attempts.
//! - **Fatal**: the browser session itself is gone. Nothing else can succeed,
//!   so these propagate to the caller.

mod classification;
mod stats;
mod types;

// Re-export public API
pub use classification::{classify_error, classify_message, shows_challenge, CHALLENGE_MARKERS};
pub use stats::RecoveryStats;
pub use types::{ErrorCategory, InitializationError, PublishError, RecoveryAction, SessionError};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_recovery_stats_initialization() {
        let stats = RecoveryStats::new();
        for category in ErrorCategory::iter() {
            assert_eq!(stats.handled_count(category), 0);
            assert_eq!(stats.recovered_count(category), 0);
            assert_eq!(stats.failed_count(category), 0);
        }
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_recovery_stats_record() {
        let stats = RecoveryStats::new();
        stats.record(ErrorCategory::RateLimited, RecoveryAction::WaitedOutRateLimit, true);
        stats.record(ErrorCategory::RateLimited, RecoveryAction::WaitedOutRateLimit, false);
        stats.record(ErrorCategory::ScriptFault, RecoveryAction::ScriptReinitialized, true);

        assert_eq!(stats.handled_count(ErrorCategory::RateLimited), 2);
        assert_eq!(stats.recovered_count(ErrorCategory::RateLimited), 1);
        assert_eq!(stats.failed_count(ErrorCategory::RateLimited), 1);
        assert_eq!(stats.total_handled(), 3);
        assert_eq!(stats.total_recovered(), 2);
        assert_eq!(stats.total_failed(), 1);
        assert_eq!(stats.succeeded_with(RecoveryAction::WaitedOutRateLimit), 1);
        assert_eq!(stats.succeeded_with(RecoveryAction::ScriptReinitialized), 1);
        assert_eq!(stats.succeeded_with(RecoveryAction::SoftReload), 0);
    }

    #[test]
    fn test_recovery_stats_success_rate() {
        let stats = RecoveryStats::new();
        stats.record(ErrorCategory::StaleContent, RecoveryAction::SoftReload, true);
        stats.record(ErrorCategory::StaleContent, RecoveryAction::FreshNavigation, true);
        stats.record(ErrorCategory::AntiBotChallenge, RecoveryAction::WaitedOutChallenge, true);
        stats.record(ErrorCategory::Unclassified, RecoveryAction::GenericReload, false);
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }
}
