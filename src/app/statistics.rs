//! Statistics printing at the end of a refresh.

use log::info;
use strum::IntoEnumIterator;

use crate::batch::BatchResult;
use crate::cache::CacheStats;
use crate::error_handling::{ErrorCategory, RecoveryAction, RecoveryStats};

/// Prints per-category recovery counts and which recovery steps worked.
pub fn print_recovery_statistics(stats: &RecoveryStats) {
    let total = stats.total_handled();
    if total == 0 {
        info!("No errors needed recovery");
        return;
    }

    info!(
        "Recovery ({} handled, {} recovered, {:.1}% success):",
        total,
        stats.total_recovered(),
        stats.success_rate()
    );
    for category in ErrorCategory::iter() {
        let handled = stats.handled_count(category);
        if handled > 0 {
            info!(
                "   {}: {} handled, {} recovered, {} failed",
                category.as_str(),
                handled,
                stats.recovered_count(category),
                stats.failed_count(category)
            );
        }
    }
    for action in RecoveryAction::iter() {
        let count = stats.succeeded_with(action);
        if count > 0 {
            info!("   recovered by {}: {}", action.as_str(), count);
        }
    }
}

/// Prints entry counts of the result cache.
pub fn print_cache_statistics(stats: &CacheStats) {
    info!(
        "Cache: {} entries ({} valid, {} expired)",
        stats.total, stats.valid, stats.expired
    );
}

/// Prints a one-line summary of a batch.
pub fn print_batch_summary(result: &BatchResult, elapsed_seconds: f64) {
    info!(
        "Refreshed {} server{} ({} succeeded, {} from cache, {} failed, {:.1}%) in {:.1}s",
        result.total(),
        if result.total() == 1 { "" } else { "s" },
        result.success_count,
        result.cache_hits,
        result.failure_count,
        result.success_rate(),
        elapsed_seconds
    );
}
