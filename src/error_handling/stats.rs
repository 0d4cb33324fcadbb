//! Recovery statistics tracking.
//!
//! Counts handled errors per category, the outcome of each recovery procedure
//! and which recovery actions succeeded, using atomic counters so the tracker
//! can be shared by reference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{ErrorCategory, RecoveryAction};

/// Recovery statistics tracker.
///
/// All categories are initialized to zero on creation.
pub struct RecoveryStats {
    handled: HashMap<ErrorCategory, AtomicUsize>,
    recovered: HashMap<ErrorCategory, AtomicUsize>,
    failed: HashMap<ErrorCategory, AtomicUsize>,
    succeeded_actions: HashMap<RecoveryAction, AtomicUsize>,
}

impl Default for RecoveryStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryStats {
    pub fn new() -> Self {
        let init = || {
            ErrorCategory::iter()
                .map(|category| (category, AtomicUsize::new(0)))
                .collect::<HashMap<_, _>>()
        };
        RecoveryStats {
            handled: init(),
            recovered: init(),
            failed: init(),
            succeeded_actions: RecoveryAction::iter()
                .map(|action| (action, AtomicUsize::new(0)))
                .collect(),
        }
    }

    /// Records the outcome of one recovery attempt and the last action it took.
    pub fn record(&self, category: ErrorCategory, action: RecoveryAction, recovered: bool) {
        Self::bump(&self.handled, category);
        if recovered {
            Self::bump(&self.recovered, category);
            Self::bump(&self.succeeded_actions, action);
        } else {
            Self::bump(&self.failed, category);
        }
    }

    fn bump<K: std::hash::Hash + Eq + std::fmt::Debug>(map: &HashMap<K, AtomicUsize>, key: K) {
        if let Some(counter) = map.get(&key) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in RecoveryStats initialization.",
                key
            );
        }
    }

    fn load<K: std::hash::Hash + Eq>(map: &HashMap<K, AtomicUsize>, key: K) -> usize {
        map.get(&key)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of errors handled for a category.
    pub fn handled_count(&self, category: ErrorCategory) -> usize {
        Self::load(&self.handled, category)
    }

    /// Number of successful recoveries for a category.
    pub fn recovered_count(&self, category: ErrorCategory) -> usize {
        Self::load(&self.recovered, category)
    }

    /// Number of failed recoveries for a category.
    pub fn failed_count(&self, category: ErrorCategory) -> usize {
        Self::load(&self.failed, category)
    }

    /// Number of recoveries that succeeded with `action` as their last step.
    pub fn succeeded_with(&self, action: RecoveryAction) -> usize {
        Self::load(&self.succeeded_actions, action)
    }

    pub fn total_handled(&self) -> usize {
        ErrorCategory::iter().map(|c| self.handled_count(c)).sum()
    }

    pub fn total_recovered(&self) -> usize {
        ErrorCategory::iter().map(|c| self.recovered_count(c)).sum()
    }

    pub fn total_failed(&self) -> usize {
        ErrorCategory::iter().map(|c| self.failed_count(c)).sum()
    }

    /// Percentage of handled errors that were recovered (0.0 when none handled).
    pub fn success_rate(&self) -> f64 {
        let total = self.total_handled();
        if total == 0 {
            0.0
        } else {
            self.total_recovered() as f64 / total as f64 * 100.0
        }
    }
}
