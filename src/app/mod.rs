//! Main application modules.
//!
//! This module provides statistics printing and run scheduling used by the
//! binary and the library's refresh entry point.

pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use shutdown::wait_for_next_run;
pub use statistics::{print_batch_summary, print_cache_statistics, print_recovery_statistics};
