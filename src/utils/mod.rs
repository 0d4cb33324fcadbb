//! Shared utilities.
//!
//! This module provides:
//! - Randomized delays, exponential backoff and bounded polling
//! - Text sanitization for log output

mod delay;
pub mod sanitize;

pub use delay::{poll_until, retry_backoff, sleep_for, DelayRange};
pub use sanitize::preview;
