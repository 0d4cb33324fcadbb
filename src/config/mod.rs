//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, delays, limits, default paths)
//! - CLI option types and parsing
//! - Runtime extraction settings

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, ConfigError, ExtractionSettings, LogFormat, LogLevel};
