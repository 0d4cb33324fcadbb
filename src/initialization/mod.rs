//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources of a run:
//! - Logger (plain colored or JSON lines)
//! - Browser session (WebDriver client navigated to the server page, table set
//!   to show all rows)
//!
//! All initialization functions return `InitializationError` on failure.

mod logger;
mod session;

// Re-export public API
pub use logger::init_logger_with;
pub use session::{chrome_capabilities, connect_session, prepare_page};
