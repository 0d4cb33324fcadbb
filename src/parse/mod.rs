//! Detail-dialog text parsing.
//!
//! This module turns the raw text of a server's detail dialog into an
//! `ExtractedServerInfo`:
//! - IPv4 address extraction with octet-range validation
//! - Protocol detection with substring priority (relay before plain DNSCrypt)
//! - DNSSEC / no-filter / no-log flag detection
//! - Explicitly labeled server names
//!
//! It also provides the markup-to-text fallback used when a dialog only
//! exposes its content as HTML.

mod fields;
mod html;
mod ip;

// Re-export public API
pub use fields::{parse_flags, parse_labeled_name, parse_protocol, parse_server_info};
pub use html::strip_markup;
pub use ip::{extract_ipv4, validate_ipv4};
