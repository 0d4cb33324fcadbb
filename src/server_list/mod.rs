//! Local server and relay list files.
//!
//! The lists are line oriented:
//!
//! ```text
//! # comment
//! [Country]
//! "City"
//! server-name   no filter | no logs | DNSSEC | IPv4 server | DNSCrypt | 1.2.3.4
//! ```
//!
//! Parsing yields the server references to refresh. Rewriting replaces the
//! lines of refreshed servers with one of two fixed templates and leaves every
//! other line untouched.

mod parse;
mod rewrite;

pub use parse::parse_server_list;
pub use rewrite::{
    format_relay_line, format_server_line, rewrite_server_list, update_file, FileUpdate, ListKind,
};
