//! Server list rewriting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::parse::{classify_line, LineKind};
use crate::config::LIST_NAME_COLUMN_WIDTH;
use crate::models::ExtractedServerInfo;
use crate::parse::validate_ipv4;

/// Which line template a list uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Servers,
    Relays,
}

impl ListKind {
    /// Formats a line for `info` under `name` in this list's template.
    pub fn format_line(&self, name: &str, info: &ExtractedServerInfo) -> Option<String> {
        match self {
            ListKind::Servers => format_server_line(name, info),
            ListKind::Relays => format_relay_line(name, info),
        }
    }
}

fn usable_ip(info: &ExtractedServerInfo) -> Option<&str> {
    info.ip_address.as_deref().filter(|ip| validate_ipv4(ip))
}

/// `name  Anonymized DNS relay | protocol | ip`, or `None` without a valid IP.
pub fn format_relay_line(name: &str, info: &ExtractedServerInfo) -> Option<String> {
    let ip = usable_ip(info)?;
    Some(format!(
        "{:<width$} Anonymized DNS relay | {} | {}",
        name,
        info.protocol,
        ip,
        width = LIST_NAME_COLUMN_WIDTH
    ))
}

/// `name  filter | logs | dnssec | IPv4 server | protocol | ip`, or `None`
/// without a valid IP.
pub fn format_server_line(name: &str, info: &ExtractedServerInfo) -> Option<String> {
    let ip = usable_ip(info)?;
    let filter = if info.flags.no_filters { "no filter" } else { "filter" };
    let logs = if info.flags.no_logs { "no logs" } else { "logs" };
    let dnssec = if info.flags.dnssec { "DNSSEC" } else { "-----" };
    Some(format!(
        "{:<width$} {} | {} | {} | IPv4 server | {} | {}",
        name,
        filter,
        logs,
        dnssec,
        info.protocol,
        ip,
        width = LIST_NAME_COLUMN_WIDTH
    ))
}

/// Rewrites every server line whose name has a record.
///
/// A rewritten line keeps the name it was matched by, whatever name the page
/// showed, so the next run still finds it. All other lines, including their
/// line endings, are kept byte for byte.
///
/// # Returns
///
/// The new text and the number of rewritten lines.
pub fn rewrite_server_list(
    text: &str,
    records: &HashMap<String, ExtractedServerInfo>,
    kind: ListKind,
) -> (String, usize) {
    let mut output = String::with_capacity(text.len());
    let mut rewritten = 0;

    for raw in text.split_inclusive('\n') {
        let (line, ending) = match raw.strip_suffix("\r\n") {
            Some(line) => (line, "\r\n"),
            None => match raw.strip_suffix('\n') {
                Some(line) => (line, "\n"),
                None => (raw, ""),
            },
        };

        let replacement = match classify_line(line) {
            LineKind::Server(name) => records
                .get(name)
                .and_then(|info| kind.format_line(name, info)),
            _ => None,
        };

        match replacement {
            Some(new_line) => {
                log::debug!("Rewrote '{}'", new_line.trim_end());
                output.push_str(&new_line);
                output.push_str(ending);
                rewritten += 1;
            }
            None => output.push_str(raw),
        }
    }

    (output, rewritten)
}

/// Outcome of rewriting one list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub output_path: PathBuf,
    pub backup_path: PathBuf,
    pub rewritten: usize,
}

/// Rewrites `source` into `output_dir`, next to a `.original_backup` copy of
/// the unmodified file.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the output directory or
/// files cannot be written.
pub fn update_file(
    source: &Path,
    output_dir: &Path,
    records: &HashMap<String, ExtractedServerInfo>,
    kind: ListKind,
) -> Result<FileUpdate> {
    let original = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read server list {}", source.display()))?;
    let file_name = source
        .file_name()
        .with_context(|| format!("Server list path has no file name: {}", source.display()))?;

    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let mut backup_name = file_name.to_os_string();
    backup_name.push(".original_backup");
    let backup_path = output_dir.join(backup_name);
    std::fs::write(&backup_path, &original)
        .with_context(|| format!("Failed to write backup {}", backup_path.display()))?;

    let (updated, rewritten) = rewrite_server_list(&original, records, kind);
    let output_path = output_dir.join(file_name);
    std::fs::write(&output_path, updated)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    log::info!(
        "Updated {} ({} lines rewritten)",
        output_path.display(),
        rewritten
    );
    Ok(FileUpdate {
        output_path,
        backup_path,
        rewritten,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Protocol, ServerFlags};

    fn info(name: &str, ip: Option<&str>, protocol: Protocol, flags: ServerFlags) -> ExtractedServerInfo {
        ExtractedServerInfo {
            name: name.to_string(),
            ip_address: ip.map(str::to_string),
            protocol,
            flags,
        }
    }

    #[test]
    fn test_format_server_line() {
        let flags = ServerFlags {
            dnssec: true,
            no_filters: true,
            no_logs: false,
        };
        let line = format_server_line("fast-dns", &info("fast-dns", Some("1.2.3.4"), Protocol::DNSCrypt, flags));
        assert_eq!(
            line.as_deref(),
            Some(
                "fast-dns                       no filter | logs | DNSSEC | IPv4 server | DNSCrypt | 1.2.3.4"
            )
        );

        let plain = format_server_line("x", &info(
            "x",
            Some("5.6.7.8"),
            Protocol::DoH,
            ServerFlags::default(),
        ))
        .expect("line");
        assert!(plain.ends_with("filter | logs | ----- | IPv4 server | DoH | 5.6.7.8"));
    }

    #[test]
    fn test_format_relay_line() {
        let line = format_relay_line("relay-one", &info(
            "relay-one",
            Some("9.9.9.9"),
            Protocol::DNSCryptRelay,
            ServerFlags::default(),
        ));
        assert_eq!(
            line.as_deref(),
            Some("relay-one                      Anonymized DNS relay | DNSCrypt relay | 9.9.9.9")
        );
    }

    #[test]
    fn test_format_requires_valid_ip() {
        let missing = info("a", None, Protocol::DNSCrypt, ServerFlags::default());
        let invalid = info("a", Some("999.1.1.1"), Protocol::DNSCrypt, ServerFlags::default());
        assert!(format_server_line("a", &missing).is_none());
        assert!(format_relay_line("a", &invalid).is_none());
    }

    #[test]
    fn test_rewrite_keeps_unmatched_lines_identical() {
        let text = "# header\r\n[Germany]\n\"Berlin\"\nknown   old | line\nunknown   keep | me  \nbroken stays\n";
        let mut records = HashMap::new();
        records.insert(
            "known".to_string(),
            info("known", Some("1.1.1.1"), Protocol::DoT, ServerFlags::default()),
        );
        records.insert(
            "broken".to_string(),
            info("broken", None, Protocol::DoT, ServerFlags::default()),
        );

        let (updated, count) = rewrite_server_list(text, &records, ListKind::Servers);
        assert_eq!(count, 1);
        let lines: Vec<&str> = updated.split_inclusive('\n').collect();
        assert_eq!(lines[0], "# header\r\n");
        assert!(lines[3].starts_with("known "));
        assert!(lines[3].ends_with("| DoT | 1.1.1.1\n"));
        assert_eq!(lines[4], "unknown   keep | me  \n");
        assert_eq!(lines[5], "broken stays\n");
    }

    #[test]
    fn test_rewrite_keeps_list_name_over_page_label() {
        let text = "[DE]\ndns-berlin   old | line\n";
        let parsed = crate::parse::parse_server_info(
            "Name: DNSCrypt Berlin\nAddress: 1.1.1.1 DNSCrypt",
            "dns-berlin",
        );
        assert_eq!(parsed.name, "DNSCrypt");
        let mut records = HashMap::new();
        records.insert("dns-berlin".to_string(), parsed);

        let (updated, count) = rewrite_server_list(text, &records, ListKind::Servers);
        assert_eq!(count, 1);
        let rewritten = updated.lines().nth(1).expect("server line");
        assert!(rewritten.starts_with("dns-berlin "), "got {:?}", rewritten);
        assert!(rewritten.ends_with("| DNSCrypt | 1.1.1.1"));

        // The rewritten file is still matched on the next run
        let (_, again) = rewrite_server_list(&updated, &records, ListKind::Servers);
        assert_eq!(again, 1);
    }

    #[test]
    fn test_rewrite_without_trailing_newline() {
        let mut records = HashMap::new();
        records.insert(
            "r".to_string(),
            info("r", Some("2.2.2.2"), Protocol::DNSCryptRelay, ServerFlags::default()),
        );
        let (updated, count) = rewrite_server_list("[X]\nr old", &records, ListKind::Relays);
        assert_eq!(count, 1);
        assert!(updated.ends_with("| DNSCrypt relay | 2.2.2.2"));
    }

    #[test]
    fn test_update_file_writes_backup_and_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("DNSCrypt-relays.txt");
        let original = "[Japan]\ntokyo-relay   stale\n";
        std::fs::write(&source, original).expect("write");

        let mut records = HashMap::new();
        records.insert(
            "tokyo-relay".to_string(),
            info("tokyo-relay", Some("9.9.9.9"), Protocol::DNSCryptRelay, ServerFlags::default()),
        );

        let out = dir.path().join("output");
        let update = update_file(&source, &out, &records, ListKind::Relays).expect("update");
        assert_eq!(update.rewritten, 1);
        assert_eq!(
            update.backup_path,
            out.join("DNSCrypt-relays.txt.original_backup")
        );
        assert_eq!(
            std::fs::read_to_string(&update.backup_path).expect("backup"),
            original
        );
        let written = std::fs::read_to_string(&update.output_path).expect("output");
        assert!(written.contains("Anonymized DNS relay | DNSCrypt relay | 9.9.9.9"));
    }

    #[test]
    fn test_update_file_missing_source_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = update_file(
            &dir.path().join("absent.txt"),
            dir.path(),
            &HashMap::new(),
            ListKind::Servers,
        );
        assert!(result.is_err());
    }
}
