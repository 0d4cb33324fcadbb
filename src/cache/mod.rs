//! Extraction result cache.
//!
//! Maps a server name to the last usable record extracted for it. Entries older
//! than the TTL are misses. The cache is kept in memory during a run and stored
//! as one JSON file between runs.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ExtractedServerInfo;

/// A cached record and when it was extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub info: ExtractedServerInfo,
    pub recorded_at: DateTime<Utc>,
}

/// Entry counts by freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

/// Name-keyed cache of extracted records with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct ServerCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ServerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A TTL too large for chrono never expires
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now.signed_duration_since(entry.recorded_at) >= ttl,
            Err(_) => false,
        }
    }

    /// Looks up `name` as of `now`. Entries with `now - recorded_at >= ttl` are
    /// misses.
    pub fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<&ExtractedServerInfo> {
        self.entries
            .get(name)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| &entry.info)
    }

    /// Looks up `name` as of the current time.
    pub fn get(&self, name: &str) -> Option<&ExtractedServerInfo> {
        self.get_at(name, Utc::now())
    }

    /// Stores a record under `name`, timestamped `recorded_at`.
    pub fn insert_at(&mut self, name: &str, info: ExtractedServerInfo, recorded_at: DateTime<Utc>) {
        self.entries
            .insert(name.to_string(), CacheEntry { info, recorded_at });
    }

    /// Stores a record under `name`, timestamped now.
    pub fn insert(&mut self, name: &str, info: ExtractedServerInfo) {
        self.insert_at(name, info, Utc::now());
    }

    /// Drops expired entries and returns how many were dropped.
    pub fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(name, _)| name.clone())
            .collect();
        for name in expired {
            self.entries.remove(&name);
        }
        before - self.entries.len()
    }

    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> CacheStats {
        let expired = self
            .entries
            .values()
            .filter(|entry| self.is_expired(entry, now))
            .count();
        CacheStats {
            total: self.entries.len(),
            valid: self.entries.len() - expired,
            expired,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats_at(Utc::now())
    }

    /// Loads a cache file, dropping expired entries.
    ///
    /// A missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path, ttl: Duration) -> Result<Self> {
        let mut cache = Self::new(ttl);
        if !path.exists() {
            log::debug!("No cache file at {}", path.display());
            return Ok(cache);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache file {}", path.display()))?;
        cache.entries = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file {}", path.display()))?;

        let dropped = cache.purge_expired();
        log::info!(
            "Loaded {} cached servers from {} ({} expired entries dropped)",
            cache.len(),
            path.display(),
            dropped
        );
        Ok(cache)
    }

    /// Writes the cache to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let content =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize cache")?;
        std::fs::write(path, content).context("Failed to write cache file")?;
        log::debug!("Saved {} cached servers to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Protocol, ServerFlags};

    fn info(name: &str, ip: &str) -> ExtractedServerInfo {
        ExtractedServerInfo {
            name: name.to_string(),
            ip_address: Some(ip.to_string()),
            protocol: Protocol::DNSCrypt,
            flags: ServerFlags::default(),
        }
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_fresh_entry_is_hit() {
        let mut cache = ServerCache::new(DAY);
        let now = Utc::now();
        cache.insert_at("fast-dns", info("fast-dns", "1.2.3.4"), now);
        let hit = cache.get_at("fast-dns", now + chrono::Duration::hours(23));
        assert_eq!(hit.and_then(|i| i.ip_address.as_deref()), Some("1.2.3.4"));
    }

    #[test]
    fn test_entry_at_exact_ttl_is_miss() {
        let mut cache = ServerCache::new(DAY);
        let now = Utc::now();
        cache.insert_at("fast-dns", info("fast-dns", "1.2.3.4"), now);
        assert!(cache.get_at("fast-dns", now + chrono::Duration::hours(24)).is_none());
        assert!(cache.get_at("fast-dns", now + chrono::Duration::days(3)).is_none());
    }

    #[test]
    fn test_unknown_name_is_miss() {
        let cache = ServerCache::new(DAY);
        assert!(cache.get("nothing").is_none());
    }

    #[test]
    fn test_purge_and_stats() {
        let mut cache = ServerCache::new(DAY);
        let now = Utc::now();
        cache.insert_at("old", info("old", "1.1.1.1"), now - chrono::Duration::days(2));
        cache.insert_at("new", info("new", "2.2.2.2"), now);

        let stats = cache.stats_at(now);
        assert_eq!(stats, CacheStats { total: 2, valid: 1, expired: 1 });

        assert_eq!(cache.purge_expired_at(now), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("new", now).is_some());
    }

    #[test]
    fn test_save_and_load_drops_expired() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("server_cache.json");

        let mut cache = ServerCache::new(DAY);
        cache.insert("fresh", info("fresh", "9.9.9.9"));
        cache.insert_at(
            "stale",
            info("stale", "8.8.8.8"),
            Utc::now() - chrono::Duration::days(5),
        );
        cache.save(&path).expect("save should succeed");

        let loaded = ServerCache::load(&path, DAY).expect("load should succeed");
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get("fresh").and_then(|i| i.ip_address.clone()),
            Some("9.9.9.9".to_string())
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ServerCache::load(&dir.path().join("absent.json"), DAY).expect("load");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(ServerCache::load(&path, DAY).is_err());
    }
}
