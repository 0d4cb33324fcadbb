//! Extraction metrics.
//!
//! `MetricsCollector` keeps one record per processed server for the current
//! session and summarizes them: counts, success rate, error-category and
//! method histograms, average durations and the servers that failed. Sessions
//! are appended to a JSON history file, which keeps `METRICS_RETENTION` worth
//! of sessions and feeds a multi-day `HistoricalSummary`. A session can also
//! be exported as CSV.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::config::METRICS_RETENTION;
use crate::error_handling::ErrorCategory;

/// Metrics method label for results served from the cache.
pub const CACHE_METHOD: &str = "cache";

/// How the extraction of one server went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetric {
    pub server_name: String,
    pub success: bool,
    /// Seconds spent, including retries and backoff
    pub duration_secs: f64,
    pub attempt_count: usize,
    pub error_category: Option<ErrorCategory>,
    pub method: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// All metrics recorded during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub metrics: Vec<ExtractionMetric>,
}

/// On-disk session history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MetricsHistory {
    last_updated: Option<DateTime<Utc>>,
    sessions: Vec<SessionRecord>,
}

/// Aggregate view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub session_id: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage, 0.0 when nothing was recorded
    pub success_rate: f64,
    /// Error categories of failed extractions
    pub error_histogram: BTreeMap<ErrorCategory, usize>,
    pub method_histogram: BTreeMap<String, usize>,
    pub average_duration: Duration,
    pub average_success_duration: Duration,
    pub failed_servers: Vec<String>,
}

/// Aggregate view of the sessions of the last few days.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSummary {
    pub period_days: u32,
    pub sessions: usize,
    pub total: usize,
    pub successful: usize,
    /// Percentage over every server of every session in the window
    pub success_rate: f64,
    /// Most frequent error categories, most frequent first (at most five)
    pub top_errors: Vec<(ErrorCategory, usize)>,
    pub latest_session_id: String,
}

impl HistoricalSummary {
    pub fn log(&self) {
        log::info!(
            "Last {} days: {} sessions, {}/{} servers extracted ({:.1}%)",
            self.period_days,
            self.sessions,
            self.successful,
            self.total,
            self.success_rate
        );
        for (category, count) in &self.top_errors {
            log::info!("   {}: {}", category, count);
        }
    }
}

fn read_history(path: &Path) -> Result<MetricsHistory> {
    if !path.exists() {
        return Ok(MetricsHistory::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metrics history {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metrics history {}", path.display()))
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Summarizes the sessions in the history at `path` that started within the
/// last `days` days.
///
/// # Returns
///
/// `None` when no session falls in the window, including when there is no
/// history yet.
///
/// # Errors
///
/// Returns an error if the history exists but cannot be read or parsed.
pub fn historical_summary(path: &Path, days: u32) -> Result<Option<HistoricalSummary>> {
    historical_summary_at(path, days, Utc::now())
}

fn historical_summary_at(
    path: &Path,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Option<HistoricalSummary>> {
    let history = read_history(path)?;
    let since = now - chrono::Duration::days(i64::from(days));
    let recent: Vec<&SessionRecord> = history
        .sessions
        .iter()
        .filter(|s| s.start_time > since)
        .collect();
    let Some(latest) = recent.last() else {
        return Ok(None);
    };

    let total: usize = recent.iter().map(|s| s.metrics.len()).sum();
    let successful = recent
        .iter()
        .flat_map(|s| &s.metrics)
        .filter(|m| m.success)
        .count();
    let mut errors: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
    for category in recent
        .iter()
        .flat_map(|s| &s.metrics)
        .filter(|m| !m.success)
        .filter_map(|m| m.error_category)
    {
        *errors.entry(category).or_insert(0) += 1;
    }
    let mut top_errors: Vec<(ErrorCategory, usize)> = errors.into_iter().collect();
    top_errors.sort_by(|a, b| b.1.cmp(&a.1));
    top_errors.truncate(5);

    Ok(Some(HistoricalSummary {
        period_days: days,
        sessions: recent.len(),
        total,
        successful,
        success_rate: if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        },
        top_errors,
        latest_session_id: latest.session_id.clone(),
    }))
}

/// Collects per-server metrics for one run.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    session: SessionRecord,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Starts a session named after the current Unix time.
    pub fn new() -> Self {
        let now = Utc::now();
        Self::with_session_id(format!("session_{}", now.timestamp()))
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session: SessionRecord {
                session_id: session_id.into(),
                start_time: Utc::now(),
                end_time: None,
                metrics: Vec::new(),
            },
        }
    }

    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    pub fn len(&self) -> usize {
        self.session.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.metrics.is_empty()
    }

    /// Records the outcome of one server.
    pub fn record(
        &mut self,
        server_name: &str,
        success: bool,
        duration: Duration,
        attempt_count: usize,
        error_category: Option<ErrorCategory>,
        method: Option<&str>,
    ) {
        log::info!(
            "[{}] {}: {} ({:.2}s, {} attempt(s))",
            self.session.metrics.len() + 1,
            server_name,
            if success { "ok" } else { "failed" },
            duration.as_secs_f64(),
            attempt_count
        );
        self.session.metrics.push(ExtractionMetric {
            server_name: server_name.to_string(),
            success,
            duration_secs: duration.as_secs_f64(),
            attempt_count,
            error_category,
            method: method.map(str::to_string),
            timestamp: Utc::now(),
        });
    }

    /// Marks the session as finished.
    pub fn finish(&mut self) {
        self.session.end_time = Some(Utc::now());
    }

    pub fn summary(&self) -> MetricsSummary {
        let metrics = &self.session.metrics;
        let total = metrics.len();
        let successful = metrics.iter().filter(|m| m.success).count();
        let failed = total - successful;

        let mut error_histogram = BTreeMap::new();
        let mut method_histogram = BTreeMap::new();
        let mut failed_servers = Vec::new();
        for metric in metrics {
            if let Some(method) = &metric.method {
                *method_histogram.entry(method.clone()).or_insert(0) += 1;
            }
            if !metric.success {
                failed_servers.push(metric.server_name.clone());
                if let Some(category) = metric.error_category {
                    *error_histogram.entry(category).or_insert(0) += 1;
                }
            }
        }

        let average = |values: Vec<f64>| -> Duration {
            if values.is_empty() {
                Duration::ZERO
            } else {
                Duration::from_secs_f64(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        MetricsSummary {
            session_id: self.session.session_id.clone(),
            total,
            successful,
            failed,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64 * 100.0
            },
            error_histogram,
            method_histogram,
            average_duration: average(metrics.iter().map(|m| m.duration_secs).collect()),
            average_success_duration: average(
                metrics
                    .iter()
                    .filter(|m| m.success)
                    .map(|m| m.duration_secs)
                    .collect(),
            ),
            failed_servers,
        }
    }

    /// Logs a detailed report of the session.
    pub fn log_report(&self) {
        let summary = self.summary();
        if summary.total == 0 {
            log::info!("No extraction metrics collected");
            return;
        }

        log::info!("=== Extraction Report ({}) ===", summary.session_id);
        log::info!(
            "Servers: {} total, {} succeeded ({:.1}%), {} failed",
            summary.total,
            summary.successful,
            summary.success_rate,
            summary.failed
        );
        log::info!(
            "Average time per server: {:.2}s (successful: {:.2}s)",
            summary.average_duration.as_secs_f64(),
            summary.average_success_duration.as_secs_f64()
        );

        if summary.error_histogram.is_empty() {
            log::info!("No categorized errors");
        } else {
            log::info!("Errors:");
            let mut errors: Vec<_> = summary.error_histogram.iter().collect();
            errors.sort_by(|a, b| b.1.cmp(a.1));
            for (category, count) in errors {
                log::info!(
                    "   {}: {} ({:.1}%)",
                    category,
                    count,
                    *count as f64 / summary.failed.max(1) as f64 * 100.0
                );
            }
        }

        if !summary.method_histogram.is_empty() {
            log::info!("Extraction methods:");
            let mut methods: Vec<_> = summary.method_histogram.iter().collect();
            methods.sort_by(|a, b| b.1.cmp(a.1));
            for (method, count) in methods {
                log::info!(
                    "   {}: {} ({:.1}%)",
                    method,
                    count,
                    *count as f64 / summary.total as f64 * 100.0
                );
            }
        }

        if !summary.failed_servers.is_empty() {
            log::warn!("Failed servers ({}):", summary.failed_servers.len());
            for name in summary.failed_servers.iter().take(10) {
                log::warn!("   {}", name);
            }
            if summary.failed_servers.len() > 10 {
                log::warn!("   ... and {} more", summary.failed_servers.len() - 10);
            }
        }
    }

    /// Appends this session to the JSON history at `path`.
    ///
    /// Sessions that started more than `METRICS_RETENTION` ago are dropped. An
    /// unreadable or corrupt history file is replaced.
    ///
    /// # Returns
    ///
    /// Number of sessions now in the history.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn append_to_file(&self, path: &Path) -> Result<usize> {
        let mut history = match read_history(path) {
            Ok(history) => history,
            Err(e) => {
                log::warn!("Discarding unreadable metrics history: {:#}", e);
                MetricsHistory::default()
            }
        };

        let now = Utc::now();
        let oldest_kept = cutoff(now, METRICS_RETENTION);
        let before = history.sessions.len();
        history.sessions.retain(|s| s.start_time >= oldest_kept);
        let dropped = before - history.sessions.len();
        if dropped > 0 {
            log::debug!("Dropped {} expired sessions from the metrics history", dropped);
        }
        history.sessions.push(self.session.clone());
        history.last_updated = Some(now);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create metrics directory")?;
        }
        let content =
            serde_json::to_string_pretty(&history).context("Failed to serialize metrics")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write metrics file {}", path.display()))?;
        log::debug!("Saved metrics to {}", path.display());
        Ok(history.sessions.len())
    }

    /// Writes this session's per-server metrics as CSV.
    ///
    /// # Returns
    ///
    /// Number of rows written.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);
        writer.write_record([
            "session_id",
            "server_name",
            "success",
            "duration_secs",
            "attempt_count",
            "error_category",
            "method",
            "timestamp",
        ])?;
        for metric in &self.session.metrics {
            writer.write_record([
                self.session.session_id.as_str(),
                metric.server_name.as_str(),
                if metric.success { "true" } else { "false" },
                &format!("{:.3}", metric.duration_secs),
                &metric.attempt_count.to_string(),
                metric.error_category.map(|c| c.as_str()).unwrap_or(""),
                metric.method.as_deref().unwrap_or(""),
                &metric.timestamp.to_rfc3339(),
            ])?;
        }
        writer.flush().context("Failed to flush CSV output")?;
        Ok(self.session.metrics.len())
    }
}
