//! Batch coordinator.
//!
//! Walks the server references in input order, serving cache hits directly and
//! sending misses to a `ServerExtractor`. A failed reference is counted and
//! skipped. Only a fatal session error stops the batch, since no later
//! reference could succeed without a session.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::cache::ServerCache;
use crate::config::ExtractionSettings;
use crate::error_handling::SessionError;
use crate::extract::ServerExtractor;
use crate::metrics::{MetricsCollector, CACHE_METHOD};
use crate::models::{ExtractedServerInfo, ServerReference};

/// Records gathered by one batch run plus its counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Usable records by server name
    pub records: HashMap<String, ExtractedServerInfo>,
    pub success_count: usize,
    pub failure_count: usize,
    /// How many of the successes came from the cache
    pub cache_hits: usize,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Percentage of references that produced a record.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total() as f64 * 100.0
        }
    }
}

/// Runs extractions for a list of references against a shared cache and
/// metrics collector.
pub struct BatchCoordinator<'a> {
    cache: &'a mut ServerCache,
    metrics: &'a mut MetricsCollector,
    settings: &'a ExtractionSettings,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(
        cache: &'a mut ServerCache,
        metrics: &'a mut MetricsCollector,
        settings: &'a ExtractionSettings,
    ) -> Self {
        Self {
            cache,
            metrics,
            settings,
        }
    }

    /// Processes `references` strictly in order.
    ///
    /// # Arguments
    ///
    /// * `extractor` - Called for every reference without a fresh cache entry
    /// * `references` - Servers to refresh
    ///
    /// # Returns
    ///
    /// The aggregated result; `success_count + failure_count` equals the number
    /// of references.
    ///
    /// # Errors
    ///
    /// Returns the first fatal session error. Records gathered before it are
    /// already in the cache.
    pub async fn run(
        &mut self,
        extractor: &mut (dyn ServerExtractor + '_),
        references: &[ServerReference],
    ) -> Result<BatchResult, SessionError> {
        let mut result = BatchResult::default();
        let total = references.len();
        log::info!("Processing {} server references", total);

        for (index, reference) in references.iter().enumerate() {
            log::info!("[{}/{}] {}", index + 1, total, reference.name);
            let started = Instant::now();

            if let Some(info) = self.cache.get(&reference.name).cloned() {
                log::debug!("Cache hit for '{}'", reference.name);
                self.metrics
                    .record(&reference.name, true, started.elapsed(), 0, None, Some(CACHE_METHOD));
                result.records.insert(reference.name.clone(), info);
                result.success_count += 1;
                result.cache_hits += 1;
            } else {
                let report = extractor.extract(reference).await?;
                let duration = started.elapsed();
                match report.record {
                    Some(ref info) => {
                        self.metrics.record(
                            &reference.name,
                            true,
                            duration,
                            report.attempt_count(),
                            None,
                            report.method.as_deref(),
                        );
                        if let Some(ip) = info.ip_address.as_deref() {
                            log::info!("'{}' -> {} ({})", reference.name, ip, info.protocol);
                        }
                        self.cache.insert(&reference.name, info.clone());
                        result.records.insert(reference.name.clone(), info.clone());
                        result.success_count += 1;
                    }
                    None => {
                        self.metrics.record(
                            &reference.name,
                            false,
                            duration,
                            report.attempt_count(),
                            report.last_error_category(),
                            None,
                        );
                        log::warn!("No record for '{}'", reference.name);
                        result.failure_count += 1;
                    }
                }
            }

            let paused = self.settings.inter_reference_delay.wait().await;
            if !paused.is_zero() {
                log::debug!("Pausing {:?} before the next server", paused);
            }
        }

        log::info!(
            "Batch finished: {}/{} succeeded ({:.1}%), {} from cache",
            result.success_count,
            result.total(),
            result.success_rate(),
            result.cache_hits
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_of_empty_batch() {
        let result = BatchResult::default();
        assert_eq!(result.total(), 0);
        assert_eq!(result.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let result = BatchResult {
            success_count: 3,
            failure_count: 1,
            ..Default::default()
        };
        assert_eq!(result.total(), 4);
        assert!((result.success_rate() - 75.0).abs() < f64::EPSILON);
    }
}
