//! dnscrypt_refresh library: keeps DNSCrypt server lists current
//!
//! This library scrapes the public DNSCrypt server directory with a real
//! browser, extracts each listed server's address and properties from its
//! detail dialog, rewrites the local server and relay lists with the fresh
//! addresses, and optionally publishes them to a GitHub repository.
//!
//! # Example
//!
//! ```no_run
//! use dnscrypt_refresh::{run_refresh, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     servers_file: "DNSCrypt_servers.txt".into(),
//!     relays_file: "DNSCrypt_relay.txt".into(),
//!     ..Default::default()
//! };
//!
//! let report = run_refresh(&config).await?;
//! println!("{} of {} servers refreshed", report.successful, report.total_servers);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! A running WebDriver endpoint (chromedriver) and a Tokio runtime.

pub mod app;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod extract;
pub mod initialization;
pub mod metrics;
pub mod models;
pub mod parse;
pub mod publish;
pub mod recovery;
pub mod server_list;
pub mod session;
pub mod utils;

// Re-export public API
pub use config::{Config, ConfigError, ExtractionSettings, LogFormat, LogLevel};
pub use run::{load_references, refresh_with_session, run_refresh, PublishStatus, RefreshReport};

// Internal run module (contains the top-level refresh flow)
mod run {
    use std::collections::HashSet;
    use std::path::Path;

    use anyhow::{Context, Result};
    use log::{info, warn};
    use tokio::time::Instant;

    use crate::app::{print_batch_summary, print_cache_statistics, print_recovery_statistics};
    use crate::batch::BatchCoordinator;
    use crate::cache::ServerCache;
    use crate::config::{
        Config, ExtractionSettings, CACHE_TTL, METRICS_SUMMARY_DAYS, REMOTE_LIST_DIR,
    };
    use crate::error_handling::RecoveryStats;
    use crate::extract::Orchestrator;
    use crate::initialization::connect_session;
    use crate::metrics::{historical_summary, MetricsCollector};
    use crate::models::ServerReference;
    use crate::publish::{commit_message, GitHubPublisher, PublishFile};
    use crate::recovery::{ConnectivityCheck, ErrorRecovery, HttpConnectivityCheck};
    use crate::server_list::{parse_server_list, update_file, FileUpdate, ListKind};
    use crate::session::BrowserSession;

    /// What happened to the rewritten lists after a refresh.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PublishStatus {
        /// Publishing is turned off
        Disabled,
        /// No line changed, so nothing was pushed
        NothingToPublish,
        /// Pushed as this commit
        Published(String),
        /// Publishing was attempted and failed
        Failed(String),
    }

    /// Results of one refresh run.
    #[derive(Debug, Clone)]
    pub struct RefreshReport {
        /// Distinct servers and relays looked up
        pub total_servers: usize,
        /// Servers with a usable record (cache hits included)
        pub successful: usize,
        /// Servers without a usable record
        pub failed: usize,
        /// Successes served from the cache
        pub from_cache: usize,
        /// List lines rewritten across both files
        pub lines_rewritten: usize,
        pub publish: PublishStatus,
        /// Metrics session identifier (format: `session_<unix seconds>`)
        pub session_id: String,
        pub elapsed_seconds: f64,
    }

    fn read_list(path: &Path) -> Result<Vec<ServerReference>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read server list {}", path.display()))?;
        let references = parse_server_list(&text);
        info!("{}: {} entries", path.display(), references.len());
        Ok(references)
    }

    /// Reads both lists and returns the distinct references in file order,
    /// servers first.
    ///
    /// # Errors
    ///
    /// Returns an error if either list cannot be read.
    pub fn load_references(config: &Config) -> Result<Vec<ServerReference>> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();
        for path in [&config.servers_file, &config.relays_file] {
            for reference in read_list(path)? {
                if seen.insert(reference.name.clone()) {
                    references.push(reference);
                }
            }
        }
        Ok(references)
    }

    /// Runs a full refresh: lists, browser session, extraction, rewrite,
    /// publish.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - A server list cannot be read
    /// - The browser session cannot be created or the page never loads
    /// - The browser session is lost during extraction
    /// - The rewritten lists cannot be written
    ///
    /// Individual servers failing is not an error; see `RefreshReport::failed`.
    pub async fn run_refresh(config: &Config) -> Result<RefreshReport> {
        let references = load_references(config)?;
        let settings = config.extraction_settings();
        let connectivity =
            HttpConnectivityCheck::with_defaults().context("Failed to build connectivity probe")?;

        let session = connect_session(
            &config.webdriver_url,
            &config.page_url,
            config.headless,
            &settings,
        )
        .await
        .context("Failed to prepare browser session")?;

        let result =
            refresh_with_session(config, &settings, &session, &connectivity, &references).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        result
    }

    /// Runs the refresh against an already prepared session.
    ///
    /// `settings` replaces the timeouts and delays derived from `config`.
    ///
    /// Cache and metrics are saved even when the batch is cut short by a lost
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is lost or the rewritten lists cannot be
    /// written. Cache, metrics and publish failures are logged, not returned.
    pub async fn refresh_with_session<S: BrowserSession + ?Sized>(
        config: &Config,
        settings: &ExtractionSettings,
        session: &S,
        connectivity: &dyn ConnectivityCheck,
        references: &[ServerReference],
    ) -> Result<RefreshReport> {
        let started = Instant::now();

        let mut cache = match ServerCache::load(&config.cache_path, CACHE_TTL) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Starting with an empty cache: {:#}", e);
                ServerCache::new(CACHE_TTL)
            }
        };
        let mut metrics = MetricsCollector::new();
        let recovery_stats = RecoveryStats::new();

        let batch = {
            let recovery = ErrorRecovery::new(session, connectivity, settings, &recovery_stats);
            let mut orchestrator = Orchestrator::new(session, recovery, settings);
            let mut coordinator = BatchCoordinator::new(&mut cache, &mut metrics, settings);
            coordinator.run(&mut orchestrator, references).await
        };

        metrics.finish();
        metrics.log_report();
        if let Err(e) = metrics.append_to_file(&config.metrics_path) {
            warn!("Failed to save metrics: {:#}", e);
        }
        match historical_summary(&config.metrics_path, METRICS_SUMMARY_DAYS) {
            Ok(Some(history)) => history.log(),
            Ok(None) => {}
            Err(e) => warn!("Failed to summarize metrics history: {:#}", e),
        }
        if let Some(csv_path) = &config.metrics_csv {
            match metrics.export_csv(csv_path) {
                Ok(rows) => info!("Exported {} metric rows to {}", rows, csv_path.display()),
                Err(e) => warn!("Failed to export metrics CSV: {:#}", e),
            }
        }
        if let Err(e) = cache.save(&config.cache_path) {
            warn!("Failed to save cache: {:#}", e);
        }
        print_cache_statistics(&cache.stats());
        print_recovery_statistics(&recovery_stats);

        let batch = batch.context("Browser session lost during extraction")?;
        print_batch_summary(&batch, started.elapsed().as_secs_f64());

        let updates = [
            (&config.servers_file, ListKind::Servers),
            (&config.relays_file, ListKind::Relays),
        ]
        .into_iter()
        .map(|(path, kind)| update_file(path, &config.output_dir, &batch.records, kind))
        .collect::<Result<Vec<FileUpdate>>>()?;
        let lines_rewritten = updates.iter().map(|u| u.rewritten).sum();

        let publish = publish_updates(config, &updates, lines_rewritten).await;

        Ok(RefreshReport {
            total_servers: references.len(),
            successful: batch.success_count,
            failed: batch.failure_count,
            from_cache: batch.cache_hits,
            lines_rewritten,
            publish,
            session_id: metrics.session().session_id.clone(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }

    async fn publish_updates(
        config: &Config,
        updates: &[FileUpdate],
        lines_rewritten: usize,
    ) -> PublishStatus {
        if !config.publish {
            return PublishStatus::Disabled;
        }
        if lines_rewritten == 0 {
            info!("No list lines changed, skipping publish");
            return PublishStatus::NothingToPublish;
        }

        let files: Vec<PublishFile> = updates
            .iter()
            .filter_map(|update| {
                let name = update.output_path.file_name()?.to_string_lossy();
                Some(PublishFile::new(
                    update.output_path.clone(),
                    format!("{}/{}", REMOTE_LIST_DIR, name),
                ))
            })
            .collect();

        let publisher = match GitHubPublisher::new(
            config.github_owner.as_deref().unwrap_or_default(),
            config.github_repo.as_deref().unwrap_or_default(),
            &config.github_branch,
            config.github_token.as_deref(),
        ) {
            Ok(publisher) => publisher,
            Err(e) => {
                log::error!("Cannot publish: {}", e);
                return PublishStatus::Failed(e.to_string());
            }
        };

        match publisher
            .publish(&files, &commit_message(lines_rewritten, &config.page_url))
            .await
        {
            Ok(sha) => PublishStatus::Published(sha),
            Err(e) => {
                log::error!("Publishing failed: {}", e);
                PublishStatus::Failed(e.to_string())
            }
        }
    }
}
