//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and the runtime settings threaded through the extraction pipeline.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use thiserror::Error;

use crate::config::constants::*;
use crate::utils::DelayRange;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// A configuration value that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {message}")]
pub struct ConfigError {
    /// Name of the offending field
    pub field: &'static str,
    /// What is wrong and what is accepted
    pub message: String,
}

/// Application configuration.
///
/// Parsed from the command line with environment-variable fallbacks (a `.env`
/// file is loaded by the binary before parsing). Can also be constructed
/// programmatically via `Default`.
///
/// # Examples
///
/// ```no_run
/// use dnscrypt_refresh::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     servers_file: PathBuf::from("lists/DNSCrypt_servers.txt"),
///     max_attempts: 3,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dnscrypt_refresh",
    version,
    about = "Refreshes DNSCrypt server list IP addresses from the public server directory"
)]
pub struct Config {
    /// Server list file (DNSCrypt servers)
    #[arg(long, env = "SERVERS_FILE", default_value = DEFAULT_SERVERS_FILE)]
    pub servers_file: PathBuf,

    /// Relay list file (anonymized DNS relays)
    #[arg(long, env = "RELAYS_FILE", default_value = DEFAULT_RELAYS_FILE)]
    pub relays_file: PathBuf,

    /// Directory the rewritten lists and their backups are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Server directory page to scrape
    #[arg(long, env = "PAGE_URL", default_value = DEFAULT_PAGE_URL)]
    pub page_url: String,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, env = "WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[arg(long, env = "CHROME_HEADLESS", default_value_t = true, action = ArgAction::Set)]
    pub headless: bool,

    /// Extraction cache file
    #[arg(long, env = "CACHE_PATH", default_value = DEFAULT_CACHE_PATH)]
    pub cache_path: PathBuf,

    /// Metrics history file
    #[arg(long, env = "METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: PathBuf,

    /// Also export this run's metrics as CSV to this file
    #[arg(long)]
    pub metrics_csv: Option<PathBuf>,

    /// Maximum extraction attempts per server
    #[arg(long, env = "PARSER_MAX_RETRIES", default_value_t = MAX_EXTRACTION_ATTEMPTS)]
    pub max_attempts: u32,

    /// Reject private and loopback addresses
    #[arg(long)]
    pub strict_ip: bool,

    /// Push rewritten lists to GitHub when something changed
    #[arg(long, env = "PUBLISH")]
    pub publish: bool,

    /// GitHub repository owner
    #[arg(long, env = "GITHUB_OWNER")]
    pub github_owner: Option<String>,

    /// GitHub repository name
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// Branch to commit to
    #[arg(long, env = "GITHUB_BRANCH", default_value = DEFAULT_GITHUB_BRANCH)]
    pub github_branch: String,

    /// API token with contents write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repeat the refresh every N hours instead of running once
    #[arg(long, env = "REPEAT_HOURS")]
    pub repeat_hours: Option<u64>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers_file: PathBuf::from(DEFAULT_SERVERS_FILE),
            relays_file: PathBuf::from(DEFAULT_RELAYS_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            page_url: DEFAULT_PAGE_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            metrics_path: PathBuf::from(DEFAULT_METRICS_PATH),
            metrics_csv: None,
            max_attempts: MAX_EXTRACTION_ATTEMPTS,
            strict_ip: false,
            publish: false,
            github_owner: None,
            github_repo: None,
            github_branch: DEFAULT_GITHUB_BRANCH.to_string(),
            github_token: None,
            repeat_hours: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

impl Config {
    /// Checks field ranges and cross-field requirements.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found, naming the field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError {
                field: "max_attempts",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.max_attempts > 20 {
            return Err(ConfigError {
                field: "max_attempts",
                message: "must be at most 20 to avoid hammering the source site".to_string(),
            });
        }
        if url::Url::parse(&self.page_url).is_err() {
            return Err(ConfigError {
                field: "page_url",
                message: format!("'{}' is not an absolute URL", self.page_url),
            });
        }
        if url::Url::parse(&self.webdriver_url).is_err() {
            return Err(ConfigError {
                field: "webdriver_url",
                message: format!("'{}' is not an absolute URL", self.webdriver_url),
            });
        }
        if self.repeat_hours == Some(0) {
            return Err(ConfigError {
                field: "repeat_hours",
                message: "must be greater than 0 when set".to_string(),
            });
        }
        if self.publish {
            if self.github_owner.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError {
                    field: "github_owner",
                    message: "is required when --publish is set (GITHUB_OWNER)".to_string(),
                });
            }
            if self.github_repo.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError {
                    field: "github_repo",
                    message: "is required when --publish is set (GITHUB_REPO)".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Runtime pipeline settings derived from this configuration.
    pub fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            max_attempts: self.max_attempts,
            strict_ip: self.strict_ip,
            ..ExtractionSettings::default()
        }
    }
}

/// Timeouts, delays and limits used by the extraction pipeline.
///
/// Every wait in the pipeline reads its bound from here.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub page_load_timeout: Duration,
    pub element_wait_timeout: Duration,
    pub dialog_wait_timeout: Duration,
    pub strategy_probe_timeout: Duration,
    pub close_probe_timeout: Duration,
    pub poll_interval: Duration,
    pub accessibility_check_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub retry_jitter_max: Duration,
    pub inter_reference_delay: DelayRange,
    pub anti_bot_wait: DelayRange,
    pub anti_bot_reload_settle: DelayRange,
    pub rate_limit_wait: DelayRange,
    pub reload_settle: DelayRange,
    pub network_wait: DelayRange,
    pub generic_wait: DelayRange,
    pub pagination_settle: DelayRange,
    /// Reject private/loopback addresses when judging a record usable
    pub strict_ip: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            page_load_timeout: PAGE_LOAD_TIMEOUT,
            element_wait_timeout: ELEMENT_WAIT_TIMEOUT,
            dialog_wait_timeout: DIALOG_WAIT_TIMEOUT,
            strategy_probe_timeout: STRATEGY_PROBE_TIMEOUT,
            close_probe_timeout: CLOSE_PROBE_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            accessibility_check_timeout: ACCESSIBILITY_CHECK_TIMEOUT,
            max_attempts: MAX_EXTRACTION_ATTEMPTS,
            retry_base_delay: RETRY_BASE_DELAY,
            retry_max_delay: RETRY_MAX_DELAY,
            retry_jitter_max: RETRY_JITTER_MAX,
            inter_reference_delay: DelayRange::new(
                INTER_REFERENCE_DELAY_MIN,
                INTER_REFERENCE_DELAY_MAX,
            ),
            anti_bot_wait: DelayRange::new(ANTI_BOT_WAIT_MIN, ANTI_BOT_WAIT_MAX),
            anti_bot_reload_settle: DelayRange::new(
                ANTI_BOT_RELOAD_SETTLE_MIN,
                ANTI_BOT_RELOAD_SETTLE_MAX,
            ),
            rate_limit_wait: DelayRange::new(RATE_LIMIT_WAIT_MIN, RATE_LIMIT_WAIT_MAX),
            reload_settle: DelayRange::new(RELOAD_SETTLE_MIN, RELOAD_SETTLE_MAX),
            network_wait: DelayRange::new(NETWORK_WAIT_MIN, NETWORK_WAIT_MAX),
            generic_wait: DelayRange::new(GENERIC_WAIT_MIN, GENERIC_WAIT_MAX),
            pagination_settle: DelayRange::new(PAGINATION_SETTLE_MIN, PAGINATION_SETTLE_MAX),
            strict_ip: false,
        }
    }
}

impl ExtractionSettings {
    /// Settings with every delay and timeout set to zero.
    ///
    /// Bounded waits still probe once, so the pipeline behaves the same, only
    /// without sleeping. Meant for dry runs against a fake session.
    pub fn without_delays() -> Self {
        let none = DelayRange::fixed(Duration::ZERO);
        Self {
            page_load_timeout: Duration::ZERO,
            element_wait_timeout: Duration::ZERO,
            dialog_wait_timeout: Duration::ZERO,
            strategy_probe_timeout: Duration::ZERO,
            close_probe_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            accessibility_check_timeout: Duration::ZERO,
            retry_base_delay: Duration::ZERO,
            retry_max_delay: Duration::ZERO,
            retry_jitter_max: Duration::ZERO,
            inter_reference_delay: none,
            anti_bot_wait: none,
            anti_bot_reload_settle: none,
            rate_limit_wait: none,
            reload_settle: none,
            network_wait: none,
            generic_wait: none,
            pagination_settle: none,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts, MAX_EXTRACTION_ATTEMPTS);
        assert!(config.headless);
        assert!(!config.publish);
    }

    #[test]
    fn test_config_rejects_zero_attempts() {
        let config = Config {
            max_attempts: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "max_attempts");
        assert!(err.message.contains("greater than 0"));
    }

    #[test]
    fn test_config_rejects_relative_page_url() {
        let config = Config {
            page_url: "public-servers".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "page_url");
    }

    #[test]
    fn test_publish_requires_repository() {
        let config = Config {
            publish: true,
            github_owner: Some("owner".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "github_repo");
    }

    #[test]
    fn test_config_parses_from_args() {
        let config = Config::try_parse_from([
            "dnscrypt_refresh",
            "--max-attempts",
            "3",
            "--strict-ip",
            "--headless",
            "false",
            "--log-level",
            "debug",
        ])
        .expect("arguments should parse");
        assert_eq!(config.max_attempts, 3);
        assert!(config.strict_ip);
        assert!(!config.headless);
        assert!(matches!(config.log_level, LogLevel::Debug));
    }

    #[test]
    fn test_extraction_settings_follow_config() {
        let config = Config {
            max_attempts: 2,
            strict_ip: true,
            ..Default::default()
        };
        let settings = config.extraction_settings();
        assert_eq!(settings.max_attempts, 2);
        assert!(settings.strict_ip);
        assert_eq!(settings.dialog_wait_timeout, DIALOG_WAIT_TIMEOUT);
    }

    #[test]
    fn test_without_delays_keeps_limits() {
        let settings = ExtractionSettings::without_delays();
        assert_eq!(settings.max_attempts, MAX_EXTRACTION_ATTEMPTS);
        assert_eq!(settings.retry_base_delay, Duration::ZERO);
        assert_eq!(settings.anti_bot_wait.sample(), Duration::ZERO);
    }
}
