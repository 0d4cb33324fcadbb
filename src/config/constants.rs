//! Configuration constants.
//!
//! This module defines every timeout, delay and limit used by the extraction
//! pipeline. `ExtractionSettings::default()` copies these values; tests build
//! settings with zero delays instead.

use std::time::Duration;

/// Public server directory page that is scraped.
pub const DEFAULT_PAGE_URL: &str = "https://dnscrypt.info/public-servers";
/// Local WebDriver endpoint (chromedriver default port).
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

// Bounded waits
/// Maximum wait for the page to finish loading after navigation or reload
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// Maximum wait for an element to become visible
pub const ELEMENT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Overall budget for a detail dialog to appear across all click strategies
pub const DIALOG_WAIT_TIMEOUT: Duration = Duration::from_secs(15);
/// Wait after a single click strategy before trying the next one
pub const STRATEGY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Wait for a dialog to disappear after a single close strategy
pub const CLOSE_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// Interval between polls inside a bounded wait
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Maximum wait for the results table during an accessibility check
pub const ACCESSIBILITY_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

// Retry strategy
/// Maximum extraction attempts per server (initial attempt included)
pub const MAX_EXTRACTION_ATTEMPTS: u32 = 5;
/// Base delay between attempts; attempt `n` waits `base * 2^n` plus jitter
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
/// Upper bound on the exponential part of the backoff
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);
/// Maximum random jitter added to each backoff delay
pub const RETRY_JITTER_MAX: Duration = Duration::from_secs(1);

// Pacing between servers
/// Lower bound of the randomized pause after every server
pub const INTER_REFERENCE_DELAY_MIN: Duration = Duration::from_millis(500);
/// Upper bound of the randomized pause after every server
pub const INTER_REFERENCE_DELAY_MAX: Duration = Duration::from_millis(2000);

// Recovery waits (randomized between MIN and MAX)
pub const ANTI_BOT_WAIT_MIN: Duration = Duration::from_secs(15);
pub const ANTI_BOT_WAIT_MAX: Duration = Duration::from_secs(30);
/// Settle time after the forced reload in the anti-bot procedure
pub const ANTI_BOT_RELOAD_SETTLE_MIN: Duration = Duration::from_secs(10);
pub const ANTI_BOT_RELOAD_SETTLE_MAX: Duration = Duration::from_secs(20);
pub const RATE_LIMIT_WAIT_MIN: Duration = Duration::from_secs(30);
pub const RATE_LIMIT_WAIT_MAX: Duration = Duration::from_secs(90);
pub const RELOAD_SETTLE_MIN: Duration = Duration::from_secs(5);
pub const RELOAD_SETTLE_MAX: Duration = Duration::from_secs(10);
pub const NETWORK_WAIT_MIN: Duration = Duration::from_secs(10);
pub const NETWORK_WAIT_MAX: Duration = Duration::from_secs(20);
pub const GENERIC_WAIT_MIN: Duration = Duration::from_secs(5);
pub const GENERIC_WAIT_MAX: Duration = Duration::from_secs(15);
/// Settle time after switching the results table to show all rows
pub const PAGINATION_SETTLE_MIN: Duration = Duration::from_secs(3);
pub const PAGINATION_SETTLE_MAX: Duration = Duration::from_secs(5);

/// Host probed to tell a local network outage from a site problem
pub const CONNECTIVITY_CHECK_URL: &str = "https://1.1.1.1";
/// Timeout for the connectivity probe request
pub const CONNECTIVITY_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

// Cache
/// Time-to-live for cached extraction results (24 hours)
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CACHE_PATH: &str = "./output/cache/server_cache.json";
pub const DEFAULT_METRICS_PATH: &str = "./output/parsing_metrics.json";
/// Sessions older than this are dropped from the metrics history (30 days)
pub const METRICS_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Window of the historical summary logged after each run
pub const METRICS_SUMMARY_DAYS: u32 = 7;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

// Server list files and their location in the published repository
pub const DEFAULT_SERVERS_FILE: &str = "DNSCrypt_servers.txt";
pub const DEFAULT_RELAYS_FILE: &str = "DNSCrypt_relay.txt";
pub const REMOTE_LIST_DIR: &str = "lib";

// Publishing
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_BRANCH: &str = "main";
/// Timeout for a single GitHub API request
pub const GITHUB_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Column width the server name is padded to in rewritten list lines
pub const LIST_NAME_COLUMN_WIDTH: usize = 30;

/// Default User-Agent for API and connectivity requests.
pub const DEFAULT_USER_AGENT: &str = concat!("dnscrypt_refresh/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of page or dialog text rendered into a log line
pub const MAX_LOGGED_TEXT_LENGTH: usize = 200;
