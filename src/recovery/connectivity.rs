//! Outbound connectivity probe.
//!
//! Tells a local network outage apart from a problem with the scraped site.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::ClientBuilder;

use crate::config::{CONNECTIVITY_CHECK_TIMEOUT, CONNECTIVITY_CHECK_URL, DEFAULT_USER_AGENT};

/// Whether the machine can reach the internet at all.
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes a well-known host with an HTTP `HEAD` request.
pub struct HttpConnectivityCheck {
    client: reqwest::Client,
    url: String,
}

impl HttpConnectivityCheck {
    /// Creates a probe against `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if client creation fails.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Probe against the default host.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(CONNECTIVITY_CHECK_URL, CONNECTIVITY_CHECK_TIMEOUT)
    }
}

#[async_trait]
impl ConnectivityCheck for HttpConnectivityCheck {
    async fn is_reachable(&self) -> bool {
        // Any HTTP answer means the network path works
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                log::debug!(
                    "Connectivity probe {} answered {}",
                    self.url,
                    response.status()
                );
                true
            }
            Err(e) => {
                log::warn!("Connectivity probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// A fixed answer, for dry runs and tests.
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl ConnectivityCheck for StaticConnectivity {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}
