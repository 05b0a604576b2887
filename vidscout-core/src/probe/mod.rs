//! Probe executor: lightweight existence checks against mirror URLs
//!
//! Provides a trait seam for probing so the resolution engine runs the same
//! logic against real mirrors and against deterministic simulations.

pub mod simulation;

use std::time::Duration;

use async_trait::async_trait;
pub use simulation::{SimulatedResponse, SimulationProber};
use url::Url;

use crate::config::ProbeConfig;

/// Result of one existence check. Probing never fails with an error; every
/// failure mode is a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Check answered 2xx. Carries the URL the check finally landed on.
    Reachable(Url),
    /// Non-2xx status, connection, DNS, TLS or redirect failure
    Unreachable(String),
    /// No answer within the probe timeout
    TimedOut,
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable(_))
    }
}

/// Errors raised while setting up a prober.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },
}

/// Existence check capability used by the resolution engine.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Checks whether `url` answers within `timeout`.
    async fn probe(&self, url: &Url, timeout: Duration) -> ProbeOutcome;
}

/// Production prober issuing `HEAD` requests with reqwest
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Creates a prober with the configured identification header and
    /// redirect cap.
    ///
    /// # Errors
    ///
    /// - `ProbeError::ClientBuild` - TLS backend or client configuration failed
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProbeError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }

    fn classify_error(url: &Url, error: &reqwest::Error) -> ProbeOutcome {
        if error.is_timeout() {
            return ProbeOutcome::TimedOut;
        }

        let reason = if error.is_redirect() {
            format!("Too many redirects: {url}")
        } else if error.is_connect() {
            format!("Failed to connect: {error}")
        } else if error.is_request() {
            format!("Invalid request: {error}")
        } else {
            format!("HTTP request failed: {error}")
        };

        ProbeOutcome::Unreachable(reason)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &Url, timeout: Duration) -> ProbeOutcome {
        let request = self.client.head(url.clone()).timeout(timeout).send();

        // The outer timeout also bounds DNS resolution and connection setup.
        let outcome = match tokio::time::timeout(timeout, request).await {
            Err(_) => ProbeOutcome::TimedOut,
            Ok(Err(e)) => Self::classify_error(url, &e),
            Ok(Ok(response)) if response.status().is_success() => {
                ProbeOutcome::Reachable(response.url().clone())
            }
            Ok(Ok(response)) => ProbeOutcome::Unreachable(format!("HTTP {}", response.status())),
        };

        tracing::debug!(%url, ?outcome, "Probe finished");
        outcome
    }
}
