//! Fallback resolution over the mirror registry.
//!
//! Providers are probed one at a time in priority order. The first reachable
//! candidate wins and later providers are never touched. Every failed
//! candidate leaves an [`AttemptRecord`] so an exhausted resolution explains
//! itself.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ProbeConfig;
use crate::content::ContentRef;
use crate::probe::{ProbeOutcome, Prober};
use crate::registry::{MirrorRegistry, RegistryError};

/// Why one provider did not yield a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    /// Provider has no template for the content's media kind
    UnsupportedMediaKind,
    /// Template produced an unusable URL
    InvalidUrl(String),
    /// Probe answered with a failure
    Unreachable(String),
    /// Probe did not answer within the per-probe timeout
    TimedOut(#[serde(with = "duration_millis")] Duration),
    /// Probe landed on a host outside the registry allow-list
    UntrustedHost(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedMediaKind => write!(f, "unsupported media kind"),
            Self::InvalidUrl(reason) => write!(f, "invalid url: {reason}"),
            Self::Unreachable(reason) => write!(f, "unreachable: {reason}"),
            Self::TimedOut(timeout) => write!(f, "timed out after {}ms", timeout.as_millis()),
            Self::UntrustedHost(host) => write!(f, "redirected to untrusted host '{host}'"),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// One failed provider in an attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub provider: String,
    /// Candidate URL, absent when none could be built
    pub url: Option<Url>,
    pub failure: ProbeFailure,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved {
        url: Url,
        provider: String,
        resolved_at: DateTime<Utc>,
    },
    /// Every provider failed; attempts are in priority order.
    Unresolved { attempts: Vec<AttemptRecord> },
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Providers tried without success, in order.
    pub fn attempted_providers(&self) -> Vec<&str> {
        match self {
            Self::Resolved { .. } => Vec::new(),
            Self::Unresolved { attempts } => {
                attempts.iter().map(|a| a.provider.as_str()).collect()
            }
        }
    }

    /// Failure reasons, aligned with [`Self::attempted_providers`].
    pub fn failures(&self) -> Vec<&ProbeFailure> {
        match self {
            Self::Resolved { .. } => Vec::new(),
            Self::Unresolved { attempts } => attempts.iter().map(|a| &a.failure).collect(),
        }
    }
}

/// Per-call resolution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub timeout_per_probe: Duration,
    /// Truncates the provider list, bounding worst-case latency
    pub max_providers: Option<usize>,
}

impl ResolutionPolicy {
    pub fn new(timeout_per_probe: Duration) -> Self {
        Self {
            timeout_per_probe,
            max_providers: None,
        }
    }

    pub fn with_max_providers(mut self, max_providers: usize) -> Self {
        self.max_providers = Some(max_providers);
        self
    }
}

impl From<&ProbeConfig> for ResolutionPolicy {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            timeout_per_probe: config.timeout,
            max_providers: config.max_providers,
        }
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

/// The caller cancelled a resolution before it finished.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Resolution cancelled after {} attempts", attempts.len())]
pub struct ResolutionCancelled {
    /// Providers that failed before cancellation
    pub attempts: Vec<AttemptRecord>,
}

/// Sequential, priority-ordered resolver.
#[derive(Clone)]
pub struct ResolutionEngine {
    registry: Arc<MirrorRegistry>,
    prober: Arc<dyn Prober>,
}

impl ResolutionEngine {
    pub fn new(registry: Arc<MirrorRegistry>, prober: Arc<dyn Prober>) -> Self {
        Self { registry, prober }
    }

    pub fn registry(&self) -> &Arc<MirrorRegistry> {
        &self.registry
    }

    /// Finds the first reachable provider for `content`.
    ///
    /// Providers are probed one at a time, at most once each. A probe that
    /// lands outside the registry allow-list counts as a failed attempt.
    /// `cancel` is checked before every probe and also aborts the probe in
    /// flight.
    ///
    /// # Errors
    /// - `ResolutionCancelled` - `cancel` fired before a provider answered
    pub async fn resolve(
        &self,
        content: &ContentRef,
        policy: &ResolutionPolicy,
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult, ResolutionCancelled> {
        let providers = self.registry.list_providers();
        let limit = policy.max_providers.unwrap_or(providers.len());
        let mut attempts = Vec::new();

        for provider in providers.iter().take(limit) {
            if cancel.is_cancelled() {
                tracing::debug!(%content, attempted = attempts.len(), "Resolution cancelled");
                return Err(ResolutionCancelled { attempts });
            }

            let url = match self.registry.build_url(provider, content) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(provider = provider.name(), error = %e, "Skipping provider");
                    let failure = match e {
                        RegistryError::UnsupportedMediaKind { .. } => {
                            ProbeFailure::UnsupportedMediaKind
                        }
                        other => ProbeFailure::InvalidUrl(other.to_string()),
                    };
                    attempts.push(AttemptRecord {
                        provider: provider.name().to_string(),
                        url: None,
                        failure,
                    });
                    continue;
                }
            };

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(%content, provider = provider.name(), "Probe aborted by cancellation");
                    return Err(ResolutionCancelled { attempts });
                }
                outcome = self.prober.probe(&url, policy.timeout_per_probe) => outcome,
            };

            let failure = match outcome {
                ProbeOutcome::Reachable(final_url) if !self.registry.is_allowed_host(&final_url) => {
                    tracing::warn!(%content, provider = provider.name(), url = %final_url, "Resolved URL outside mirror allow-list");
                    ProbeFailure::UntrustedHost(final_url.host_str().unwrap_or_default().to_string())
                }
                ProbeOutcome::Reachable(final_url) => {
                    tracing::info!(%content, provider = provider.name(), url = %final_url, "Source resolved");
                    return Ok(ResolutionResult::Resolved {
                        url: final_url,
                        provider: provider.name().to_string(),
                        resolved_at: Utc::now(),
                    });
                }
                ProbeOutcome::Unreachable(reason) => ProbeFailure::Unreachable(reason),
                ProbeOutcome::TimedOut => ProbeFailure::TimedOut(policy.timeout_per_probe),
            };

            tracing::debug!(%content, provider = provider.name(), %failure, "Provider failed, falling back");
            attempts.push(AttemptRecord {
                provider: provider.name().to_string(),
                url: Some(url),
                failure,
            });
        }

        tracing::warn!(%content, attempted = attempts.len(), "All providers exhausted");
        Ok(ResolutionResult::Unresolved { attempts })
    }
}
