//! Public entry point for source resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::cache::{CacheKey, CacheStatistics, ResolutionCache};
use super::engine::{AttemptRecord, ResolutionEngine, ResolutionPolicy, ResolutionResult};
use crate::config::{CacheConfig, VidscoutConfig};
use crate::content::{ContentError, ContentRef, MediaKind};
use crate::probe::Prober;
use crate::registry::MirrorRegistry;

/// A playable source handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSource {
    pub url: Url,
    pub provider: String,
    pub resolved_at: DateTime<Utc>,
    /// Served from the cache without probing
    pub cached: bool,
}

/// Caller-visible resolution failures. None of these are crashes: the
/// rendering layer shows "no playable source" with a retry affordance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    #[error("Invalid content reference: {reason}")]
    InvalidContentRef { reason: String },

    #[error("No available streaming sources found ({} providers tried)", attempts.len())]
    AllProvidersExhausted { attempts: Vec<AttemptRecord> },

    #[error("Resolution cancelled")]
    Cancelled { attempts: Vec<AttemptRecord> },
}

impl ResolutionFailure {
    /// Attempt log carried by the failure, empty when none applies.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::AllProvidersExhausted { attempts } | Self::Cancelled { attempts } => attempts,
            Self::InvalidContentRef { .. } => &[],
        }
    }
}

impl From<ContentError> for ResolutionFailure {
    fn from(error: ContentError) -> Self {
        match error {
            ContentError::InvalidContentRef { reason } => Self::InvalidContentRef { reason },
        }
    }
}

/// Cache-backed resolver the rendering layer depends on.
#[derive(Clone)]
pub struct SourceResolver {
    engine: ResolutionEngine,
    cache: ResolutionCache,
    cache_config: CacheConfig,
    default_policy: ResolutionPolicy,
}

impl SourceResolver {
    pub fn new(
        engine: ResolutionEngine,
        cache: ResolutionCache,
        cache_config: CacheConfig,
        default_policy: ResolutionPolicy,
    ) -> Self {
        Self {
            engine,
            cache,
            cache_config,
            default_policy,
        }
    }

    /// Wires a resolver from configuration around `prober`.
    pub fn from_config(
        config: &VidscoutConfig,
        registry: Arc<MirrorRegistry>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self::new(
            ResolutionEngine::new(registry, prober),
            ResolutionCache::from_config(&config.cache),
            config.cache.clone(),
            ResolutionPolicy::from(&config.probe),
        )
    }

    pub fn registry(&self) -> &Arc<MirrorRegistry> {
        self.engine.registry()
    }

    pub fn default_policy(&self) -> &ResolutionPolicy {
        &self.default_policy
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Drops any cached result for `content`, forcing the next call to probe.
    pub fn invalidate(&self, content: &ContentRef) -> bool {
        self.cache.invalidate(&CacheKey::from(content))
    }

    /// Resolves loose request parameters with the default policy.
    ///
    /// # Errors
    /// - `ResolutionFailure::InvalidContentRef` - Parameters do not form a
    ///   valid reference
    /// - see [`Self::resolve_source`]
    pub async fn resolve_request(
        &self,
        content_id: &str,
        kind: MediaKind,
        season: Option<u32>,
        episode: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSource, ResolutionFailure> {
        let content = ContentRef::new(content_id, kind, season, episode)?;
        self.resolve_source(&content, &self.default_policy, cancel)
            .await
    }

    /// Resolves `content` to a playable source, consulting the cache first.
    ///
    /// Both outcomes are cached: resolved sources for the positive TTL,
    /// exhausted resolutions for the negative TTL. Cancelled resolutions are
    /// never cached.
    ///
    /// # Errors
    /// - `ResolutionFailure::InvalidContentRef` - Reference fails validation
    /// - `ResolutionFailure::AllProvidersExhausted` - No provider answered
    /// - `ResolutionFailure::Cancelled` - `cancel` fired mid-resolution
    pub async fn resolve_source(
        &self,
        content: &ContentRef,
        policy: &ResolutionPolicy,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSource, ResolutionFailure> {
        content.validate()?;

        let key = CacheKey::from(content);
        if let Some(result) = self.cache.get(&key) {
            return Self::into_source(result, true);
        }

        let result = self
            .engine
            .resolve(content, policy, cancel)
            .await
            .map_err(|cancelled| ResolutionFailure::Cancelled {
                attempts: cancelled.attempts,
            })?;

        let ttl = match &result {
            ResolutionResult::Resolved { .. } => self.cache_config.positive_ttl,
            ResolutionResult::Unresolved { .. } => self.cache_config.negative_ttl,
        };

        self.cache.put(key, result.clone(), ttl);
        Self::into_source(result, false)
    }

    fn into_source(
        result: ResolutionResult,
        cached: bool,
    ) -> Result<ResolvedSource, ResolutionFailure> {
        match result {
            ResolutionResult::Resolved {
                url,
                provider,
                resolved_at,
            } => Ok(ResolvedSource {
                url,
                provider,
                resolved_at,
                cached,
            }),
            ResolutionResult::Unresolved { attempts } => {
                Err(ResolutionFailure::AllProvidersExhausted { attempts })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::probe::{ProbeOutcome, SimulatedResponse, SimulationProber};
    use crate::resolution::engine::ProbeFailure;

    fn resolver(prober: Arc<dyn Prober>) -> SourceResolver {
        let config = VidscoutConfig::for_testing();
        SourceResolver::from_config(&config, Arc::new(MirrorRegistry::default()), prober)
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_probing() {
        let prober = Arc::new(SimulationProber::all_reachable());
        let resolver = resolver(prober.clone());

        let result = resolver
            .resolve_request("1399", MediaKind::Episodic, Some(1), None, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ResolutionFailure::InvalidContentRef { .. })));
        assert_eq!(prober.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let prober = Arc::new(
            SimulationProber::new().with_host("vidsrc.me", SimulatedResponse::Status(200)),
        );
        let resolver = resolver(prober.clone());
        let content = ContentRef::movie("550").unwrap();
        let cancel = CancellationToken::new();

        let first = resolver
            .resolve_source(&content, resolver.default_policy(), &cancel)
            .await
            .unwrap();
        let second = resolver
            .resolve_source(&content, resolver.default_policy(), &cancel)
            .await
            .unwrap();

        assert_eq!(first.provider, "vidsrc.me");
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.url, second.url);
        assert_eq!(prober.probe_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_failure_carries_attempts() {
        let prober = Arc::new(SimulationProber::new());
        let resolver = resolver(prober.clone());

        let failure = resolver
            .resolve_request("550", MediaKind::Movie, None, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.attempts().len(), 4);
        assert_eq!(failure.attempts()[0].provider, "vidsrc.icu");

        // Negative result is cached
        let again = resolver
            .resolve_request("550", MediaKind::Movie, None, None, &CancellationToken::new())
            .await;
        assert!(matches!(again, Err(ResolutionFailure::AllProvidersExhausted { .. })));
        assert_eq!(prober.probe_count(), 4);
    }

    /// Prober where listed hosts redirect off the registry and every other
    /// host answers in place.
    struct RedirectingProber {
        redirected_hosts: Vec<&'static str>,
    }

    #[async_trait]
    impl Prober for RedirectingProber {
        async fn probe(&self, url: &Url, _timeout: Duration) -> ProbeOutcome {
            match url.host_str() {
                Some(host) if self.redirected_hosts.contains(&host) => ProbeOutcome::Reachable(
                    Url::parse("https://cdn.elsewhere.example/player").unwrap(),
                ),
                _ => ProbeOutcome::Reachable(url.clone()),
            }
        }
    }

    #[tokio::test]
    async fn test_off_registry_redirect_falls_back_to_next_mirror() {
        let resolver = resolver(Arc::new(RedirectingProber {
            redirected_hosts: vec!["vidsrc.icu"],
        }));
        let content = ContentRef::movie("550").unwrap();

        let source = resolver
            .resolve_source(&content, resolver.default_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.provider, "vidsrc.stream");
        assert_eq!(source.url.as_str(), "https://vidsrc.stream/embed/550");
        assert_eq!(resolver.cache_statistics().entries, 1);
    }

    #[tokio::test]
    async fn test_all_off_registry_redirects_exhaust() {
        let resolver = resolver(Arc::new(RedirectingProber {
            redirected_hosts: vec!["vidsrc.icu", "vidsrc.stream", "vidsrc.me", "vidsrc.to"],
        }));

        let failure = resolver
            .resolve_request("550", MediaKind::Movie, None, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.attempts().len(), 4);
        assert!(failure.attempts().iter().all(|attempt| {
            attempt.failure == ProbeFailure::UntrustedHost("cdn.elsewhere.example".to_string())
        }));
    }

    #[tokio::test]
    async fn test_cancelled_resolution_not_cached() {
        let prober = Arc::new(SimulationProber::all_reachable());
        let resolver = resolver(prober.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = resolver
            .resolve_request("550", MediaKind::Movie, None, None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(failure, ResolutionFailure::Cancelled { .. }));
        assert_eq!(resolver.cache_statistics().entries, 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reprobe() {
        let prober = Arc::new(SimulationProber::all_reachable());
        let resolver = resolver(prober.clone());
        let content = ContentRef::movie("550").unwrap();
        let cancel = CancellationToken::new();

        resolver
            .resolve_source(&content, resolver.default_policy(), &cancel)
            .await
            .unwrap();
        assert!(resolver.invalidate(&content));
        resolver
            .resolve_source(&content, resolver.default_policy(), &cancel)
            .await
            .unwrap();

        assert_eq!(prober.probe_count(), 2);
    }
}
