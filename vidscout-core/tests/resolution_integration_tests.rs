//! Integration tests for source resolution.
//!
//! These tests drive the public `SourceResolver` API end to end against a
//! simulated mirror set: fallback ordering, attempt logs, cache lifetimes,
//! cancellation and concurrent callers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use vidscout_core::config::{CacheConfig, VidscoutConfig};
use vidscout_core::probe::SimulatedResponse;
use vidscout_core::resolution::{ProbeFailure, ResolutionEngine};
use vidscout_core::{
    ContentRef, MirrorProvider, MirrorRegistry, ResolutionFailure, ResolutionPolicy,
    ResolutionResult, SimulationProber, SourceResolver,
};

const POSITIVE_TTL: Duration = Duration::from_secs(600);
const NEGATIVE_TTL: Duration = Duration::from_secs(20);

/// Test fixture wiring a resolver to a scripted prober.
struct ResolverFixture {
    resolver: SourceResolver,
    prober: Arc<SimulationProber>,
}

impl ResolverFixture {
    /// Three providers p1 < p2 < p3 by priority.
    fn new(prober: SimulationProber) -> Self {
        let providers = ["p1.example", "p2.example", "p3.example"]
            .iter()
            .enumerate()
            .map(|(priority, host)| {
                MirrorProvider::new(
                    *host,
                    priority as i32,
                    Some(format!("https://{host}/embed/{{id}}")),
                    Some(format!("https://{host}/embed/tv/{{id}}/{{season}}/{{episode}}")),
                )
                .unwrap()
            })
            .collect();

        let config = VidscoutConfig {
            cache: CacheConfig {
                positive_ttl: POSITIVE_TTL,
                negative_ttl: NEGATIVE_TTL,
                max_entries: 32,
            },
            ..VidscoutConfig::for_testing()
        };

        let prober = Arc::new(prober);
        let registry = Arc::new(MirrorRegistry::new(providers).unwrap());
        let resolver = SourceResolver::from_config(&config, registry, prober.clone());

        Self { resolver, prober }
    }

    async fn resolve(&self, content: &ContentRef) -> Result<vidscout_core::ResolvedSource, ResolutionFailure> {
        self.resolver
            .resolve_source(content, self.resolver.default_policy(), &CancellationToken::new())
            .await
    }
}

#[tokio::test]
async fn test_nearest_reachable_provider_wins() {
    let fixture = ResolverFixture::new(
        SimulationProber::new()
            .with_host("p1.example", SimulatedResponse::Status(500))
            .with_host("p2.example", SimulatedResponse::Status(200))
            .with_host("p3.example", SimulatedResponse::Status(200)),
    );
    let content = ContentRef::episodic("1399", 2, 5).unwrap();

    let source = fixture.resolve(&content).await.unwrap();

    assert_eq!(source.provider, "p2.example");
    assert_eq!(source.url.as_str(), "https://p2.example/embed/tv/1399/2/5");
    assert_eq!(fixture.prober.probe_count(), 2);
    let hosts: Vec<_> = fixture
        .prober
        .probed_urls()
        .iter()
        .map(|url| url.host_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(hosts, ["p1.example", "p2.example"]);
}

#[tokio::test(start_paused = true)]
async fn test_all_providers_failing_yields_full_attempt_log() {
    let fixture = ResolverFixture::new(
        SimulationProber::new()
            .with_host("p1.example", SimulatedResponse::ConnectionRefused)
            .with_host("p2.example", SimulatedResponse::Hang)
            .with_host("p3.example", SimulatedResponse::Status(404)),
    );
    let content = ContentRef::movie("550").unwrap();

    let failure = fixture.resolve(&content).await.unwrap_err();

    let attempts = match &failure {
        ResolutionFailure::AllProvidersExhausted { attempts } => attempts,
        other => panic!("expected AllProvidersExhausted, got {other:?}"),
    };
    let providers: Vec<_> = attempts.iter().map(|a| a.provider.as_str()).collect();
    assert_eq!(providers, ["p1.example", "p2.example", "p3.example"]);
    assert!(matches!(attempts[1].failure, ProbeFailure::TimedOut(_)));
    assert_eq!(
        attempts[2].failure,
        ProbeFailure::Unreachable("HTTP 404".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_positive_cache_window() {
    let fixture = ResolverFixture::new(SimulationProber::all_reachable());
    let content = ContentRef::movie("550").unwrap();

    let first = fixture.resolve(&content).await.unwrap();
    let second = fixture.resolve(&content).await.unwrap();
    assert_eq!(fixture.prober.probe_count(), 1);
    assert!(!first.cached);
    assert!(second.cached);

    tokio::time::advance(POSITIVE_TTL + Duration::from_secs(1)).await;

    let third = fixture.resolve(&content).await.unwrap();
    assert!(!third.cached);
    assert_eq!(fixture.prober.probe_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_negative_cache_expires_without_invalidation() {
    let fixture = ResolverFixture::new(SimulationProber::new());
    let content = ContentRef::movie("550").unwrap();

    assert!(fixture.resolve(&content).await.is_err());
    assert_eq!(fixture.prober.probe_count(), 3);

    // Within the negative window the failure is replayed from cache.
    tokio::time::advance(NEGATIVE_TTL / 2).await;
    assert!(fixture.resolve(&content).await.is_err());
    assert_eq!(fixture.prober.probe_count(), 3);

    tokio::time::advance(NEGATIVE_TTL).await;
    assert!(fixture.resolve(&content).await.is_err());
    assert_eq!(fixture.prober.probe_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_further_probes() {
    let prober = Arc::new(
        SimulationProber::new()
            .with_host_latency(
                "p1.example",
                SimulatedResponse::Status(503),
                Duration::from_secs(10),
            )
            .with_host("p2.example", SimulatedResponse::Status(200)),
    );
    let registry = Arc::new(
        MirrorRegistry::new(vec![
            MirrorProvider::new("p1.example", 0, Some("https://p1.example/{id}".into()), None)
                .unwrap(),
            MirrorProvider::new("p2.example", 1, Some("https://p2.example/{id}".into()), None)
                .unwrap(),
        ])
        .unwrap(),
    );
    let engine = ResolutionEngine::new(registry, prober.clone());
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let content = ContentRef::movie("550").unwrap();
            let policy = ResolutionPolicy::new(Duration::from_secs(30));
            engine.resolve(&content, &policy, &cancel).await
        })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    let result = task.await.unwrap();

    assert!(result.is_err());
    let count_at_cancel = prober.probe_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(prober.probe_count(), count_at_cancel);
    assert_eq!(count_at_cancel, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_converge_on_one_entry() {
    let fixture = Arc::new(ResolverFixture::new(
        SimulationProber::new().with_host_latency(
            "p1.example",
            SimulatedResponse::Status(200),
            Duration::from_millis(150),
        ),
    ));
    let content = ContentRef::movie("550").unwrap();
    let mut callers = JoinSet::new();

    for _ in 0..8 {
        let fixture = fixture.clone();
        let content = content.clone();
        callers.spawn(async move { fixture.resolve(&content).await });
    }

    let mut urls = Vec::new();
    while let Some(joined) = callers.join_next().await {
        let source = joined.unwrap().unwrap();
        assert_eq!(source.provider, "p1.example");
        urls.push(source.url);
    }

    assert_eq!(urls.len(), 8);
    assert!(urls.iter().all(|url| url.as_str() == "https://p1.example/embed/550"));
    assert_eq!(fixture.resolver.cache_statistics().entries, 1);
    assert!(fixture.prober.probe_count() >= 1);

    // The surviving entry is a consistent resolved result.
    let cached = fixture.resolve(&content).await.unwrap();
    assert!(cached.cached);
    assert_eq!(cached.url.as_str(), "https://p1.example/embed/550");
}

#[tokio::test]
async fn test_unresolved_result_exposes_attempt_lists() {
    let registry = Arc::new(MirrorRegistry::default());
    let engine = ResolutionEngine::new(registry, Arc::new(SimulationProber::new()));
    let content = ContentRef::movie("550").unwrap();

    let result = engine
        .resolve(&content, &ResolutionPolicy::new(Duration::from_millis(100)), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(result, ResolutionResult::Unresolved { .. }));
    assert_eq!(
        result.attempted_providers(),
        ["vidsrc.icu", "vidsrc.stream", "vidsrc.me", "vidsrc.to"]
    );
    assert_eq!(result.failures().len(), 4);
}
