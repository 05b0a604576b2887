//! Simulated prober for deterministic testing and offline development

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use super::{ProbeOutcome, Prober};

/// Scripted answer of a simulated mirror host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedResponse {
    /// Respond with this HTTP status
    Status(u16),
    /// Refuse the connection
    ConnectionRefused,
    /// Never answer
    Hang,
}

#[derive(Debug, Clone, Copy)]
struct HostBehavior {
    response: SimulatedResponse,
    latency: Duration,
}

/// Simulated prober
///
/// Answers probes from per-host scripts without real network calls. Counts
/// and records every probe so tests can assert on what was tried.
pub struct SimulationProber {
    hosts: HashMap<String, HostBehavior>,
    fallback: HostBehavior,
    failure_rate: f32,
    probe_count: AtomicUsize,
    probe_log: Mutex<Vec<Url>>,
}

impl SimulationProber {
    /// Creates a prober where unknown hosts answer 404 immediately.
    pub fn new() -> Self {
        Self {
            hosts: HashMap::new(),
            fallback: HostBehavior {
                response: SimulatedResponse::Status(404),
                latency: Duration::ZERO,
            },
            failure_rate: 0.0,
            probe_count: AtomicUsize::new(0),
            probe_log: Mutex::new(Vec::new()),
        }
    }

    /// Creates a prober where every host answers 200 after a short delay.
    /// Used by development mode.
    pub fn all_reachable() -> Self {
        let mut prober = Self::new();
        prober.fallback = HostBehavior {
            response: SimulatedResponse::Status(200),
            latency: Duration::from_millis(50),
        };
        prober
    }

    /// Scripts `host` to answer with `response` immediately.
    pub fn with_host(self, host: &str, response: SimulatedResponse) -> Self {
        self.with_host_latency(host, response, Duration::ZERO)
    }

    /// Scripts `host` to answer with `response` after `latency`.
    pub fn with_host_latency(
        mut self,
        host: &str,
        response: SimulatedResponse,
        latency: Duration,
    ) -> Self {
        self.hosts.insert(
            host.to_ascii_lowercase(),
            HostBehavior { response, latency },
        );
        self
    }

    /// Configure random failure rate (0.0 = never fail, 1.0 = always fail)
    pub fn configure_failure_rate(&mut self, rate: f32) {
        self.failure_rate = rate.clamp(0.0, 1.0);
    }

    /// Number of probes started so far.
    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// URLs probed so far, in order.
    pub fn probed_urls(&self) -> Vec<Url> {
        self.probe_log.lock().clone()
    }

    fn behavior_for(&self, url: &Url) -> HostBehavior {
        url.host_str()
            .and_then(|host| self.hosts.get(&host.to_ascii_lowercase()))
            .copied()
            .unwrap_or(self.fallback)
    }

    fn should_fail(&self) -> bool {
        let fail = self.failure_rate > 0.0 && rand::random::<f32>() < self.failure_rate;
        if fail {
            tracing::debug!("Simulating network failure");
        }
        fail
    }
}

impl Default for SimulationProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for SimulationProber {
    async fn probe(&self, url: &Url, timeout: Duration) -> ProbeOutcome {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        self.probe_log.lock().push(url.clone());

        let behavior = self.behavior_for(url);
        let answer = async {
            match behavior.response {
                SimulatedResponse::Hang => std::future::pending::<()>().await,
                _ => tokio::time::sleep(behavior.latency).await,
            }
        };

        if tokio::time::timeout(timeout, answer).await.is_err() {
            tracing::debug!("Simulation: probe of {} timed out", url);
            return ProbeOutcome::TimedOut;
        }

        if self.should_fail() {
            return ProbeOutcome::Unreachable(format!("Simulated network failure: {url}"));
        }

        match behavior.response {
            SimulatedResponse::Status(code) if (200..300).contains(&code) => {
                ProbeOutcome::Reachable(url.clone())
            }
            SimulatedResponse::Status(code) => ProbeOutcome::Unreachable(format!("HTTP {code}")),
            SimulatedResponse::ConnectionRefused => {
                ProbeOutcome::Unreachable(format!("Failed to connect: {url}"))
            }
            SimulatedResponse::Hang => ProbeOutcome::TimedOut,
        }
    }
}
