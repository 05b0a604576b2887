//! Centralized configuration for Vidscout.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Browser-like identification sent with every probe. Some mirrors refuse
/// requests that do not look like they come from a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Path template for single-part titles, relative to a mirror base URL.
pub const DEFAULT_MOVIE_PATH: &str = "/embed/{id}";

/// Path template for episodic titles, relative to a mirror base URL.
pub const DEFAULT_EPISODE_PATH: &str = "/embed/tv/{id}/{season}/{episode}";

/// Central configuration for all Vidscout components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct VidscoutConfig {
    pub probe: ProbeConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub mirrors: MirrorsConfig,
}

/// Probe executor and resolution loop configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Upper bound for a single existence check
    pub timeout: Duration,
    /// Value of the identifying `User-Agent` header
    pub user_agent: String,
    /// Redirect hops followed before a probe is declared unreachable
    pub max_redirects: usize,
    /// Only the first N providers are tried when set
    pub max_providers: Option<usize>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
            max_providers: None,
        }
    }
}

/// Resolution cache sizing and expiry.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a successful resolution
    pub positive_ttl: Duration,
    /// Lifetime of an exhausted resolution
    pub negative_ttl: Duration,
    /// Entry count above which the earliest-expiring entries are evicted
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            positive_ttl: Duration::from_secs(30 * 60),
            negative_ttl: Duration::from_secs(30),
            max_entries: 1024,
        }
    }
}

/// HTTP API bind address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// One configured mirror.
///
/// Templates are joined to `base_url` and may use the `{id}`, `{season}`
/// and `{episode}` placeholders. A `None` template means the mirror cannot
/// serve that kind of media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub name: String,
    pub base_url: String,
    pub priority: Option<i32>,
    pub movie_path: Option<String>,
    pub episode_path: Option<String>,
}

impl MirrorConfig {
    /// Mirror serving both kinds with the standard embed paths, named after
    /// its host.
    pub fn standard(base_url: &str) -> Self {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let name = base_url
            .split("://")
            .nth(1)
            .unwrap_or(&base_url)
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            name,
            base_url,
            priority: None,
            movie_path: Some(DEFAULT_MOVIE_PATH.to_string()),
            episode_path: Some(DEFAULT_EPISODE_PATH.to_string()),
        }
    }
}

/// Ordered mirror list. Position is the fallback priority unless a mirror
/// sets one explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorsConfig {
    pub mirrors: Vec<MirrorConfig>,
}

impl Default for MirrorsConfig {
    fn default() -> Self {
        Self {
            mirrors: [
                "https://vidsrc.icu",
                "https://vidsrc.stream",
                "https://vidsrc.me",
                "https://vidsrc.to",
            ]
            .into_iter()
            .map(MirrorConfig::standard)
            .collect(),
        }
    }
}

impl MirrorsConfig {
    /// Parses a comma-separated list of base URLs.
    pub fn from_base_urls(list: &str) -> Self {
        Self {
            mirrors: list
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(MirrorConfig::standard)
                .collect(),
        }
    }
}

impl VidscoutConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Probe configuration overrides
        if let Some(ms) = env_parse::<u64>("VIDSCOUT_PROBE_TIMEOUT_MS") {
            config.probe.timeout = Duration::from_millis(ms);
        }

        if let Some(count) = env_parse::<usize>("VIDSCOUT_MAX_PROVIDERS") {
            config.probe.max_providers = Some(count);
        }

        if let Some(hops) = env_parse::<usize>("VIDSCOUT_MAX_REDIRECTS") {
            config.probe.max_redirects = hops;
        }

        if let Ok(agent) = std::env::var("VIDSCOUT_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.probe.user_agent = agent;
            }
        }

        // Cache configuration overrides
        if let Some(secs) = env_parse::<u64>("VIDSCOUT_CACHE_POSITIVE_TTL_SECS") {
            config.cache.positive_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("VIDSCOUT_CACHE_NEGATIVE_TTL_SECS") {
            config.cache.negative_ttl = Duration::from_secs(secs);
        }

        if let Some(entries) = env_parse::<usize>("VIDSCOUT_CACHE_MAX_ENTRIES") {
            config.cache.max_entries = entries;
        }

        // Server configuration overrides
        if let Ok(host) = std::env::var("VIDSCOUT_HOST") {
            config.server.host = host;
        }

        if let Some(port) = env_parse::<u16>("VIDSCOUT_PORT") {
            config.server.port = port;
        }

        // Mirror list override
        if let Ok(list) = std::env::var("VIDSCOUT_MIRRORS") {
            let mirrors = MirrorsConfig::from_base_urls(&list);
            if !mirrors.mirrors.is_empty() {
                config.mirrors = mirrors;
            }
        }

        config
    }

    /// Creates a configuration optimized for testing: short probe timeout,
    /// small cache.
    pub fn for_testing() -> Self {
        Self {
            probe: ProbeConfig {
                timeout: Duration::from_millis(200),
                ..Default::default()
            },
            cache: CacheConfig {
                positive_ttl: Duration::from_secs(60),
                negative_ttl: Duration::from_secs(5),
                max_entries: 16,
            },
            ..Default::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}
