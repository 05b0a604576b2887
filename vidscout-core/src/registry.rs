//! Mirror registry: the ordered set of providers tried during resolution.
//!
//! The registry is built once from configuration and never mutated. Its
//! ordering is the fallback priority, and its templates define which hosts
//! a resolved URL may point at.

use std::collections::BTreeSet;

use serde::Serialize;
use url::Url;

use crate::config::MirrorConfig;
use crate::content::{ContentRef, MediaKind};

/// Errors raised by registry construction and URL building.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Provider has no template for the requested kind of media.
    #[error("Provider '{provider}' does not serve {kind} content")]
    UnsupportedMediaKind {
        /// Provider that was asked
        provider: String,
        /// Kind it cannot express
        kind: MediaKind,
    },

    /// Template does not produce an absolute http(s) URL.
    #[error("Invalid URL template for provider '{provider}': {reason}")]
    InvalidTemplate {
        /// Provider owning the template
        provider: String,
        /// Why the URL was rejected
        reason: String,
    },

    /// No mirrors were configured.
    #[error("Mirror registry has no providers")]
    EmptyRegistry,
}

/// One mirror with its per-kind URL templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorProvider {
    name: String,
    priority: i32,
    movie_template: Option<String>,
    episode_template: Option<String>,
}

impl MirrorProvider {
    /// Creates a provider from absolute URL templates.
    ///
    /// # Errors
    /// - `RegistryError::InvalidTemplate` - A template does not yield an
    ///   absolute http(s) URL with a host
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        movie_template: Option<String>,
        episode_template: Option<String>,
    ) -> Result<Self, RegistryError> {
        let provider = Self {
            name: name.into(),
            priority,
            movie_template,
            episode_template,
        };

        for template in [&provider.movie_template, &provider.episode_template]
            .into_iter()
            .flatten()
        {
            provider.render(template, "0", 1, 1)?;
        }

        Ok(provider)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether this provider has a template for `kind`.
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.template_for(kind).is_some()
    }

    fn template_for(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Movie => self.movie_template.as_deref(),
            MediaKind::Episodic => self.episode_template.as_deref(),
        }
    }

    /// Hosts reachable through this provider's templates.
    fn hosts(&self) -> impl Iterator<Item = String> + '_ {
        [&self.movie_template, &self.episode_template]
            .into_iter()
            .flatten()
            .filter_map(|template| self.render(template, "0", 1, 1).ok())
            .filter_map(|url| url.host_str().map(str::to_ascii_lowercase))
    }

    fn render(
        &self,
        template: &str,
        content_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Url, RegistryError> {
        let raw = template
            .replace("{id}", &urlencoding::encode(content_id))
            .replace("{season}", &season.to_string())
            .replace("{episode}", &episode.to_string());

        let url = Url::parse(&raw).map_err(|e| RegistryError::InvalidTemplate {
            provider: self.name.clone(),
            reason: format!("{raw}: {e}"),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(RegistryError::InvalidTemplate {
                provider: self.name.clone(),
                reason: format!("{raw}: expected an absolute http(s) URL"),
            });
        }

        Ok(url)
    }
}

/// Immutable, priority-ordered list of mirror providers.
#[derive(Debug, Clone)]
pub struct MirrorRegistry {
    providers: Vec<MirrorProvider>,
    allowed_hosts: BTreeSet<String>,
}

impl MirrorRegistry {
    /// Builds a registry from providers, ordering them by ascending priority.
    /// Providers with equal priority keep their given order.
    ///
    /// # Errors
    /// - `RegistryError::EmptyRegistry` - `providers` is empty
    pub fn new(mut providers: Vec<MirrorProvider>) -> Result<Self, RegistryError> {
        if providers.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }

        providers.sort_by_key(MirrorProvider::priority);
        let allowed_hosts = providers.iter().flat_map(MirrorProvider::hosts).collect();

        Ok(Self {
            providers,
            allowed_hosts,
        })
    }

    /// Builds a registry from mirror configuration. A mirror without an
    /// explicit priority takes its position in the list.
    ///
    /// # Errors
    /// - `RegistryError::EmptyRegistry` - No mirrors configured
    /// - `RegistryError::InvalidTemplate` - A base URL or path does not form a
    ///   valid http(s) URL
    pub fn from_config(mirrors: &[MirrorConfig]) -> Result<Self, RegistryError> {
        let providers = mirrors
            .iter()
            .enumerate()
            .map(|(position, mirror)| {
                let base = mirror.base_url.trim_end_matches('/');
                let join = |path: &String| format!("{base}/{}", path.trim_start_matches('/'));
                let priority = mirror
                    .priority
                    .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX));

                MirrorProvider::new(
                    mirror.name.clone(),
                    priority,
                    mirror.movie_path.as_ref().map(&join),
                    mirror.episode_path.as_ref().map(&join),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(providers)
    }

    /// Providers in fallback order.
    pub fn list_providers(&self) -> &[MirrorProvider] {
        &self.providers
    }

    /// Builds the candidate URL for `content` on `provider`.
    ///
    /// # Errors
    /// - `RegistryError::UnsupportedMediaKind` - Provider cannot serve this kind
    /// - `RegistryError::InvalidTemplate` - Substitution produced an invalid URL
    pub fn build_url(
        &self,
        provider: &MirrorProvider,
        content: &ContentRef,
    ) -> Result<Url, RegistryError> {
        let template =
            provider
                .template_for(content.kind())
                .ok_or_else(|| RegistryError::UnsupportedMediaKind {
                    provider: provider.name.clone(),
                    kind: content.kind(),
                })?;

        provider.render(
            template,
            content.content_id(),
            content.season().unwrap_or(1),
            content.episode().unwrap_or(1),
        )
    }

    /// Every provider's candidate URL for `content`, in fallback order,
    /// without probing.
    pub fn candidate_urls(
        &self,
        content: &ContentRef,
    ) -> Vec<(&str, Result<Url, RegistryError>)> {
        self.providers
            .iter()
            .map(|provider| (provider.name(), self.build_url(provider, content)))
            .collect()
    }

    /// Lowercased hosts that resolved URLs may point at.
    pub fn allowed_hosts(&self) -> &BTreeSet<String> {
        &self.allowed_hosts
    }

    /// Whether `url`'s host belongs to a registered provider.
    pub fn is_allowed_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.allowed_hosts.contains(&host.to_ascii_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for MirrorRegistry {
    /// The built-in vidsrc mirror set.
    fn default() -> Self {
        let providers = crate::config::MirrorsConfig::default()
            .mirrors
            .iter()
            .enumerate()
            .map(|(position, mirror)| MirrorProvider {
                name: mirror.name.clone(),
                priority: position as i32,
                movie_template: Some(format!("{}/embed/{{id}}", mirror.base_url)),
                episode_template: Some(format!(
                    "{}/embed/tv/{{id}}/{{season}}/{{episode}}",
                    mirror.base_url
                )),
            })
            .collect::<Vec<_>>();
        let allowed_hosts = providers.iter().flat_map(MirrorProvider::hosts).collect();

        Self {
            providers,
            allowed_hosts,
        }
    }
}
