//! Service wiring shared by the HTTP server and the CLI.
//!
//! Components are assembled once from configuration and runtime mode, then
//! handed to the web layer, which stays mode-agnostic.

use std::sync::Arc;

use crate::config::VidscoutConfig;
use crate::mode::RuntimeMode;
use crate::registry::MirrorRegistry;
use crate::resolution::SourceResolver;
use crate::Result;

/// Pre-configured runtime services.
#[derive(Clone)]
pub struct ServerComponents {
    pub resolver: SourceResolver,
    pub mode: RuntimeMode,
}

impl ServerComponents {
    /// Builds the registry, prober and resolver for `mode`.
    ///
    /// # Errors
    /// - `VidscoutError::Registry` - Mirror configuration is empty or invalid
    /// - `VidscoutError::Probe` - HTTP client setup failed
    pub fn build(config: &VidscoutConfig, mode: RuntimeMode) -> Result<Self> {
        let registry = Arc::new(MirrorRegistry::from_config(&config.mirrors.mirrors)?);
        let prober = mode.build_prober(&config.probe)?;

        tracing::info!(
            %mode,
            providers = registry.len(),
            timeout_ms = config.probe.timeout.as_millis() as u64,
            "Resolution service ready"
        );

        Ok(Self {
            resolver: SourceResolver::from_config(config, registry, prober),
            mode,
        })
    }

    pub fn registry(&self) -> &Arc<MirrorRegistry> {
        self.resolver.registry()
    }
}

impl std::fmt::Debug for ServerComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerComponents")
            .field("mode", &self.mode)
            .field("providers", &self.registry().len())
            .finish()
    }
}
