//! Vidscout Core - Mirror source resolution
//!
//! Finds a working embed endpoint for a title across a set of unreliable
//! mirror providers: an ordered mirror registry, a probe executor, a
//! sequential fallback engine, a TTL result cache and the facade the
//! rendering layer calls.

pub mod config;
pub mod content;
pub mod mode;
pub mod probe;
pub mod registry;
pub mod resolution;
pub mod server_components;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::VidscoutConfig;
pub use content::{ContentError, ContentRef, MediaKind};
pub use mode::RuntimeMode;
pub use probe::{HttpProber, ProbeError, ProbeOutcome, Prober, SimulationProber};
pub use registry::{MirrorProvider, MirrorRegistry, RegistryError};
pub use resolution::{
    AttemptRecord, ResolutionFailure, ResolutionPolicy, ResolutionResult, ResolvedSource,
    SourceResolver,
};
pub use server_components::ServerComponents;

/// Core errors that can bubble up from any Vidscout subsystem.
///
/// Per-provider probe failures never appear here; they are absorbed by the
/// resolution engine and reported through attempt logs.
#[derive(Debug, thiserror::Error)]
pub enum VidscoutError {
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionFailure),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VidscoutError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            VidscoutError::Content(ContentError::InvalidContentRef { reason }) => {
                format!("Invalid title reference: {reason}")
            }
            VidscoutError::Resolution(failure) => match failure {
                ResolutionFailure::InvalidContentRef { reason } => {
                    format!("Invalid title reference: {reason}")
                }
                ResolutionFailure::AllProvidersExhausted { attempts } => format!(
                    "No playable source found ({} mirrors tried), please retry later",
                    attempts.len()
                ),
                ResolutionFailure::Cancelled { .. } => "Lookup was cancelled".to_string(),
            },
            VidscoutError::Registry(_) | VidscoutError::Configuration { .. } => {
                "Configuration error occurred".to_string()
            }
            VidscoutError::Probe(_) => "Network client could not be initialized".to_string(),
            VidscoutError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input or configuration.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VidscoutError::Content(_)
                | VidscoutError::Registry(_)
                | VidscoutError::Configuration { .. }
                | VidscoutError::Resolution(ResolutionFailure::InvalidContentRef { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, VidscoutError>;
