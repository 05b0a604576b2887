//! Runtime mode selection for Vidscout.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::VidscoutError;
use crate::config::ProbeConfig;
use crate::probe::{HttpProber, ProbeError, Prober, SimulationProber};

/// Runtime mode for the resolution service.
///
/// Production probes real mirrors over HTTP. Development answers every probe
/// from a simulation so the service and its API can be exercised offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuntimeMode {
    /// Probe real mirror hosts
    #[default]
    Production,
    /// Simulated mirrors that always answer
    Development,
}

impl RuntimeMode {
    /// Name used on the command line and in health reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Builds the prober matching this mode.
    ///
    /// # Errors
    /// - `ProbeError::ClientBuild` - HTTP client setup failed (production only)
    pub fn build_prober(self, config: &ProbeConfig) -> Result<Arc<dyn Prober>, ProbeError> {
        match self {
            Self::Production => Ok(Arc::new(HttpProber::new(config)?)),
            Self::Development => Ok(Arc::new(SimulationProber::all_reachable())),
        }
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = VidscoutError;

    /// Accepts the flag names plus `live` and `offline`/`simulated`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "live" => Ok(Self::Production),
            "development" | "dev" | "offline" | "simulated" => Ok(Self::Development),
            other => Err(VidscoutError::Configuration {
                reason: format!("unknown runtime mode '{other}', expected production or development"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert!(matches!("prod".parse::<RuntimeMode>(), Ok(RuntimeMode::Production)));
        assert!(matches!(" Offline ".parse::<RuntimeMode>(), Ok(RuntimeMode::Development)));
        assert!(matches!(
            "staging".parse::<RuntimeMode>(),
            Err(VidscoutError::Configuration { .. })
        ));
        assert_eq!(RuntimeMode::default(), RuntimeMode::Production);
        assert_eq!(RuntimeMode::Development.to_string(), "development");
    }

    #[tokio::test]
    async fn test_development_prober_answers_offline() {
        let prober = RuntimeMode::Development
            .build_prober(&ProbeConfig::default())
            .unwrap();
        let url = url::Url::parse("https://vidsrc.to/embed/550").unwrap();

        let outcome = prober.probe(&url, std::time::Duration::from_secs(1)).await;
        assert!(outcome.is_reachable());
    }
}
