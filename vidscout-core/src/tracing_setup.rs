//! Logging for the resolution service
//!
//! Operators pick how much of the fallback chain they see on the console.
//! Independently of that choice, every run writes a complete trace of probe
//! attempts, cache decisions and HTTP requests to `<logs>/vidscout-last-run.log`.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run trace log inside the logs directory.
pub const LAST_RUN_LOG: &str = "vidscout-last-run.log";

/// Directives for the run log: all of our crates and request spans in full,
/// dependencies only when they have something to say.
const RUN_LOG_DIRECTIVES: &str =
    "info,vidscout_core=trace,vidscout_web=trace,vidscout=trace,tower_http=debug";

/// How much of a resolution the console shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogVerbosity {
    /// Failures and exhausted resolutions only
    Quiet,
    /// Startup, resolved sources and request failures
    #[default]
    Normal,
    /// Adds every probe outcome, fallback step and cache hit
    Probes,
    /// Everything, including HTTP client internals
    Trace,
}

impl LogVerbosity {
    /// Console filter directives for this verbosity.
    ///
    /// ```
    /// use vidscout_core::tracing_setup::LogVerbosity;
    ///
    /// assert!(LogVerbosity::Probes.console_directives().contains("vidscout_core=debug"));
    /// ```
    pub fn console_directives(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info,tower_http=warn",
            Self::Probes => "info,vidscout_core=debug,vidscout_web=debug,tower_http=info",
            Self::Trace => "trace",
        }
    }
}

/// Installs the console and run-log layers.
///
/// `RUST_LOG`, when set, replaces the console directives derived from
/// `verbosity`. The run log under `logs_dir` (default `./logs`) is truncated
/// on every start; its path is returned. An already installed global
/// subscriber is left in place.
///
/// # Errors
///
/// - `std::io::Error` - Logs directory or run log cannot be created
pub fn init_tracing(verbosity: LogVerbosity, logs_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let run_log_path = logs_path.join(LAST_RUN_LOG);
    let run_log = File::create(&run_log_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.console_directives()));

    // Probe results carry their own url/provider fields; targets are noise here.
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(console_filter);

    let run_log_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(run_log)
        .with_filter(EnvFilter::new(RUN_LOG_DIRECTIVES));

    if tracing_subscriber::registry()
        .with(console)
        .with(run_log_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed, keeping it");
    }

    tracing::info!(?verbosity, run_log = %run_log_path.display(), "Logging ready");
    Ok(run_log_path)
}
