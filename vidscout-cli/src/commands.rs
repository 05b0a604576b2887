//! CLI command implementations

use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use vidscout_core::config::VidscoutConfig;
use vidscout_core::{
    ContentRef, MediaKind, MirrorRegistry, ResolutionFailure, RuntimeMode, ServerComponents,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the resolution API server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Runtime mode: production or development
        #[arg(long, default_value = "production")]
        mode: RuntimeMode,
    },
    /// Resolve a title once and print the embed URL
    Resolve {
        /// Catalog identifier of the title
        tmdb_id: String,
        /// Season number (episodic titles)
        #[arg(long, requires = "episode")]
        season: Option<u32>,
        /// Episode number (episodic titles)
        #[arg(long, requires = "season")]
        episode: Option<u32>,
        /// Per-probe timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Probe at most this many mirrors
        #[arg(long)]
        max_providers: Option<usize>,
        /// Runtime mode: production or development
        #[arg(long, default_value = "production")]
        mode: RuntimeMode,
    },
    /// List configured mirrors in probe order
    Providers,
    /// Print candidate URLs for a title without probing
    Candidates {
        /// Catalog identifier of the title
        tmdb_id: String,
        /// Season number (episodic titles)
        #[arg(long, requires = "episode")]
        season: Option<u32>,
        /// Episode number (episodic titles)
        #[arg(long, requires = "season")]
        episode: Option<u32>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let config = VidscoutConfig::from_env();

    match command {
        Commands::Server { host, port, mode } => start_server(config, host, port, mode).await,
        Commands::Resolve {
            tmdb_id,
            season,
            episode,
            timeout_ms,
            max_providers,
            mode,
        } => {
            let mut config = config;
            if let Some(ms) = timeout_ms {
                config.probe.timeout = Duration::from_millis(ms);
            }
            if max_providers.is_some() {
                config.probe.max_providers = max_providers;
            }
            let content = content_ref(&tmdb_id, season, episode)?;
            resolve_title(config, content, mode).await
        }
        Commands::Providers => list_providers(&config),
        Commands::Candidates {
            tmdb_id,
            season,
            episode,
        } => show_candidates(&config, &content_ref(&tmdb_id, season, episode)?),
    }
}

/// Season and episode together select an episodic title.
fn content_ref(
    tmdb_id: &str,
    season: Option<u32>,
    episode: Option<u32>,
) -> anyhow::Result<ContentRef> {
    let kind = if season.is_some() || episode.is_some() {
        MediaKind::Episodic
    } else {
        MediaKind::Movie
    };

    Ok(ContentRef::new(tmdb_id, kind, season, episode)?)
}

/// Start the resolution API server
///
/// # Errors
/// - `VidscoutError::Registry` - Mirror configuration is invalid
/// - `VidscoutError::Io` - Address could not be bound
pub async fn start_server(
    mut config: VidscoutConfig,
    host: Option<String>,
    port: Option<u16>,
    mode: RuntimeMode,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "Starting Vidscout server on http://{}:{} ({mode})",
        config.server.host, config.server.port
    );
    vidscout_web::run_server(config, mode)
        .await
        .context("resolution server stopped")
}

/// Resolve a single title and print the outcome
///
/// Ctrl-C cancels the resolution between probes.
///
/// # Errors
/// - `ResolutionFailure` - No mirror answered, or the lookup was cancelled
pub async fn resolve_title(
    config: VidscoutConfig,
    content: ContentRef,
    mode: RuntimeMode,
) -> anyhow::Result<()> {
    let components = ServerComponents::build(&config, mode)?;
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    println!("Resolving {content} across {} mirrors", components.registry().len());

    let outcome = components
        .resolver
        .resolve_source(&content, components.resolver.default_policy(), &cancel)
        .await;

    match outcome {
        Ok(source) => {
            println!("Provider: {}", source.provider);
            println!("Embed URL: {}", source.url);
            Ok(())
        }
        Err(failure) => {
            print_attempts(&failure);
            Err(failure.into())
        }
    }
}

fn print_attempts(failure: &ResolutionFailure) {
    for attempt in failure.attempts() {
        let url = attempt
            .url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<20} {url}  {}", attempt.provider, attempt.failure);
    }
}

/// List configured mirrors
///
/// # Errors
/// - `RegistryError` - Mirror configuration is empty or invalid
pub fn list_providers(config: &VidscoutConfig) -> anyhow::Result<()> {
    let registry = MirrorRegistry::from_config(&config.mirrors.mirrors)?;

    println!("Configured mirrors ({}):", registry.len());
    for provider in registry.list_providers() {
        let kinds: Vec<&str> = [MediaKind::Movie, MediaKind::Episodic]
            .into_iter()
            .filter(|kind| provider.supports(*kind))
            .map(MediaKind::as_str)
            .collect();
        println!(
            "  {:>3}  {:<20} {}",
            provider.priority(),
            provider.name(),
            kinds.join(",")
        );
    }

    Ok(())
}

/// Print candidate URLs without probing
///
/// # Errors
/// - `RegistryError` - Mirror configuration is empty or invalid
pub fn show_candidates(config: &VidscoutConfig, content: &ContentRef) -> anyhow::Result<()> {
    let registry = MirrorRegistry::from_config(&config.mirrors.mirrors)?;

    println!("Candidates for {content}:");
    for (provider, candidate) in registry.candidate_urls(content) {
        match candidate {
            Ok(url) => println!("  {provider:<20} {url}"),
            Err(e) => println!("  {provider:<20} skipped: {e}"),
        }
    }

    Ok(())
}
