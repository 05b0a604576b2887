//! JSON API handlers for source resolution and service introspection

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;
use vidscout_core::MediaKind;
use vidscout_core::resolution::CacheStatistics;

use super::errors::ApiError;
use crate::server::AppState;

/// Query parameters of `/api/stream`.
///
/// Everything arrives as text so malformed values produce a JSON 400 instead
/// of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    /// Catalog identifier of the title
    pub tmdb_id: Option<String>,
    /// `movie` (default) or `tv`
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Season number for episodic titles
    pub season: Option<String>,
    /// Episode number for episodic titles
    pub episode: Option<String>,
}

/// Successful `/api/stream` answer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    /// Embed URL to hand to the player
    pub embed_url: String,
    /// Mirror that served it
    pub provider: String,
    /// Whether the answer came from the cache
    pub cached: bool,
    /// When the source was last verified
    pub resolved_at: DateTime<Utc>,
}

fn parse_number(name: &str, value: Option<&str>) -> Result<Option<u32>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {name}: '{raw}'"))),
    }
}

/// Resolves a title to a playable embed URL.
///
/// # Errors
/// - 400 - Missing or inconsistent parameters
/// - 404 - No mirror answered, with the attempt log
/// - 503 - Resolution was cancelled
pub async fn api_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Json<StreamResponse>, ApiError> {
    let tmdb_id = query
        .tmdb_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing tmdbId parameter"))?;

    let kind = match query.media_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => raw
            .parse::<MediaKind>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => MediaKind::Movie,
    };
    let season = parse_number("season", query.season.as_deref())?;
    let episode = parse_number("episode", query.episode.as_deref())?;

    // Cancels the in-flight resolution if the client goes away
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let span = tracing::info_span!(
        "stream_request",
        request_id = %Uuid::new_v4(),
        tmdb_id,
        kind = %kind
    );

    let source = async {
        state
            .resolver
            .resolve_request(tmdb_id, kind, season, episode, &cancel)
            .await
    }
    .instrument(span)
    .await
    .map_err(|failure| {
        tracing::info!(tmdb_id, %kind, "Stream request failed: {}", failure);
        ApiError::from(failure)
    })?;

    Ok(Json(StreamResponse {
        embed_url: source.url.to_string(),
        provider: source.provider,
        cached: source.cached,
        resolved_at: source.resolved_at,
    }))
}

/// Lists configured mirrors in probe order.
pub async fn api_providers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers: Vec<serde_json::Value> = state
        .registry()
        .list_providers()
        .iter()
        .map(|provider| {
            let kinds: Vec<&str> = [MediaKind::Movie, MediaKind::Episodic]
                .into_iter()
                .filter(|kind| provider.supports(*kind))
                .map(MediaKind::as_str)
                .collect();

            json!({
                "name": provider.name(),
                "priority": provider.priority(),
                "kinds": kinds,
            })
        })
        .collect();

    Json(json!({ "providers": providers }))
}

/// Resolution cache counters.
pub async fn api_cache_stats(State(state): State<AppState>) -> Json<CacheStatistics> {
    Json(state.resolver.cache_statistics())
}

/// Liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "mode": state.mode.to_string(),
        "providers": state.registry().len(),
        "uptime_seconds": state.server_started_at.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use vidscout_core::config::VidscoutConfig;
    use vidscout_core::probe::SimulatedResponse;
    use vidscout_core::{MirrorRegistry, RuntimeMode, SimulationProber, SourceResolver};

    use crate::server::{AppState, build_router};

    fn app_with(prober: SimulationProber) -> axum::Router {
        let resolver = SourceResolver::from_config(
            &VidscoutConfig::for_testing(),
            Arc::new(MirrorRegistry::default()),
            Arc::new(prober),
        );
        build_router(AppState {
            resolver,
            mode: RuntimeMode::Development,
            server_started_at: std::time::Instant::now(),
        })
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stream_resolves_first_reachable_mirror() {
        let prober = SimulationProber::new().with_host("vidsrc.me", SimulatedResponse::Status(200));
        let (status, body) = get_json(app_with(prober), "/api/stream?tmdbId=550&type=movie").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedUrl"], "https://vidsrc.me/embed/550");
        assert_eq!(body["provider"], "vidsrc.me");
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn test_stream_empty_type_means_movie() {
        let (status, body) = get_json(
            app_with(SimulationProber::all_reachable()),
            "/api/stream?tmdbId=550&type=",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedUrl"], "https://vidsrc.icu/embed/550");
    }

    #[tokio::test]
    async fn test_stream_episode_url() {
        let (status, body) = get_json(
            app_with(SimulationProber::all_reachable()),
            "/api/stream?tmdbId=1399&type=tv&season=1&episode=9",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedUrl"], "https://vidsrc.icu/embed/tv/1399/1/9");
    }

    #[tokio::test]
    async fn test_stream_second_request_is_cached() {
        let app = app_with(SimulationProber::all_reachable());

        let (_, first) = get_json(app.clone(), "/api/stream?tmdbId=550").await;
        let (status, second) = get_json(app, "/api/stream?tmdbId=550").await;

        assert_eq!(first["cached"], false);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["cached"], true);
    }

    #[tokio::test]
    async fn test_stream_exhausted_reports_attempts() {
        let (status, body) =
            get_json(app_with(SimulationProber::new()), "/api/stream?tmdbId=550").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let attempts = body["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), 4);
        assert_eq!(attempts[0]["provider"], "vidsrc.icu");
        assert_eq!(attempts[0]["url"], "https://vidsrc.icu/embed/550");
        assert!(attempts[0]["reason"].as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_stream_rejects_bad_parameters() {
        let cases = [
            "/api/stream",
            "/api/stream?tmdbId=%20",
            "/api/stream?tmdbId=550&type=anime",
            "/api/stream?tmdbId=1399&type=tv&season=1",
            "/api/stream?tmdbId=1399&type=tv&season=one&episode=2",
            "/api/stream?tmdbId=550&type=movie&season=1&episode=1",
        ];

        for uri in cases {
            let (status, body) = get_json(app_with(SimulationProber::all_reachable()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_providers_listing() {
        let (status, body) =
            get_json(app_with(SimulationProber::new()), "/api/providers").await;

        assert_eq!(status, StatusCode::OK);
        let providers = body["providers"].as_array().unwrap();
        assert_eq!(providers.len(), 4);
        assert_eq!(providers[0]["name"], "vidsrc.icu");
        assert_eq!(providers[0]["kinds"], serde_json::json!(["movie", "tv"]));
    }

    #[tokio::test]
    async fn test_cache_stats_and_health() {
        let app = app_with(SimulationProber::all_reachable());
        get_json(app.clone(), "/api/stream?tmdbId=550").await;
        get_json(app.clone(), "/api/stream?tmdbId=550").await;

        let (status, stats) = get_json(app.clone(), "/api/cache/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["entries"], 1);
        assert_eq!(stats["hit_count"], 1);

        let (status, health) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["mode"], "development");
    }
}
