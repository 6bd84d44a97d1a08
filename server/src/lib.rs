pub mod engine;
pub mod snapshot;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use spider_core::{PageStore, Stopwords};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

pub use engine::{EngineConfig, SearchEngine, SearchResult};
pub use snapshot::IndexSnapshot;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub stopwords_path: PathBuf,
    pub engine: EngineConfig,
    /// Results returned per response; `total_results` still counts all hits.
    pub max_results: usize,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub max_results: usize,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Open the store, build the index snapshot and return the router.
pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let store = Arc::new(PageStore::open(&config.db_path)?);
    let stopwords = Stopwords::load(&config.stopwords_path);
    let engine = SearchEngine::new(store, stopwords, config.engine.clone());
    engine.build_index()?;
    Ok(router(Arc::new(engine), config.max_results))
}

pub fn router(engine: Arc<SearchEngine>, max_results: usize) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", post(search_handler))
        .with_state(AppState { engine, max_results })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let query = req.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Search query is required"));
    }

    let start = std::time::Instant::now();
    let engine = state.engine.clone();
    let q = query.clone();
    // phrase checks hit SQLite, keep them off the async workers
    let mut results = tokio::task::spawn_blocking(move || engine.search(&q))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, "search failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let total_results = results.len();
    results.truncate(state.max_results);
    let took_s = start.elapsed().as_secs_f64();
    tracing::info!(%query, total_results, took_s, "search");
    Ok(Json(SearchResponse { query, took_s, total_results, results }))
}
