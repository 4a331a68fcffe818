// HTTP routes configuration
// Author: json2sheet contributors

use super::handlers::{
    cache_cleanup_handler, cache_delete_handler, cache_export_handler, cache_get_handler,
    cache_list_handler, cache_stats_handler, generate_handler, health_handler, metrics_handler,
};
use super::middleware::request_id_layers;
use crate::cache::CacheService;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::generation::GenerationService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state. Either service may be absent: the cache when it is
/// disabled, the generation service when no API key is configured.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Option<Arc<CacheService>>,
    pub generation: Option<Arc<GenerationService>>,
}

impl AppState {
    pub fn cache(&self) -> Result<&Arc<CacheService>> {
        self.cache
            .as_ref()
            .ok_or_else(|| AppError::Config("cache service not initialized".to_string()))
    }

    pub fn generation(&self) -> Result<&Arc<GenerationService>> {
        self.generation
            .as_ref()
            .ok_or_else(|| AppError::Config("generation service not initialized".to_string()))
    }
}

pub fn create_router(state: AppState) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();

    let cache_routes = Router::new()
        .route("/stats", get(cache_stats_handler))
        .route("/list", get(cache_list_handler))
        .route("/export/stats", get(cache_export_handler))
        .route("/cleanup", post(cache_cleanup_handler))
        .route(
            "/:cache_id",
            get(cache_get_handler).delete(cache_delete_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate", post(generate_handler))
        .nest("/api/cache", cache_routes)
        // Schemas and prompts can be large JSON documents
        .layer(tower_http::limit::RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
