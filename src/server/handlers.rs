// HTTP request handlers
// Author: json2sheet contributors

use super::routes::AppState;
use crate::cache::{CacheEntry, CacheExport, CacheStats};
use crate::error::{AppError, Result};
use crate::generation::{GenerationRequest, GenerationResponse};
use crate::metrics;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    let generation_check = if state.generation.is_some() {
        HealthCheck {
            status: "ok".to_string(),
            message: format!("Default model: {}", state.config.gemini.default_model),
        }
    } else {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: "No Gemini API key configured".to_string(),
        }
    };
    checks.insert("generation".to_string(), generation_check);

    let cache_check = match &state.cache {
        Some(cache) => HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "{} entries, provider: {}",
                cache.len().await,
                cache.provider_name()
            ),
        },
        None => HealthCheck {
            status: "disabled".to_string(),
            message: "Content cache disabled".to_string(),
        },
    };
    checks.insert("cache".to_string(), cache_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Handler for `POST /api/generate`
pub async fn generate_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<GenerationResponse>> {
    let start = Instant::now();

    // Deserialize by hand for a readable error body
    let request: GenerationRequest = serde_json::from_str(&body).map_err(|e| {
        error!("Failed to deserialize generation request: {}", e);
        AppError::InvalidRequest(format!("JSON deserialization error: {}", e))
    })?;
    let requested_model = request
        .model
        .clone()
        .unwrap_or_else(|| state.config.gemini.default_model.clone());

    info!(
        "Received generation request: model={}, use_cache={}",
        requested_model, request.use_cache
    );

    let result = state.generation()?.generate(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(response) => {
            metrics::record_request("generate", 200, &response.model_used, elapsed);
            debug!(
                "Generation finished: cost=${:.6}, cache_hit={}",
                response.cost, response.cache_hit
            );
            Ok(Json(response))
        }
        Err(e) => {
            let status = e.status_code().as_u16();
            metrics::record_request("generate", status, &requested_model, elapsed);
            error!("Generation failed: {}", e);
            Err(e)
        }
    }
}

pub async fn cache_stats_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    Ok(Json(state.cache()?.get_stats().await))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub model_id: Option<String>,
    #[serde(default)]
    pub include_expired: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub caches: Vec<CacheEntry>,
    pub count: usize,
}

pub async fn cache_list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let caches = state
        .cache()?
        .list(query.model_id.as_deref(), query.include_expired)
        .await;
    Ok(Json(ListResponse {
        count: caches.len(),
        caches,
    }))
}

pub async fn cache_export_handler(State(state): State<AppState>) -> Result<Json<CacheExport>> {
    Ok(Json(state.cache()?.export_stats().await))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub entries_removed: usize,
}

pub async fn cache_cleanup_handler(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>> {
    let entries_removed = state.cache()?.cleanup_expired().await;
    info!("Manual cleanup removed {} cache entries", entries_removed);
    Ok(Json(CleanupResponse { entries_removed }))
}

/// Looking an entry up counts as a hit, or a miss when it is gone.
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path(cache_id): Path<String>,
) -> Result<Json<CacheEntry>> {
    Ok(Json(state.cache()?.get(&cache_id).await?))
}

pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path(cache_id): Path<String>,
) -> Result<StatusCode> {
    state.cache()?.delete(&cache_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
