// Error types for json2sheet
// Author: json2sheet contributors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the content cache.
///
/// Every variant is recoverable: callers degrade to an uncached call
/// instead of failing the request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("content has {token_count} tokens, below the {minimum} token minimum for {model_id}")]
    Ineligible {
        model_id: String,
        token_count: usize,
        minimum: usize,
    },

    #[error("cache provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("cache {0} not found or expired")]
    NotFound(String),

    #[error("invalid cache request: {0}")]
    InvalidRequest(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited: {0}")]
    TooManyRequests(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) | AppError::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            AppError::Cache(CacheError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found_error"),
            AppError::Cache(CacheError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            AppError::Cache(CacheError::Ineligible { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "cache_ineligible_error")
            }
            AppError::Cache(CacheError::ProviderUnavailable(_)) => {
                (StatusCode::BAD_GATEWAY, "cache_provider_error")
            }
            AppError::Config(_) | AppError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            AppError::GeminiApi(_) | AppError::Http(_) => (StatusCode::BAD_GATEWAY, "api_error"),
            AppError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error"),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "overloaded_error"),
            AppError::Io(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error")
            }
        }
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// Convert AppError to HTTP responses for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_status_codes() {
        let resp = AppError::from(CacheError::NotFound("cache_x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::from(CacheError::Ineligible {
            model_id: "gemini-2.0-flash".into(),
            token_count: 10,
            minimum: 1024,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = AppError::Config("cache service not initialized".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
