// Error handling tests
// Author: json2sheet contributors

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use json2sheet::error::{AppError, CacheError};
use serde_json::Value;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        AppError::Config("missing key".to_string()),
        AppError::GeminiApi("API error".to_string()),
        AppError::InvalidRequest("Bad request".to_string()),
        AppError::TooManyRequests("Rate limited".to_string()),
        AppError::ServiceUnavailable("Service down".to_string()),
        AppError::Internal("boom".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_cache_error_messages() {
    let error = CacheError::Ineligible {
        model_id: "gemini-2.0-flash".to_string(),
        token_count: 500,
        minimum: 1024,
    };
    let display = error.to_string();
    assert!(display.contains("500"));
    assert!(display.contains("1024"));
    assert!(display.contains("gemini-2.0-flash"));

    let error = CacheError::NotFound("cache_abc".to_string());
    assert_eq!(error.to_string(), "cache cache_abc not found or expired");
}

#[test]
fn test_cache_error_converts_to_app_error() {
    let error: AppError = CacheError::InvalidRequest("ttl must be positive".to_string()).into();
    assert!(matches!(error, AppError::Cache(CacheError::InvalidRequest(_))));
    assert!(error.to_string().contains("ttl must be positive"));
}

#[test]
fn test_status_codes() {
    let cases = vec![
        (AppError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::GeminiApi("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::TooManyRequests("x".into()), StatusCode::TOO_MANY_REQUESTS),
        (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        (CacheError::NotFound("x".into()).into(), StatusCode::NOT_FOUND),
        (CacheError::InvalidRequest("x".into()).into(), StatusCode::BAD_REQUEST),
        (CacheError::ProviderUnavailable("x".into()).into(), StatusCode::BAD_GATEWAY),
    ];

    for (error, expected) in cases {
        assert_eq!(error.status_code(), expected, "{}", error);
    }
}

#[tokio::test]
async fn test_error_response_body() {
    let response = AppError::from(CacheError::NotFound("cache_abc".to_string())).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "not_found_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("cache_abc"));
}
