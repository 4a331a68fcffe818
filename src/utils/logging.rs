//! Structured logging and key-redaction utilities.
//!
//! This module configures the `tracing` ecosystem for the application and
//! provides a helper that keeps Google API keys out of log sinks.
//!
//! Author: json2sheet contributors

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable output for development.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        }
    }

    Ok(())
}

/// Replaces every Google API key (`AIza...`) in `input` with a placeholder.
///
/// Keys end at whitespace, a quote, `&` or the end of the string, which
/// covers both JSON bodies and `?key=` query strings.
pub fn sanitize(input: &str) -> String {
    const MARKER: &str = "AIza";
    const PLACEHOLDER: &str = "[REDACTED_API_KEY]";

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(MARKER) {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let end = tail
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '&')
            .unwrap_or(tail.len());
        result.push_str(PLACEHOLDER);
        rest = &tail[end..];
    }
    result.push_str(rest);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_api_key_in_query() {
        let input = "POST https://example.test/models/x:generateContent?key=AIzaSyA123&alt=json";
        let output = sanitize(input);
        assert!(output.contains("[REDACTED_API_KEY]"));
        assert!(!output.contains("AIzaSyA123"));
        assert!(output.ends_with("&alt=json"));
    }

    #[test]
    fn test_sanitize_multiple_keys() {
        let output = sanitize(r#"{"a":"AIzaOne","b":"AIzaTwo"}"#);
        assert_eq!(
            output,
            r#"{"a":"[REDACTED_API_KEY]","b":"[REDACTED_API_KEY]"}"#
        );
    }

    #[test]
    fn test_sanitize_leaves_clean_input() {
        assert_eq!(sanitize("nothing secret here"), "nothing secret here");
    }
}
