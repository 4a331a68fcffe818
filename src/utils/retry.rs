// Retry logic with Google retryDelay hint support
// Author: json2sheet contributors

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A failed upstream call: HTTP status plus raw body.
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub status: u16,
    pub body: String,
}

impl UpstreamFailure {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Transport-level failures have no HTTP status; they are reported as 503
    /// so they stay retryable.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::new(503, format!("transport error: {}", err))
    }
}

/// Parse Google's retryDelay hint from an error body, capped at 60 seconds.
pub fn parse_retry_delay(error_json: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(error_json).ok()?;
    let details = parsed.get("error")?.get("details")?.as_array()?;

    details
        .iter()
        .filter(|d| {
            d.get("@type").and_then(Value::as_str)
                == Some("type.googleapis.com/google.rpc.RetryInfo")
        })
        .find_map(|d| d.get("retryDelay").and_then(Value::as_str))
        .and_then(parse_duration_string)
}

/// Parse duration strings like "0.457639761s" or "40s".
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let seconds: f64 = duration_str.strip_suffix('s')?.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::from_millis((seconds.min(60.0) * 1000.0) as u64))
}

fn create_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(500),
        initial_interval: Duration::from_millis(500),
        randomization_factor: 0.3,
        multiplier: 2.0,
        max_interval: Duration::from_secs(30),
        max_elapsed_time: Some(Duration::from_secs(120)),
        ..Default::default()
    }
}

/// Determine if an HTTP status code is retryable
pub fn is_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Run `operation` up to `max_attempts` times.
///
/// Waits for Google's `retryDelay` hint when the body carries one and falls
/// back to exponential backoff otherwise. Non-retryable statuses return
/// immediately.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, UpstreamFailure>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, UpstreamFailure>>,
{
    let max_attempts = max_attempts.max(1);
    let mut backoff = create_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(failure) => {
                if !is_retryable(failure.status) || attempt >= max_attempts {
                    return Err(failure);
                }

                let delay = match parse_retry_delay(&failure.body) {
                    Some(hint) => hint,
                    None => match backoff.next_backoff() {
                        Some(delay) => delay,
                        None => return Err(failure),
                    },
                };
                debug!(
                    "{} failed with {} (attempt {}/{}), retrying after {}ms",
                    operation_name,
                    failure.status,
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_retry_delay() {
        let error_json = r#"{
  "error": {
    "code": 429,
    "details": [
      {
        "@type": "type.googleapis.com/google.rpc.RetryInfo",
        "retryDelay": "0.457639761s"
      }
    ]
  }
}"#;
        let delay = parse_retry_delay(error_json).unwrap();
        assert_eq!(delay.as_millis(), 457);
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("40s").unwrap().as_secs(), 40);
        assert_eq!(parse_duration_string("1.5s").unwrap().as_millis(), 1500);
        assert_eq!(parse_duration_string("120s").unwrap().as_secs(), 60);
        assert!(parse_duration_string("-1s").is_none());
        assert!(parse_duration_string("10m").is_none());
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(429));
        assert!(is_retryable(503));
        assert!(!is_retryable(400));
        assert!(!is_retryable(404));
    }

    #[tokio::test]
    async fn test_non_retryable_status_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(UpstreamFailure::new(400, "bad request")) }
        })
        .await;

        assert_eq!(result.unwrap_err().status, 400);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_honors_hint_and_attempt_cap() {
        let calls = AtomicU32::new(0);
        let body = r#"{"error":{"details":[{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"0.01s"}]}}"#;
        let result: Result<(), _> = with_retry("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(UpstreamFailure::new(429, body)) }
        })
        .await;

        assert_eq!(result.unwrap_err().status, 429);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
