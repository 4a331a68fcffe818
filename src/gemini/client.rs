// Gemini API client for content generation and context caching
// Author: json2sheet contributors

use crate::cache::fingerprint::canonical_json;
use crate::cache::CacheProvider;
use crate::config::GeminiConfig;
use crate::error::{AppError, CacheError, Result};
use crate::generation::{ContentGenerator, GenerateOptions, Generation};
use crate::metrics;
use crate::models::gemini::{
    CachedContentResponse, Content, CreateCachedContentRequest, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, SystemInstruction,
};
use crate::models::pricing::TokenUsage;
use crate::utils::logging::sanitize;
use crate::utils::retry::{with_retry, UpstreamFailure};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Google Gemini REST API.
///
/// Serves both as the [`ContentGenerator`] used by the generation service and
/// as the [`CacheProvider`] that materializes `cachedContents` resources.
pub struct GeminiClient {
    http_client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config("Gemini API key is not set".to_string()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .use_rustls_tls()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created Gemini HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    /// `gemini-2.0-flash` and `models/gemini-2.0-flash` both map to the latter.
    fn qualified_model(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    /// Extract error message from API response JSON
    fn extract_error_message(response_text: &str) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(serde::Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
            status: Option<String>,
        }

        let error = serde_json::from_str::<ErrorResponse>(response_text)
            .ok()?
            .error?;
        error.message.or(error.status)
    }

    fn upstream_error(operation: &str, failure: UpstreamFailure) -> AppError {
        let message = Self::extract_error_message(&failure.body)
            .unwrap_or_else(|| failure.body.clone());
        let message = sanitize(&message);
        error!("{} failed: HTTP {} - {}", operation, failure.status, message);

        match failure.status {
            429 => AppError::TooManyRequests(format!("Gemini API quota exceeded: {}", message)),
            503 | 504 => AppError::ServiceUnavailable(format!("Upstream unavailable: {}", message)),
            status => AppError::GeminiApi(format!("HTTP {}: {}", status, message)),
        }
    }

    /// POST `body` to `url` with retries, decoding the JSON response.
    async fn post_json<B, R>(&self, operation: &str, model: &str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let result = with_retry(operation, self.config.max_retries, || async move {
            let response = self
                .http_client
                .post(url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .json(body)
                .send()
                .await
                .map_err(UpstreamFailure::transport)?;

            let status = response.status();
            let text = response.text().await.map_err(UpstreamFailure::transport)?;
            if !status.is_success() {
                return Err(UpstreamFailure::new(status.as_u16(), text));
            }
            Ok(text)
        })
        .await;

        let elapsed = start.elapsed().as_secs_f64();
        match result {
            Ok(text) => {
                metrics::record_gemini_call(operation, model, 200, elapsed);
                serde_json::from_str(&text).map_err(|e| {
                    error!("Failed to parse {} response: {}", operation, e);
                    AppError::GeminiApi(format!("Response parsing error: {}", e))
                })
            }
            Err(failure) => {
                metrics::record_gemini_call(operation, model, failure.status, elapsed);
                Err(Self::upstream_error(operation, failure))
            }
        }
    }

    /// Call `models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url(),
            Self::qualified_model(model)
        );
        debug!("Calling generateContent for model: {}", model);
        self.post_json("generate_content", model, &url, request).await
    }

    /// Create a `cachedContents` resource and return its name.
    pub async fn create_cached_content(
        &self,
        model: &str,
        contents: Vec<Content>,
        ttl: Duration,
    ) -> Result<String> {
        let url = format!("{}/cachedContents", self.base_url());
        let request = CreateCachedContentRequest {
            model: Self::qualified_model(model),
            contents,
            ttl: format!("{}s", ttl.as_secs()),
        };

        let response: CachedContentResponse = self
            .post_json("create_cache", model, &url, &request)
            .await?;
        info!("Created Gemini cached content {}", response.name);
        Ok(response.name)
    }

    /// Delete a `cachedContents/...` resource. A 404 counts as success.
    pub async fn delete_cached_content(&self, name: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url(), name);
        let start = Instant::now();

        let response = self
            .http_client
            .delete(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;
        let status = response.status().as_u16();
        metrics::record_gemini_call("delete_cache", "", status, start.elapsed().as_secs_f64());

        if response.status().is_success() || status == 404 {
            debug!("Deleted Gemini cached content {}", name);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::upstream_error(
            "delete_cache",
            UpstreamFailure::new(status, body),
        ))
    }
}

/// Turn a cache block into a Gemini turn. Blocks shaped like
/// `{"role": ..., "content": "..."}` keep their text; anything else is sent
/// as canonical JSON. Only `model` survives as a role; everything else,
/// `system` included, becomes `user`.
pub fn block_to_content(block: &Value) -> Content {
    let role = match block.get("role").and_then(Value::as_str) {
        Some("model") => "model",
        _ => "user",
    };
    let text = match block.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => canonical_json(other),
        None => canonical_json(block),
    };
    let mut content = Content::user_text(text);
    content.role = role.to_string();
    content
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(
        &self,
        model_id: &str,
        contents: &[Content],
        options: &GenerateOptions,
        cached_reference: Option<&str>,
    ) -> Result<Generation> {
        let request = GenerateContentRequest {
            contents: contents.to_vec(),
            system_instruction: match cached_reference {
                Some(_) => None,
                None => options
                    .system_instruction
                    .as_deref()
                    .map(SystemInstruction::text),
            },
            generation_config: Some(GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: options
                    .json_output
                    .then(|| "application/json".to_string()),
            }),
            cached_content: cached_reference.map(str::to_string),
        };

        let response = self.generate_content(model_id, &request).await?;
        let usage = response.usage_metadata.clone().unwrap_or_default();

        Ok(Generation {
            text: response.text(),
            usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                cached_tokens: usage.cached_content_token_count,
                thinking_tokens: usage.thoughts_token_count,
            },
        })
    }
}

#[async_trait]
impl CacheProvider for GeminiClient {
    async fn create(
        &self,
        model_id: &str,
        contents: &[Value],
        ttl: Duration,
    ) -> std::result::Result<String, CacheError> {
        let contents = contents.iter().map(block_to_content).collect();
        self.create_cached_content(model_id, contents, ttl)
            .await
            .map_err(|e| CacheError::ProviderUnavailable(e.to_string()))
    }

    async fn delete(&self, handle: &str) -> std::result::Result<(), CacheError> {
        self.delete_cached_content(handle)
            .await
            .map_err(|e| CacheError::ProviderUnavailable(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qualified_model() {
        assert_eq!(
            GeminiClient::qualified_model("gemini-2.0-flash"),
            "models/gemini-2.0-flash"
        );
        assert_eq!(
            GeminiClient::qualified_model("models/gemini-2.0-flash"),
            "models/gemini-2.0-flash"
        );
    }

    #[test]
    fn test_block_to_content() {
        let content = block_to_content(&json!({"role": "system", "content": "be terse"}));
        assert_eq!(content.role, "user");
        assert_eq!(content.text(), "be terse");

        let content = block_to_content(&json!({"b": 1, "a": 2}));
        assert_eq!(content.text(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"code": 400, "message": "bad model", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            GeminiClient::extract_error_message(body).as_deref(),
            Some("bad model")
        );
        assert!(GeminiClient::extract_error_message("not json").is_none());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = GeminiConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(GeminiClient::new(&config), Err(AppError::Config(_))));
    }
}
