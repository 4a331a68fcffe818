// Generation service - consults the content cache before calling the model
// Author: json2sheet contributors

use crate::cache::{CacheEntry, CacheService};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::gemini::Content;
use crate::models::pricing::{cache_savings, calculate_cost, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-call generation settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    /// Omitted when a cached reference already carries the instructions.
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Ask the model for `application/json` output.
    pub json_output: bool,
}

/// Text plus token usage from one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: TokenUsage,
}

/// The model backend, e.g. [`crate::gemini::GeminiClient`].
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        model_id: &str,
        contents: &[Content],
        options: &GenerateOptions,
        cached_reference: Option<&str>,
    ) -> Result<Generation>;
}

/// Inbound generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Falls back to the configured default model.
    #[serde(default)]
    pub model: Option<String>,
    pub system_prompt: String,
    /// JSON schema text the output must follow.
    #[serde(default)]
    pub schema: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub use_cache: bool,
    /// Reuse a specific entry when it is still live.
    #[serde(default)]
    pub cache_id: Option<String>,
    #[serde(default)]
    pub cache_ttl_seconds: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub model_used: String,
    pub usage: TokenUsage,
    pub cost: f64,
    /// True when the model reported cached prompt tokens.
    pub cache_hit: bool,
    pub cache_id: Option<String>,
}

/// The cacheable part of a request: system prompt and schema.
pub fn cacheable_content(system_prompt: &str, schema: Option<&str>) -> Vec<Value> {
    let mut content = vec![json!({"role": "system", "content": system_prompt})];
    if let Some(schema) = schema {
        content.push(json!({"role": "user", "content": format!("Schema: {}", schema)}));
    }
    content
}

fn system_instruction(system_prompt: &str, schema: Option<&str>) -> String {
    match schema {
        Some(schema) => format!("{}\n\nSchema: {}", system_prompt, schema),
        None => system_prompt.to_string(),
    }
}

pub struct GenerationService {
    generator: Arc<dyn ContentGenerator>,
    cache: Option<Arc<CacheService>>,
    default_model: String,
}

impl GenerationService {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        cache: Option<Arc<CacheService>>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            cache,
            default_model: default_model.into(),
        }
    }

    /// Run one generation, using the cache when asked to.
    ///
    /// Cache problems never fail the request; only the generator's own
    /// errors are returned.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        if request.prompt.trim().is_empty() {
            return Err(AppError::InvalidRequest("prompt must not be empty".to_string()));
        }
        let model = request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let cache_entry = if request.use_cache {
            self.resolve_cache(&request, &model).await
        } else {
            None
        };
        let cached_reference = cache_entry
            .as_ref()
            .and_then(|entry| entry.provider_handle.clone());

        let options = GenerateOptions {
            system_instruction: match cached_reference {
                Some(_) => None,
                None => Some(system_instruction(
                    &request.system_prompt,
                    request.schema.as_deref(),
                )),
            },
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            json_output: request.schema.is_some(),
        };
        let contents = vec![Content::user_text(request.prompt.as_str())];

        debug!(
            "Generating with model={} cached_reference={:?}",
            model, cached_reference
        );
        let generation = self
            .generator
            .generate(&model, &contents, &options, cached_reference.as_deref())
            .await?;

        let usage = generation.usage;
        let cost = calculate_cost(&model, &usage);
        metrics::record_tokens(
            &model,
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.cached_tokens,
        );

        // Cached tokens without a remote reference come from implicit
        // upstream caching, not from this entry.
        let cache_hit = usage.cached_tokens > 0 && cached_reference.is_some();
        if cache_hit {
            if let (Some(cache), Some(entry)) = (&self.cache, &cache_entry) {
                let saved = cache_savings(&model, usage.prompt_tokens, usage.cached_tokens);
                info!(
                    "Cache {} saved {} tokens (${:.6})",
                    entry.cache_id, usage.cached_tokens, saved
                );
                cache
                    .record_hit_savings(&entry.cache_id, usage.cached_tokens, saved)
                    .await;
            }
        }

        Ok(GenerationResponse {
            text: generation.text,
            model_used: model,
            usage,
            cost,
            cache_hit,
            cache_id: cache_entry.map(|entry| entry.cache_id),
        })
    }

    async fn resolve_cache(&self, request: &GenerationRequest, model: &str) -> Option<CacheEntry> {
        let Some(cache) = self.cache.as_ref() else {
            warn!("Caching requested but the cache service is not initialized");
            return None;
        };

        if let Some(cache_id) = request.cache_id.as_deref() {
            match cache.get(cache_id).await {
                Ok(entry) if entry.model_id == model => return Some(entry),
                Ok(entry) => warn!(
                    "Cache {} belongs to model {}, not {}; ignoring it",
                    cache_id, entry.model_id, model
                ),
                Err(e) => debug!("Requested cache unavailable: {}", e),
            }
        }

        let content = cacheable_content(&request.system_prompt, request.schema.as_deref());
        let ttl = request.cache_ttl_seconds.map(Duration::from_secs);
        match cache.create_or_get(&content, model, ttl).await {
            Ok((cache_id, entry)) => {
                debug!("Using cache {}", cache_id);
                Some(entry)
            }
            Err(e) => {
                warn!("Proceeding without cache: {}", e);
                None
            }
        }
    }
}
