// Model pricing table and cost calculation
// Author: json2sheet contributors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Prompts above this many tokens are billed at the `*_above_200k` rate.
const LONG_CONTEXT_THRESHOLD: u64 = 200_000;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub input_above_200k: Option<f64>,
    pub cached_input: f64,
    pub cached_input_above_200k: Option<f64>,
    pub output: f64,
    pub output_above_200k: Option<f64>,
}

impl ModelPricing {
    const fn flat(input: f64, cached_input: f64, output: f64) -> Self {
        Self {
            input,
            input_above_200k: None,
            cached_input,
            cached_input_above_200k: None,
            output,
            output_above_200k: None,
        }
    }
}

/// Token usage reported by a generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// All prompt tokens, cached ones included.
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Portion of `prompt_tokens` served from cached context.
    pub cached_tokens: u64,
    pub thinking_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens + self.thinking_tokens
    }
}

static PRICING: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn get_pricing_table() -> &'static HashMap<&'static str, ModelPricing> {
    PRICING.get_or_init(|| {
        let mut m = HashMap::new();

        m.insert("gemini-2.0-flash", ModelPricing::flat(0.10, 0.025, 0.40));
        m.insert("gemini-2.0-flash-lite", ModelPricing::flat(0.075, 0.01875, 0.30));
        m.insert("gemini-2.5-flash", ModelPricing::flat(0.30, 0.075, 2.50));
        m.insert("gemini-2.5-flash-lite", ModelPricing::flat(0.10, 0.025, 0.40));
        m.insert(
            "gemini-2.5-pro",
            ModelPricing {
                input: 1.25,
                input_above_200k: Some(2.50),
                cached_input: 0.31,
                cached_input_above_200k: Some(0.625),
                output: 10.00,
                output_above_200k: Some(15.00),
            },
        );
        m.insert("gemini-1.5-flash", ModelPricing::flat(0.075, 0.01875, 0.30));
        m.insert("gemini-1.5-pro", ModelPricing::flat(1.25, 0.3125, 5.00));

        m
    })
}

/// Find pricing for a model id.
///
/// Accepts a `models/` prefix and version suffixes: `gemini-2.0-flash-001`
/// resolves to the longest table key it extends at a `-` boundary.
pub fn pricing_for(model_id: &str) -> Option<&'static ModelPricing> {
    let model = model_id.strip_prefix("models/").unwrap_or(model_id);
    let table = get_pricing_table();

    if let Some(pricing) = table.get(model) {
        return Some(pricing);
    }

    table
        .iter()
        .filter(|(key, _)| {
            model
                .strip_prefix(*key)
                .is_some_and(|rest| rest.starts_with('-'))
        })
        .max_by_key(|(key, _)| key.len())
        .map(|(_, pricing)| pricing)
}

fn tiered(tokens: u64, base: f64, above: Option<f64>) -> f64 {
    match above {
        Some(above_rate) if tokens > LONG_CONTEXT_THRESHOLD => {
            (LONG_CONTEXT_THRESHOLD as f64 / 1_000_000.0) * base
                + ((tokens - LONG_CONTEXT_THRESHOLD) as f64 / 1_000_000.0) * above_rate
        }
        _ => (tokens as f64 / 1_000_000.0) * base,
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Cost in USD for one call. Unknown models cost 0.0.
pub fn calculate_cost(model_id: &str, usage: &TokenUsage) -> f64 {
    let Some(pricing) = pricing_for(model_id) else {
        warn!("No pricing information found for model {}", model_id);
        return 0.0;
    };

    let cached = usage.cached_tokens.min(usage.prompt_tokens);
    let uncached = usage.prompt_tokens - cached;
    let output = usage.completion_tokens + usage.thinking_tokens;

    let total = tiered(uncached, pricing.input, pricing.input_above_200k)
        + tiered(cached, pricing.cached_input, pricing.cached_input_above_200k)
        + tiered(output, pricing.output, pricing.output_above_200k);

    round6(total)
}

/// Input cost avoided by serving `cached_tokens` of the prompt from cache.
pub fn cache_savings(model_id: &str, prompt_tokens: u64, cached_tokens: u64) -> f64 {
    let full = calculate_cost(
        model_id,
        &TokenUsage {
            prompt_tokens,
            ..Default::default()
        },
    );
    let with_cache = calculate_cost(
        model_id,
        &TokenUsage {
            prompt_tokens,
            cached_tokens,
            ..Default::default()
        },
    );
    round6((full - with_cache).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_lookup_with_suffixes() {
        assert_eq!(pricing_for("gemini-2.0-flash-001").unwrap().input, 0.10);
        assert_eq!(pricing_for("models/gemini-2.5-pro").unwrap().output, 10.00);
        // longest key wins
        assert_eq!(pricing_for("gemini-2.5-flash-lite-preview").unwrap().input, 0.10);
        assert!(pricing_for("gemini-2.0-flashy").is_none());
        assert!(pricing_for("unknown-model").is_none());
    }

    #[test]
    fn test_calculate_cost_flat() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 500_000,
            cached_tokens: 0,
            thinking_tokens: 0,
        };
        assert!((calculate_cost("gemini-2.0-flash", &usage) - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_long_context_tier() {
        let usage = TokenUsage {
            prompt_tokens: 300_000,
            ..Default::default()
        };
        // 200k at 1.25 + 100k at 2.50
        assert!((calculate_cost("gemini-2.5-pro", &usage) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cache_savings() {
        // 1M cached flash tokens: 0.10 - 0.025
        let saved = cache_savings("gemini-2.0-flash", 1_000_000, 1_000_000);
        assert!((saved - 0.075).abs() < 1e-9);
        assert_eq!(cache_savings("gemini-2.0-flash", 1000, 0), 0.0);
        assert_eq!(cache_savings("unknown", 1000, 1000), 0.0);
    }
}
