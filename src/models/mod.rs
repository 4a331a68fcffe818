//! Data models for the Gemini API and model pricing.
//!
//! - `gemini`: request/response bodies for the Gemini REST API.
//! - `pricing`: per-model token pricing and cost calculation.

// Author: json2sheet contributors

pub mod gemini;
pub mod pricing;

pub use gemini::{Content, GenerateContentRequest, GenerateContentResponse, Part, UsageMetadata};
pub use pricing::{calculate_cost, cache_savings, pricing_for, ModelPricing, TokenUsage};
