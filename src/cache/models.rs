//! Cache entry, model class, and statistics models.

// Author: json2sheet contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Model family, used to decide the minimum cacheable size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    Flash,
    Pro,
    Default,
}

impl ModelClass {
    /// Resolve the family from a model id such as `gemini-2.0-flash-001`.
    ///
    /// Matching is done on whole `-`/`.`-separated segments, so `flash-lite`
    /// is flash and `gemini-2.5-pro-preview` is pro. Flash wins if both appear.
    pub fn classify(model_id: &str) -> Self {
        let lowered = model_id.to_ascii_lowercase();
        let segments: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .collect();

        if segments.contains(&"flash") {
            ModelClass::Flash
        } else if segments.contains(&"pro") {
            ModelClass::Pro
        } else {
            ModelClass::Default
        }
    }

    /// Below this many tokens, caching costs more than it saves.
    pub fn min_cache_tokens(self) -> usize {
        match self {
            ModelClass::Flash => 1024,
            ModelClass::Pro => 2048,
            ModelClass::Default => 1024,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelClass::Flash => "flash",
            ModelClass::Pro => "pro",
            ModelClass::Default => "default",
        }
    }
}

/// One cached block of content, scoped to a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_id: String,
    pub model_id: String,
    pub model_class: ModelClass,
    /// SHA-256 of the canonical serialization of the cached content.
    pub content_hash: String,
    pub token_count: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    /// Remote cached-content resource name; `None` means memory-only.
    pub provider_handle: Option<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Seconds until expiry, clamped at zero.
    pub fn ttl_remaining_seconds(&self, now: DateTime<Utc>) -> f64 {
        let remaining = (self.expires_at - now).num_milliseconds() as f64 / 1000.0;
        remaining.max(0.0)
    }

    /// Hours this entry has been resident as of `now`.
    pub fn hours_resident(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.created_at).num_milliseconds().max(0);
        elapsed_ms as f64 / 3_600_000.0
    }
}

/// Aggregate cache statistics for the lifetime of the process.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_creates: u64,
    pub total_evictions: u64,
    pub tokens_saved: u64,
    pub cost_saved: f64,
    /// Recomputed on every read from the currently resident entries.
    pub storage_cost: f64,
    pub net_savings: f64,
}

/// Per-entry summary used by the stats export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub cache_id: String,
    pub model_id: String,
    pub token_count: usize,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_remaining: f64,
    pub has_provider_handle: bool,
}

/// Stats plus entry details, for monitoring dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheExport {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub entries: Vec<EntrySummary>,
    pub timestamp: DateTime<Utc>,
}
