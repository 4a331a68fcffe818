// Remote cache resource provider interface
// Author: json2sheet contributors

use crate::error::CacheError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Materializes cached content on the generation backend.
///
/// Failures are soft: the cache service logs them and keeps the entry
/// memory-only, or treats the remote resource as already gone.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Create a remote cached-content resource and return its handle.
    async fn create(
        &self,
        model_id: &str,
        contents: &[Value],
        ttl: Duration,
    ) -> Result<String, CacheError>;

    /// Delete the remote resource behind `handle`.
    async fn delete(&self, handle: &str) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// Provider used when no remote backend is configured. Every entry it
/// backs is memory-only.
#[derive(Debug, Default)]
pub struct NullCacheProvider;

#[async_trait]
impl CacheProvider for NullCacheProvider {
    async fn create(&self, _: &str, _: &[Value], _: Duration) -> Result<String, CacheError> {
        Err(CacheError::ProviderUnavailable(
            "no remote cache provider configured".to_string(),
        ))
    }

    async fn delete(&self, _: &str) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
