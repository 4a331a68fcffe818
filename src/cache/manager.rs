// Cache service - content-addressed admission control in front of model calls
// Author: json2sheet contributors

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::fingerprint::{content_hash, estimate_tokens};
use crate::cache::models::{CacheEntry, CacheExport, CacheStats, EntrySummary, ModelClass};
use crate::cache::provider::CacheProvider;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::metrics;
use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Fingerprint {
    content_hash: String,
    model_id: String,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    creates: u64,
    evictions: u64,
    tokens_saved: u64,
    cost_saved: f64,
}

/// Everything guarded by the service lock.
struct CacheState {
    /// Iteration order is most to least recently used; a `get` promotes.
    entries: LruCache<String, CacheEntry>,
    by_fingerprint: HashMap<Fingerprint, String>,
    counters: Counters,
}

enum Lookup {
    Live(CacheEntry),
    Expired(CacheEntry),
    Absent,
}

impl CacheState {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            by_fingerprint: HashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Find the entry for a fingerprint without touching LRU order.
    /// An expired match is removed before being returned.
    fn lookup(&mut self, fingerprint: &Fingerprint, now: chrono::DateTime<chrono::Utc>) -> Lookup {
        let Some(cache_id) = self.by_fingerprint.get(fingerprint).cloned() else {
            return Lookup::Absent;
        };
        let expired = match self.entries.peek(&cache_id) {
            Some(entry) if !entry.is_expired(now) => return Lookup::Live(entry.clone()),
            Some(_) => true,
            None => false,
        };

        if !expired {
            self.by_fingerprint.remove(fingerprint);
            return Lookup::Absent;
        }
        match self.remove(&cache_id) {
            Some(entry) => Lookup::Expired(entry),
            None => Lookup::Absent,
        }
    }

    /// Insert a new entry, returning whatever the capacity limit pushed out.
    fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.by_fingerprint.insert(
            Fingerprint {
                content_hash: entry.content_hash.clone(),
                model_id: entry.model_id.clone(),
            },
            entry.cache_id.clone(),
        );

        let (evicted_id, evicted) = self.entries.push(entry.cache_id.clone(), entry)?;
        self.unindex(&evicted_id, &evicted);
        Some(evicted)
    }

    fn remove(&mut self, cache_id: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(cache_id)?;
        self.unindex(cache_id, &entry);
        Some(entry)
    }

    fn unindex(&mut self, cache_id: &str, entry: &CacheEntry) {
        let fingerprint = Fingerprint {
            content_hash: entry.content_hash.clone(),
            model_id: entry.model_id.clone(),
        };
        if self.by_fingerprint.get(&fingerprint).map(String::as_str) == Some(cache_id) {
            self.by_fingerprint.remove(&fingerprint);
        }
    }
}

/// Owns the cache table and its statistics.
///
/// Every state transition runs under one async mutex. `create_or_get` keeps
/// it held across the remote create call, which is what guarantees a single
/// creation per fingerprint under concurrent callers. Remote deletions run
/// after the lock is released.
pub struct CacheService {
    config: CacheConfig,
    provider: Arc<dyn CacheProvider>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CacheState>>,
}

/// One find-or-create pass. Owns everything it touches so it can run
/// detached from the caller.
struct CreateJob {
    provider: Arc<dyn CacheProvider>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CacheState>>,
    content: Vec<Value>,
    fingerprint: Fingerprint,
    ttl: Duration,
    entry_ttl: chrono::Duration,
}

impl CacheService {
    /// Create a cache service backed by `provider` and the system clock.
    pub fn new(config: CacheConfig, provider: Arc<dyn CacheProvider>) -> Self {
        Self::with_clock(config, provider, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CacheConfig,
        provider: Arc<dyn CacheProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            provider,
            clock,
            state: Arc::new(Mutex::new(CacheState::new(capacity))),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Return the live entry for `(content, model_id)`, creating it if needed.
    ///
    /// An existing entry is returned unchanged and does not count as a hit.
    /// Content below the model's minimum size fails with
    /// [`CacheError::Ineligible`] and leaves no trace locally or remotely.
    /// A failed remote create is logged and yields a memory-only entry.
    pub async fn create_or_get(
        &self,
        content: &[Value],
        model_id: &str,
        ttl: Option<Duration>,
    ) -> Result<(String, CacheEntry), CacheError> {
        if model_id.trim().is_empty() {
            return Err(CacheError::InvalidRequest("model_id must not be empty".to_string()));
        }
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        if ttl.is_zero() {
            return Err(CacheError::InvalidRequest("ttl must be positive".to_string()));
        }
        let entry_ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| CacheError::InvalidRequest(format!("ttl {:?} out of range", ttl)))?;

        let fingerprint = Fingerprint {
            content_hash: content_hash(content),
            model_id: model_id.to_string(),
        };

        let job = CreateJob {
            provider: self.provider.clone(),
            clock: self.clock.clone(),
            state: self.state.clone(),
            content: content.to_vec(),
            fingerprint,
            ttl,
            entry_ttl,
        };

        // The pass runs to completion even if this future is dropped, so a
        // remote create that already happened is always recorded.
        tokio::spawn(job.run()).await.map_err(|e| {
            error!("Cache create task failed: {}", e);
            CacheError::ProviderUnavailable(format!("cache create task failed: {}", e))
        })?
    }

    /// Look up a live entry, counting a hit and refreshing its LRU position.
    ///
    /// Expired entries are purged on the spot. Both the expired and the
    /// unknown case count as a miss.
    pub async fn get(&self, cache_id: &str) -> Result<CacheEntry, CacheError> {
        let mut released = None;
        let outcome = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let now = self.clock.now();

            let found = match state.entries.peek(cache_id).map(|e| e.is_expired(now)) {
                Some(false) => state.entries.get_mut(cache_id).map(|entry| {
                    entry.hit_count += 1;
                    entry.last_accessed = Some(now);
                    entry.clone()
                }),
                Some(true) => {
                    info!("Cache {} has expired", cache_id);
                    if let Some(expired) = state.remove(cache_id) {
                        released = expired.provider_handle;
                    }
                    metrics::record_cache_operation("expired");
                    metrics::update_cache_entries(state.entries.len());
                    None
                }
                None => None,
            };

            match found {
                Some(entry) => {
                    state.counters.hits += 1;
                    metrics::record_cache_operation("hit");
                    Ok(entry)
                }
                None => {
                    state.counters.misses += 1;
                    metrics::record_cache_operation("miss");
                    Err(CacheError::NotFound(cache_id.to_string()))
                }
            }
        };

        release_remote(self.provider.as_ref(), released.into_iter().collect()).await;
        outcome
    }

    /// Accumulate savings reported by a caller after a cache-assisted call.
    pub async fn record_hit_savings(&self, cache_id: &str, tokens_saved: u64, cost_saved: f64) {
        let mut state = self.state.lock().await;
        if !state.entries.contains(cache_id) {
            debug!("Recording savings for non-resident cache {}", cache_id);
        }
        state.counters.tokens_saved += tokens_saved;
        state.counters.cost_saved += cost_saved;
    }

    /// Remove an entry locally and best-effort delete its remote resource.
    pub async fn delete(&self, cache_id: &str) -> Result<(), CacheError> {
        let removed = {
            let mut state = self.state.lock().await;
            let removed = state.remove(cache_id);
            metrics::update_cache_entries(state.entries.len());
            removed
        };

        let entry = removed.ok_or_else(|| CacheError::NotFound(cache_id.to_string()))?;
        info!("Deleted cache entry {}", cache_id);
        let handles = entry.provider_handle.into_iter().collect();
        release_remote(self.provider.as_ref(), handles).await;
        Ok(())
    }

    /// Remove every expired entry and return how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let handles: Vec<Option<String>> = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let now = self.clock.now();

            let expired_ids: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(id, _)| id.clone())
                .collect();

            let handles: Vec<Option<String>> = expired_ids
                .iter()
                .filter_map(|id| state.remove(id))
                .map(|entry| entry.provider_handle)
                .collect();
            metrics::update_cache_entries(state.entries.len());
            handles
        };

        let removed = handles.len();
        for _ in 0..removed {
            metrics::record_cache_operation("expired");
        }
        info!("Cleaned up {} expired cache entries", removed);
        release_remote(self.provider.as_ref(), handles.into_iter().flatten().collect()).await;
        removed
    }

    /// Snapshot of entries, oldest first. Does not count as access.
    pub async fn list(&self, model_id: Option<&str>, include_expired: bool) -> Vec<CacheEntry> {
        let state = self.state.lock().await;
        let now = self.clock.now();

        let mut entries: Vec<CacheEntry> = state
            .entries
            .iter()
            .map(|(_, entry)| entry)
            .filter(|entry| model_id.map_or(true, |m| entry.model_id == m))
            .filter(|entry| include_expired || !entry.is_expired(now))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        entries
    }

    /// Number of resident entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Current statistics, with storage cost recomputed from live entries.
    pub async fn get_stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        self.compute_stats(&state, self.clock.now())
    }

    /// Statistics plus per-entry details.
    pub async fn export_stats(&self) -> CacheExport {
        let state = self.state.lock().await;
        let now = self.clock.now();
        let stats = self.compute_stats(&state, now);

        let mut entries: Vec<EntrySummary> = state
            .entries
            .iter()
            .map(|(_, entry)| EntrySummary {
                cache_id: entry.cache_id.clone(),
                model_id: entry.model_id.clone(),
                token_count: entry.token_count,
                hit_count: entry.hit_count,
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                ttl_remaining: entry.ttl_remaining_seconds(now),
                has_provider_handle: entry.provider_handle.is_some(),
            })
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        CacheExport {
            stats,
            entries,
            timestamp: now,
        }
    }

    fn compute_stats(&self, state: &CacheState, now: chrono::DateTime<chrono::Utc>) -> CacheStats {
        let million_token_hours: f64 = state
            .entries
            .iter()
            .map(|(_, entry)| entry)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.token_count as f64 / 1_000_000.0 * entry.hours_resident(now))
            .sum();
        let storage_cost = million_token_hours * self.config.storage_cost_per_million_token_hours;
        let counters = &state.counters;

        CacheStats {
            total_entries: state.entries.len(),
            total_hits: counters.hits,
            total_misses: counters.misses,
            total_creates: counters.creates,
            total_evictions: counters.evictions,
            tokens_saved: counters.tokens_saved,
            cost_saved: counters.cost_saved,
            storage_cost,
            net_savings: counters.cost_saved - storage_cost,
        }
    }
}

impl CreateJob {
    async fn run(self) -> Result<(String, CacheEntry), CacheError> {
        let mut released = Vec::new();
        let outcome = self.find_or_create(&mut released).await;
        release_remote(self.provider.as_ref(), released).await;
        outcome
    }

    async fn find_or_create(
        &self,
        released: &mut Vec<String>,
    ) -> Result<(String, CacheEntry), CacheError> {
        let fingerprint = &self.fingerprint;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        match state.lookup(fingerprint, self.clock.now()) {
            Lookup::Live(entry) => {
                info!("Content already cached with ID: {}", entry.cache_id);
                return Ok((entry.cache_id.clone(), entry));
            }
            Lookup::Expired(entry) => {
                debug!("Purged expired entry {} for matching content", entry.cache_id);
                metrics::record_cache_operation("expired");
                released.extend(entry.provider_handle);
            }
            Lookup::Absent => {}
        }

        let model_id = fingerprint.model_id.as_str();
        let model_class = ModelClass::classify(model_id);
        let token_count = estimate_tokens(&self.content);
        let minimum = model_class.min_cache_tokens();
        if token_count < minimum {
            debug!(
                "Token count {} below {} minimum {} for {}",
                token_count,
                model_class.as_str(),
                minimum,
                model_id
            );
            return Err(CacheError::Ineligible {
                model_id: model_id.to_string(),
                token_count,
                minimum,
            });
        }

        let provider_handle = match self.provider.create(model_id, &self.content, self.ttl).await {
            Ok(handle) => {
                info!("Created remote cache: {}", handle);
                Some(handle)
            }
            Err(e) => {
                warn!("Remote cache creation failed, keeping entry memory-only: {}", e);
                metrics::record_cache_operation("provider_failure");
                None
            }
        };

        let created_at = self.clock.now();
        let suffix = Uuid::new_v4().simple().to_string();
        let cache_id = format!("cache_{}_{}", &fingerprint.content_hash[..12], &suffix[..8]);
        let entry = CacheEntry {
            cache_id: cache_id.clone(),
            model_id: model_id.to_string(),
            model_class,
            content_hash: fingerprint.content_hash.clone(),
            token_count,
            created_at,
            expires_at: created_at + self.entry_ttl,
            hit_count: 0,
            last_accessed: None,
            provider_handle,
        };

        if let Some(evicted) = state.insert(entry.clone()) {
            debug!("Evicted cache entry {} due to memory limit", evicted.cache_id);
            state.counters.evictions += 1;
            metrics::record_cache_operation("eviction");
            released.extend(evicted.provider_handle);
        }
        state.counters.creates += 1;
        metrics::record_cache_operation("create");
        metrics::update_cache_entries(state.entries.len());

        Ok((cache_id, entry))
    }
}

async fn release_remote(provider: &dyn CacheProvider, handles: Vec<String>) {
    for handle in handles {
        match provider.delete(&handle).await {
            Ok(()) => debug!("Deleted remote cache: {}", handle),
            Err(e) => warn!("Failed to delete remote cache {}: {}", handle, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::provider::NullCacheProvider;
    use serde_json::json;

    fn service(max_entries: usize) -> (CacheService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = CacheConfig {
            max_entries,
            ..CacheConfig::default()
        };
        let service =
            CacheService::with_clock(config, Arc::new(NullCacheProvider), clock.clone());
        (service, clock)
    }

    fn content(tag: &str) -> Vec<Value> {
        vec![json!({"role": "system", "content": format!("{}{}", tag, "x".repeat(6000))})]
    }

    #[tokio::test]
    async fn test_memory_only_entry_when_provider_missing() {
        let (service, _) = service(10);
        let (_, entry) = service
            .create_or_get(&content("a"), "gemini-2.0-flash", None)
            .await
            .unwrap();

        assert!(entry.provider_handle.is_none());
        assert_eq!(entry.model_class, ModelClass::Flash);
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn test_expired_fingerprint_is_recreated() {
        let (service, clock) = service(10);
        let ttl = Some(Duration::from_secs(60));
        let (first, _) = service
            .create_or_get(&content("a"), "gemini-2.0-flash", ttl)
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(61));
        let (second, _) = service
            .create_or_get(&content("a"), "gemini-2.0-flash", ttl)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(service.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let (service, _) = service(10);
        assert!(matches!(
            service.create_or_get(&content("a"), " ", None).await,
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(matches!(
            service
                .create_or_get(&content("a"), "gemini-2.0-flash", Some(Duration::ZERO))
                .await,
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_cost_accrues_with_residency() {
        let (service, clock) = service(10);
        let (_, entry) = service
            .create_or_get(&content("a"), "gemini-2.0-flash", Some(Duration::from_secs(7200)))
            .await
            .unwrap();
        service.record_hit_savings(&entry.cache_id, 500, 0.25).await;

        clock.advance(chrono::Duration::hours(1));
        let stats = service.get_stats().await;

        let expected = entry.token_count as f64 / 1_000_000.0;
        assert!((stats.storage_cost - expected).abs() < 1e-9);
        assert!((stats.net_savings - (0.25 - expected)).abs() < 1e-9);
        assert_eq!(stats.tokens_saved, 500);
    }
}
