//! Two-tier query result cache

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::domain::cache::Cache;
use crate::domain::query::looks_like_protocol_fault;
use crate::domain::result_cache::{
    is_stale, CachedQueryResult, CachedResultId, CachedResultRepository, ResultCacheKey,
    CLOCK_SKEW_OFFSET_SECS,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cache_lookup;

/// Lifetime of hot-tier entries
pub const DEFAULT_HOT_TTL: Duration = Duration::from_secs(600);

/// Hot hits skip the staleness check, so a hot entry must not outlive the
/// shortest durable lifetime (`expires` of zero plus the clock offset).
pub const MAX_HOT_TTL: Duration = Duration::from_secs(CLOCK_SKEW_OFFSET_SECS as u64);

/// Hot tier in front of the durable result store.
///
/// Store failures degrade to misses and are only logged.
#[derive(Debug)]
pub struct ResultCache {
    hot: Arc<dyn Cache>,
    durable: Arc<dyn CachedResultRepository>,
    hot_ttl: Duration,
}

impl ResultCache {
    pub fn new(hot: Arc<dyn Cache>, durable: Arc<dyn CachedResultRepository>) -> Self {
        Self {
            hot,
            durable,
            hot_ttl: DEFAULT_HOT_TTL,
        }
    }

    /// Sets the hot-tier lifetime, capped at `MAX_HOT_TTL`
    pub fn with_hot_ttl(mut self, ttl: Duration) -> Self {
        if ttl > MAX_HOT_TTL {
            warn!(requested = ?ttl, max = ?MAX_HOT_TTL, "Hot cache TTL capped");
        }
        self.hot_ttl = ttl.min(MAX_HOT_TTL);
        self
    }

    /// Looks a payload up in the hot tier, then the durable tier.
    ///
    /// A durable entry older than `expires` (seconds) is deleted and reported as a miss.
    #[instrument(skip(self, key), fields(model_id = %key.model_id, digest = %key.digest))]
    pub async fn get(&self, key: &ResultCacheKey, expires: Option<u64>) -> Option<String> {
        match self.hot.get_raw(&key.hot_key()).await {
            Ok(Some(payload)) => {
                record_cache_lookup("hot", true);
                debug!("Hot cache hit");
                return Some(payload);
            }
            Ok(None) => record_cache_lookup("hot", false),
            Err(e) => warn!(error = %e, "Hot cache lookup failed"),
        }

        let id = CachedResultId::from(key);
        let entry = match self.durable.get(&id).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Durable cache lookup failed");
                return None;
            }
        };

        let Some(entry) = entry else {
            record_cache_lookup("durable", false);
            return None;
        };

        if is_stale(entry.created_at, Utc::now(), expires) {
            debug!(created_at = %entry.created_at, "Durable cache entry is stale");
            record_cache_lookup("durable", false);
            if let Err(e) = self.delete_durable(&id).await {
                warn!(error = %e, "Failed to delete stale cache entry");
            }
            return None;
        }

        record_cache_lookup("durable", true);
        Some(entry.payload)
    }

    /// Stores a payload in both tiers. Fault payloads are never stored.
    ///
    /// Returns whether the payload was stored.
    #[instrument(skip(self, key, payload), fields(model_id = %key.model_id, digest = %key.digest))]
    pub async fn put(&self, key: &ResultCacheKey, payload: &str) -> bool {
        if looks_like_protocol_fault(payload) {
            debug!("Fault payload not cached");
            return false;
        }

        if let Err(e) = self
            .durable
            .save(CachedQueryResult::new(key, payload))
            .await
        {
            warn!(error = %e, "Failed to store durable cache entry");
            return false;
        }

        if let Err(e) = self.hot.set_raw(&key.hot_key(), payload, self.hot_ttl).await {
            warn!(error = %e, "Failed to store hot cache entry");
        }
        true
    }

    /// Replaces any existing entry with a freshly fetched payload
    pub async fn refresh(&self, key: &ResultCacheKey, payload: &str) -> bool {
        if looks_like_protocol_fault(payload) {
            return false;
        }
        if let Err(e) = self.invalidate(key).await {
            warn!(error = %e, "Failed to drop previous cache entry");
        }
        self.put(key, payload).await
    }

    /// Deletes the entry from both tiers. An entry already gone is not an error.
    pub async fn invalidate(&self, key: &ResultCacheKey) -> Result<(), DomainError> {
        self.hot.delete(&key.hot_key()).await?;
        self.delete_durable(&CachedResultId::from(key)).await
    }

    /// Deletes every cached result of a model, returning how many durable records went
    #[instrument(skip(self))]
    pub async fn invalidate_model(&self, tenant_id: Option<&str>, model_id: &str) -> usize {
        let pattern = ResultCacheKey::hot_model_pattern(tenant_id, model_id);
        if let Err(e) = self.hot.delete_pattern(&pattern).await {
            warn!(error = %e, %pattern, "Failed to invalidate hot cache entries");
        }

        match self
            .durable
            .delete_by_model(tenant_id.unwrap_or_default(), model_id)
            .await
        {
            Ok(deleted) => {
                debug!(deleted, "Invalidated cached results");
                deleted
            }
            Err(e) => {
                warn!(error = %e, "Failed to invalidate durable cache entries");
                0
            }
        }
    }

    async fn delete_durable(&self, id: &CachedResultId) -> Result<(), DomainError> {
        match self.durable.delete(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
