//! Hot-tier cache factory

use std::sync::Arc;

use crate::config::{CacheConfig, StoreBackend};
use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Builds the configured cache backend
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        match config.backend {
            StoreBackend::Memory => Ok(self.create_in_memory(config)),
            StoreBackend::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("cache.redis_url is required for the redis backend")
                })?;

                let cache = RedisCache::new(RedisCacheConfig::new(url)).await?;
                Ok(Arc::new(cache))
            }
        }
    }

    pub fn create_in_memory(&self, config: &CacheConfig) -> Arc<dyn Cache> {
        let in_memory = InMemoryCacheConfig::default()
            .with_max_capacity(config.max_capacity)
            .with_max_ttl(config.hot_ttl());

        Arc::new(InMemoryCache::with_config(in_memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::default())
            .await
            .unwrap();
        assert_eq!(cache.backend(), "memory");
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let config = CacheConfig {
            backend: StoreBackend::Redis,
            ..CacheConfig::default()
        };

        let result = CacheFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
