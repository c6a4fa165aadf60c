//! Catalog registry factory

use std::sync::Arc;

use crate::config::{CatalogConfig, StoreBackend};
use crate::domain::catalog::CatalogRegistry;
use crate::domain::DomainError;

use super::in_memory::InMemoryCatalogRegistry;
use super::redis::RedisCatalogRegistry;

pub async fn create_catalog_registry(
    config: &CatalogConfig,
) -> Result<Arc<dyn CatalogRegistry>, DomainError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryCatalogRegistry::new())),
        StoreBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                DomainError::configuration("catalog.redis_url is required for the redis backend")
            })?;
            Ok(Arc::new(RedisCatalogRegistry::connect(url).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let registry = create_catalog_registry(&CatalogConfig::default()).await.unwrap();
        assert!(registry.members("XmlaConnection").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let config = CatalogConfig {
            backend: StoreBackend::Redis,
            redis_url: None,
            ..CatalogConfig::default()
        };
        assert!(create_catalog_registry(&config).await.is_err());
    }
}
