//! Storage-backed durable result cache repository

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::result_cache::{CachedQueryResult, CachedResultId, CachedResultRepository};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

#[derive(Debug)]
pub struct StorageCachedResultRepository {
    storage: Arc<dyn Storage<CachedQueryResult>>,
}

impl StorageCachedResultRepository {
    pub fn new(storage: Arc<dyn Storage<CachedQueryResult>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl CachedResultRepository for StorageCachedResultRepository {
    async fn get(&self, id: &CachedResultId) -> Result<Option<CachedQueryResult>, DomainError> {
        self.storage.get(id).await
    }

    async fn save(&self, entry: CachedQueryResult) -> Result<CachedQueryResult, DomainError> {
        self.storage.save(entry).await
    }

    async fn delete(&self, id: &CachedResultId) -> Result<(), DomainError> {
        if self.storage.delete(id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!(
                "Cached result '{}' not found",
                id.as_str()
            )))
        }
    }

    async fn delete_by_model(
        &self,
        tenant_id: &str,
        model_id: &str,
    ) -> Result<usize, DomainError> {
        let mut deleted = 0;
        for entry in self.storage.list().await? {
            if entry.belongs_to(tenant_id, model_id) && self.storage.delete(&entry.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
