//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe in-memory entity store. Data is lost when the process exits.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Creates storage pre-populated with entities
    pub fn with_entities(entities: Vec<E>) -> Self {
        let map = entities
            .into_iter()
            .map(|e| (e.key().as_str().to_string(), e))
            .collect();
        Self {
            entities: RwLock::new(map),
        }
    }
}

fn poisoned<T>(e: PoisonError<T>) -> DomainError {
    DomainError::storage(format!("Storage lock poisoned: {}", e))
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(entities.get(key.as_str()).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(entities.values().cloned().collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(poisoned)?;

        if entities.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(poisoned)?;

        if !entities.contains_key(&key) {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    /// Single write-locked upsert, so concurrent saves never conflict
    async fn save(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(poisoned)?;
        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let mut entities = self.entities.write().map_err(poisoned)?;
        Ok(entities.remove(key.as_str()).is_some())
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(entities.contains_key(key.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataSource, DataSourceType, ModelId, Protocol, SemanticModel};

    fn model(id: &str, name: &str) -> SemanticModel {
        SemanticModel::new(
            ModelId::new(id).unwrap(),
            name,
            DataSource::new("ds-1", "Warehouse", DataSourceType::new("pg", Protocol::Sql)),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = InMemoryStorage::<SemanticModel>::new();
        storage.create(model("sales", "Sales")).await.unwrap();

        let fetched = storage
            .get(&ModelId::new("sales").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name(), "Sales");
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let storage = InMemoryStorage::with_entities(vec![model("sales", "Sales")]);
        let result = storage.create(model("sales", "Again")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let storage = InMemoryStorage::<SemanticModel>::new();
        let result = storage.update(model("sales", "Sales")).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let storage = InMemoryStorage::<SemanticModel>::new();
        storage.save(model("sales", "Sales")).await.unwrap();
        storage.save(model("sales", "Sales v2")).await.unwrap();

        let all = storage.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name(), "Sales v2");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = InMemoryStorage::with_entities(vec![model("sales", "Sales")]);
        let id = ModelId::new("sales").unwrap();

        assert!(storage.delete(&id).await.unwrap());
        assert!(!storage.delete(&id).await.unwrap());
        assert!(!storage.exists(&id).await.unwrap());
    }
}
