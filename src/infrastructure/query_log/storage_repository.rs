//! Storage-backed query log repository

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::query_log::{QueryLogEntry, QueryLogId, QueryLogRepository, QueryLogStatus};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

#[derive(Debug)]
pub struct StorageQueryLogRepository {
    storage: Arc<dyn Storage<QueryLogEntry>>,
}

impl StorageQueryLogRepository {
    pub fn new(storage: Arc<dyn Storage<QueryLogEntry>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl QueryLogRepository for StorageQueryLogRepository {
    async fn get(&self, id: &QueryLogId) -> Result<Option<QueryLogEntry>, DomainError> {
        self.storage.get(id).await
    }

    async fn create(&self, entry: QueryLogEntry) -> Result<QueryLogEntry, DomainError> {
        if self.storage.exists(entry.id()).await? {
            return Err(DomainError::conflict(format!(
                "Query log '{}' already exists",
                entry.id()
            )));
        }

        self.storage.create(entry).await
    }

    async fn update(&self, entry: &QueryLogEntry) -> Result<QueryLogEntry, DomainError> {
        self.storage.update(entry.clone()).await
    }

    async fn list_by_status(
        &self,
        status: QueryLogStatus,
    ) -> Result<Vec<QueryLogEntry>, DomainError> {
        let all = self.storage.list().await?;
        Ok(all.into_iter().filter(|e| e.status() == status).collect())
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<QueryLogEntry>, DomainError> {
        let mut entries: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|e| e.session_id() == session_id)
            .collect();
        entries.sort_by_key(|e| e.created_at());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStorage;

    fn repository() -> StorageQueryLogRepository {
        StorageQueryLogRepository::new(Arc::new(InMemoryStorage::<QueryLogEntry>::new()))
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let repo = repository();
        let mut entry = repo
            .create(QueryLogEntry::new("sales", "s1", "SELECT 1"))
            .await
            .unwrap();

        entry.mark_running().unwrap();
        repo.update(&entry).await.unwrap();

        let stored = repo.get(entry.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), QueryLogStatus::Running);
        assert_eq!(
            repo.list_by_status(QueryLogStatus::Running).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let repo = repository();
        let entry = QueryLogEntry::new("sales", "s1", "SELECT 1");
        repo.create(entry.clone()).await.unwrap();
        assert!(matches!(
            repo.create(entry).await,
            Err(DomainError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_entry() {
        let repo = repository();
        let entry = QueryLogEntry::new("sales", "s1", "SELECT 1");
        assert!(repo.update(&entry).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_by_session() {
        let repo = repository();
        repo.create(QueryLogEntry::new("sales", "s1", "a")).await.unwrap();
        repo.create(QueryLogEntry::new("sales", "s2", "b")).await.unwrap();
        repo.create(QueryLogEntry::new("hr", "s1", "c")).await.unwrap();

        let entries = repo.list_by_session("s1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.session_id() == "s1"));
    }
}
