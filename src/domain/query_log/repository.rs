//! Query log repository trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{QueryLogEntry, QueryLogId, QueryLogStatus};
use crate::domain::DomainError;

/// Audit log store for query executions
#[async_trait]
pub trait QueryLogRepository: Send + Sync + Debug {
    async fn get(&self, id: &QueryLogId) -> Result<Option<QueryLogEntry>, DomainError>;

    async fn create(&self, entry: QueryLogEntry) -> Result<QueryLogEntry, DomainError>;

    async fn update(&self, entry: &QueryLogEntry) -> Result<QueryLogEntry, DomainError>;

    async fn list_by_status(
        &self,
        status: QueryLogStatus,
    ) -> Result<Vec<QueryLogEntry>, DomainError>;

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<QueryLogEntry>, DomainError>;
}
