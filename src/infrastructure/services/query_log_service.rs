//! Query audit log service

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::domain::gateway::GatewayQuery;
use crate::domain::query_log::{QueryLogEntry, QueryLogId, QueryLogRepository, QueryLogStatus};
use crate::domain::DomainError;

/// Records the lifecycle of gateway queries
#[derive(Debug)]
pub struct QueryLogService {
    repository: Arc<dyn QueryLogRepository>,
}

impl QueryLogService {
    pub fn new(repository: Arc<dyn QueryLogRepository>) -> Self {
        Self { repository }
    }

    async fn get_required(&self, id: &QueryLogId) -> Result<QueryLogEntry, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Query log '{}'", id)))
    }

    /// Creates the PENDING entry of a submitted query
    #[instrument(skip(self, query), fields(model_id = %query.model_id, session_id = %query.session_id))]
    pub async fn create_pending(&self, query: &GatewayQuery) -> Result<QueryLogEntry, DomainError> {
        let mut entry = QueryLogEntry::new(&query.model_id, &query.session_id, query.kind.text())
            .with_params(query.params.clone());
        if let Some(cube) = query.kind.cube() {
            entry = entry.with_cube(cube);
        }

        let created = self.repository.create(entry).await?;
        debug!(log_id = %created.id(), "Created pending query log");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &QueryLogId) -> Result<Option<QueryLogEntry>, DomainError> {
        self.repository.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_running(&self, id: &QueryLogId) -> Result<QueryLogEntry, DomainError> {
        let mut entry = self.get_required(id).await?;
        entry.mark_running()?;
        self.repository.update(&entry).await
    }

    #[instrument(skip(self, result))]
    pub async fn mark_succeeded(
        &self,
        id: &QueryLogId,
        result: Value,
    ) -> Result<QueryLogEntry, DomainError> {
        let mut entry = self.get_required(id).await?;
        entry.mark_succeeded(result)?;
        self.repository.update(&entry).await
    }

    #[instrument(skip(self, error))]
    pub async fn mark_failed(
        &self,
        id: &QueryLogId,
        error: impl Into<String>,
    ) -> Result<QueryLogEntry, DomainError> {
        let mut entry = self.get_required(id).await?;
        entry.mark_failed(error)?;
        self.repository.update(&entry).await
    }

    /// Records the terminal status of a dequeued run.
    ///
    /// An entry still PENDING lost its RUNNING write and passes through
    /// RUNNING in the same update.
    #[instrument(skip(self, outcome))]
    pub async fn complete(
        &self,
        id: &QueryLogId,
        outcome: Result<Value, String>,
    ) -> Result<QueryLogEntry, DomainError> {
        let mut entry = self.get_required(id).await?;
        if entry.status() == QueryLogStatus::Pending {
            warn!(log_id = %id, "Query log missed its RUNNING update");
            entry.mark_running()?;
        }

        match outcome {
            Ok(result) => entry.mark_succeeded(result)?,
            Err(error) => entry.mark_failed(error)?,
        }
        self.repository.update(&entry).await
    }

    pub async fn list_by_session(&self, session_id: &str) -> Result<Vec<QueryLogEntry>, DomainError> {
        self.repository.list_by_session(session_id).await
    }
}
