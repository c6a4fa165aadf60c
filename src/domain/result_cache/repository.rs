//! Durable result cache repository trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{CachedQueryResult, CachedResultId};
use crate::domain::DomainError;

/// Durable store of cached query results
#[async_trait]
pub trait CachedResultRepository: Send + Sync + Debug {
    async fn get(&self, id: &CachedResultId) -> Result<Option<CachedQueryResult>, DomainError>;

    /// Inserts or replaces the record
    async fn save(&self, entry: CachedQueryResult) -> Result<CachedQueryResult, DomainError>;

    /// Deletes the record, failing with NotFound when it is already gone
    async fn delete(&self, id: &CachedResultId) -> Result<(), DomainError>;

    /// Deletes every record of a model, returning how many were removed
    async fn delete_by_model(&self, tenant_id: &str, model_id: &str)
    -> Result<usize, DomainError>;
}
