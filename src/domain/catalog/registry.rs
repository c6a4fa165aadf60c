//! Shared catalog registry contract

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Key-value store the embedded engine reads catalogs from
#[async_trait]
pub trait CatalogRegistry: Send + Sync + Debug {
    /// Adds a member to a named set; adding an existing member is a no-op
    async fn add_member(&self, set_name: &str, member: &str) -> Result<(), DomainError>;

    /// Sets (overwrites) hash fields under a key
    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), DomainError>;

    async fn members(&self, set_name: &str) -> Result<Vec<String>, DomainError>;

    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>, DomainError>;
}
