//! Redis catalog registry read by the embedded engine

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::catalog::CatalogRegistry;
use crate::domain::DomainError;

/// Catalog registry stored as a Redis set of names plus one hash per entry
#[derive(Clone)]
pub struct RedisCatalogRegistry {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisCatalogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCatalogRegistry")
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCatalogRegistry {
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::catalog(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::catalog(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl CatalogRegistry for RedisCatalogRegistry {
    async fn add_member(&self, set_name: &str, member: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.sadd::<_, _, ()>(set_name, member).await.map_err(|e| {
            DomainError::catalog(format!("Failed to add '{}' to '{}': {}", member, set_name, e))
        })
    }

    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), DomainError> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        conn.hset_multiple::<_, _, _, ()>(key, fields)
            .await
            .map_err(|e| DomainError::catalog(format!("Failed to write hash '{}': {}", key, e)))
    }

    async fn members(&self, set_name: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.smembers(set_name).await.map_err(|e| {
            DomainError::catalog(format!("Failed to read set '{}': {}", set_name, e))
        })
    }

    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.hgetall(key)
            .await
            .map_err(|e| DomainError::catalog(format!("Failed to read hash '{}': {}", key, e)))
    }
}
