//! Durable cached query result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::ResultCacheKey;
use crate::domain::storage::{StorageEntity, StorageKey};

/// Identifier of a durable cache record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CachedResultId(String);

impl CachedResultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ResultCacheKey> for CachedResultId {
    fn from(key: &ResultCacheKey) -> Self {
        Self(key.record_id())
    }
}

impl StorageKey for CachedResultId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw query payload cached for a model, language and query digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedQueryResult {
    pub id: CachedResultId,
    pub key: String,
    pub language: String,
    pub model_id: String,
    pub tenant_id: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl CachedQueryResult {
    pub fn new(key: &ResultCacheKey, payload: impl Into<String>) -> Self {
        Self {
            id: CachedResultId::from(key),
            key: key.digest.clone(),
            language: key.language.clone(),
            model_id: key.model_id.clone(),
            tenant_id: key.tenant_id.clone(),
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn belongs_to(&self, tenant_id: &str, model_id: &str) -> bool {
        self.tenant_id == tenant_id && self.model_id == model_id
    }
}

impl StorageEntity for CachedQueryResult {
    type Key = CachedResultId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
