//! In-memory catalog registry

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::catalog::CatalogRegistry;
use crate::domain::DomainError;

/// Registry held in process, for tests and single-node setups
#[derive(Debug, Default)]
pub struct InMemoryCatalogRegistry {
    sets: DashMap<String, BTreeSet<String>>,
    hashes: DashMap<String, HashMap<String, String>>,
}

impl InMemoryCatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRegistry for InMemoryCatalogRegistry {
    async fn add_member(&self, set_name: &str, member: &str) -> Result<(), DomainError> {
        self.sets
            .entry(set_name.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), DomainError> {
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn members(&self, set_name: &str) -> Result<Vec<String>, DomainError> {
        Ok(self
            .sets
            .get(set_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        Ok(self
            .hashes
            .get(key)
            .map(|hash| hash.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_members_are_a_set() {
        let registry = InMemoryCatalogRegistry::new();
        registry.add_member("XmlaConnection", "sales").await.unwrap();
        registry.add_member("XmlaConnection", "sales").await.unwrap();
        registry.add_member("XmlaConnection", "hr").await.unwrap();

        assert_eq!(
            registry.members("XmlaConnection").await.unwrap(),
            vec!["hr".to_string(), "sales".to_string()]
        );
        assert!(registry.members("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hash_fields_overwrite() {
        let registry = InMemoryCatalogRegistry::new();
        let key = "XmlaConnection:sales";

        registry
            .set_hash_fields(key, &[("id".into(), "sales".into()), ("catalog".into(), "a".into())])
            .await
            .unwrap();
        registry
            .set_hash_fields(key, &[("catalog".into(), "b".into())])
            .await
            .unwrap();

        let hash = registry.hash_fields(key).await.unwrap();
        assert_eq!(hash.get("id").map(String::as_str), Some("sales"));
        assert_eq!(hash.get("catalog").map(String::as_str), Some("b"));
    }
}
