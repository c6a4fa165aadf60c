//! Hot-tier cache trait

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Key-value cache with per-entry TTL.
///
/// Values are raw strings so the trait stays dyn-compatible. `CacheExt`
/// adds typed JSON access on top.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Backend name used in logs and metrics labels
    fn backend(&self) -> &'static str;

    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a value, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes every key matching a glob pattern (`*` wildcard)
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    async fn clear(&self) -> Result<(), DomainError>;

    /// Approximate number of entries
    async fn size(&self) -> Result<usize, DomainError>;
}

/// Typed get/set over JSON
pub trait CacheExt: Cache {
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cache value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}

/// Converts a `*` glob into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    regex::Regex::new(&format!("^{}$", escaped))
        .map_err(|e| DomainError::cache(format!("Invalid pattern: {}", e)))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock cache for testing
    #[derive(Debug, Default)]
    pub struct MockCache {
        entries: Mutex<HashMap<String, (String, Duration)>>,
        error: Mutex<Option<String>>,
    }

    impl MockCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.error.lock().unwrap() = Some(error.into());
            self
        }

        /// TTL an entry was written with
        pub fn ttl_of(&self, key: &str) -> Option<Duration> {
            self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::cache(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        fn backend(&self) -> &'static str {
            "mock"
        }

        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.check_error()?;
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .map(|(value, _)| value.clone()))
        }

        async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
            self.check_error()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
            self.check_error()?;
            let regex = glob_to_regex(pattern)?;

            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|key, _| !regex.is_match(key));
            Ok(before - entries.len())
        }

        async fn clear(&self) -> Result<(), DomainError> {
            self.check_error()?;
            self.entries.lock().unwrap().clear();
            Ok(())
        }

        async fn size(&self) -> Result<usize, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockCache;
    use super::*;

    #[test]
    fn test_glob_is_anchored() {
        let regex = glob_to_regex("olap:cache:t1:sales:*").unwrap();
        assert!(regex.is_match("olap:cache:t1:sales:en:abc"));
        assert!(!regex.is_match("olap:cache:t1:sales2:en:abc"));
        assert!(!regex.is_match("x:olap:cache:t1:sales:en:abc"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let regex = glob_to_regex("model.v1:*").unwrap();
        assert!(regex.is_match("model.v1:a"));
        assert!(!regex.is_match("modelXv1:a"));
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = MockCache::new();
        cache
            .set("k", &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<Vec<i32>> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_delete_pattern_scopes_to_prefix() {
        let cache = MockCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_raw("olap:cache:t1:sales:en:a", "1", ttl).await.unwrap();
        cache.set_raw("olap:cache:t1:sales:zh:b", "2", ttl).await.unwrap();
        cache.set_raw("olap:cache:t1:finance:en:c", "3", ttl).await.unwrap();

        let deleted = cache.delete_pattern("olap:cache:t1:sales:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(cache.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let cache = MockCache::new().with_error("down");
        assert!(cache.get_raw("k").await.is_err());
    }
}
