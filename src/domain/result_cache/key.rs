//! Result cache key derivation and staleness rules

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

/// Namespace of hot-tier result entries
pub const HOT_CACHE_NAMESPACE: &str = "olap:cache";

/// Offset subtracted from an entry's age before comparing it to the expiry.
///
/// Carried over from the legacy store, which wrote `createdAt` shifted by
/// eight hours. Keep until every durable store writes UTC timestamps.
pub const CLOCK_SKEW_OFFSET_SECS: i64 = 8 * 3600;

/// Lowercase hex MD5 digest of the query text
pub fn query_digest(query: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Language-partitioned compound lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultCacheKey {
    pub tenant_id: String,
    pub model_id: String,
    pub language: String,
    pub digest: String,
}

impl ResultCacheKey {
    pub fn new(
        tenant_id: Option<&str>,
        model_id: impl Into<String>,
        language: Option<&str>,
        query: &str,
    ) -> Self {
        Self {
            tenant_id: tenant_id.unwrap_or_default().to_string(),
            model_id: model_id.into(),
            language: language.unwrap_or_default().to_string(),
            digest: query_digest(query),
        }
    }

    /// Key under which the entry lives in the hot tier
    pub fn hot_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            HOT_CACHE_NAMESPACE, self.tenant_id, self.model_id, self.language, self.digest
        )
    }

    /// Pattern matching every hot entry of a model
    pub fn hot_model_pattern(tenant_id: Option<&str>, model_id: &str) -> String {
        format!(
            "{}:{}:{}:*",
            HOT_CACHE_NAMESPACE,
            tenant_id.unwrap_or_default(),
            model_id
        )
    }

    /// Identifier of the durable record
    pub fn record_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.tenant_id, self.model_id, self.language, self.digest
        )
    }
}

/// True when a durable entry must be discarded.
///
/// Entries never go stale when the model sets no expiry.
pub fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>, expires: Option<u64>) -> bool {
    let Some(expires) = expires else {
        return false;
    };
    let age = (now - created_at).num_seconds() - CLOCK_SKEW_OFFSET_SECS;
    age > expires as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_digest_is_lowercase_md5() {
        assert_eq!(query_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(query_digest("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_language_partitions_keys() {
        let en = ResultCacheKey::new(Some("t1"), "sales", Some("en"), "SELECT 1");
        let zh = ResultCacheKey::new(Some("t1"), "sales", Some("zh"), "SELECT 1");

        assert_eq!(en.digest, zh.digest);
        assert_ne!(en.hot_key(), zh.hot_key());
        assert_ne!(en.record_id(), zh.record_id());
    }

    #[test]
    fn test_hot_key_layout() {
        let key = ResultCacheKey::new(Some("t1"), "sales", Some("en"), "abc");
        assert_eq!(
            key.hot_key(),
            "olap:cache:t1:sales:en:900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            ResultCacheKey::hot_model_pattern(Some("t1"), "sales"),
            "olap:cache:t1:sales:*"
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let created = Utc::now();
        let expires = 60;

        let fresh = created + Duration::seconds(1);
        assert!(!is_stale(created, fresh, Some(expires)));

        let edge = created + Duration::seconds(expires as i64 + CLOCK_SKEW_OFFSET_SECS);
        assert!(!is_stale(created, edge, Some(expires)));

        let stale = created + Duration::seconds(expires as i64 + CLOCK_SKEW_OFFSET_SECS + 1);
        assert!(is_stale(created, stale, Some(expires)));
    }

    #[test]
    fn test_no_expiry_never_stale() {
        let created = Utc::now() - Duration::days(365);
        assert!(!is_stale(created, Utc::now(), None));
    }
}
