//! Session key derivation

use std::fmt::Debug;

/// Maps a caller session and model to the key that orders its runs
pub trait SessionKeyResolver: Send + Sync + Debug {
    fn resolve(&self, session_id: &str, model_id: &str) -> String;
}

/// Resolves `analytics:{model_id}:{session_id}`
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSessionKeyResolver;

impl SessionKeyResolver for AnalyticsSessionKeyResolver {
    fn resolve(&self, session_id: &str, model_id: &str) -> String {
        format!("analytics:{}:{}", model_id, session_id)
    }
}
