//! Result cache domain - cached payloads, keys and staleness rules

mod entity;
mod key;
mod repository;

pub use entity::{CachedQueryResult, CachedResultId};
pub use key::{
    is_stale, query_digest, ResultCacheKey, CLOCK_SKEW_OFFSET_SECS, HOT_CACHE_NAMESPACE,
};
pub use repository::CachedResultRepository;
