//! Cache domain - hot-tier key-value cache abstraction

mod repository;

pub use repository::{glob_to_regex, Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
