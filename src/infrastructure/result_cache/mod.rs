//! Durable result cache persistence

mod storage_repository;

pub use storage_repository::StorageCachedResultRepository;
