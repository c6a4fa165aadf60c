//! Query log persistence

mod storage_repository;

pub use storage_repository::StorageQueryLogRepository;
