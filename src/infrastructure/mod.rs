//! Infrastructure layer - External service implementations

pub mod cache;
pub mod catalog;
pub mod logging;
pub mod observability;
pub mod olap;
pub mod pool;
pub mod query_log;
pub mod result_cache;
pub mod runner;
pub mod runtime;
pub mod services;
pub mod sink;
pub mod storage;
