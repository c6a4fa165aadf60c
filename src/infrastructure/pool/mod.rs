//! Connection pool infrastructure

mod connection_pool;

pub use connection_pool::{ConnectionPool, PoolKey, DEFAULT_IDLE_TTL};
