//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, CatalogConfig, LogFormat, LoggingConfig, MetricsConfig, ModelsConfig,
    OlapConfig, PoolConfig, QueueConfig, ServerConfig, StoreBackend,
};
