//! Domain layer - entities, collaborator contracts and errors

pub mod cache;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod model;
pub mod query;
pub mod query_log;
pub mod result_cache;
pub mod runner;
pub mod storage;

pub use cache::{Cache, CacheExt};
pub use catalog::{CatalogEntry, CatalogRegistry};
pub use error::DomainError;
pub use gateway::{
    ExecutionQueue, GatewayQuery, QueryKind, QueryResultMessage, ResultSink, RunRequest,
    SessionKeyResolver,
};
pub use model::{
    DataSource, DataSourceType, ModelId, ModelPreferences, ModelType, Protocol, RoleBinding,
    SemanticModel,
};
pub use query::{ErrorCategory, OlapRequest, OlapResult, QueryError, QueryUser};
pub use query_log::{QueryLogEntry, QueryLogId, QueryLogRepository, QueryLogStatus};
pub use result_cache::{CachedQueryResult, CachedResultId, CachedResultRepository, ResultCacheKey};
pub use runner::{QueryRunner, QueryRunnerFactory, RunOptions};
pub use storage::{Storage, StorageEntity, StorageKey};
