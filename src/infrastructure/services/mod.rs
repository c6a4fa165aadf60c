//! Infrastructure services

mod access_control;
mod catalog_publisher;
mod coordinator;
mod olap_query_service;
mod query_log_service;
mod query_router;
mod result_cache;

pub use access_control::AccessControlInjector;
pub use catalog_publisher::SchemaCatalogPublisher;
pub use coordinator::{AsyncExecutionCoordinator, Submission};
pub use olap_query_service::OlapQueryService;
pub use query_log_service::QueryLogService;
pub use query_router::{QueryRouter, QueryRouterConfig, RouteOptions, REMOTE_TIMEOUT};
pub use result_cache::{ResultCache, DEFAULT_HOT_TTL};
