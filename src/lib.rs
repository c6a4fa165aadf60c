//! OLAP Query Gateway
//!
//! Routes, caches and audits analytical queries against semantic models:
//! - Per-session pooled runners for remote XMLA sources
//! - An embedded OLAP engine fed from a shared catalog registry
//! - Two-tier result cache with per-model invalidation
//! - Session-ordered, concurrency-limited asynchronous execution

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::path::Path;
use std::sync::Arc;

use api::state::AppState;
use domain::catalog::CatalogEntry;
use domain::model::SemanticModel;
use domain::query_log::QueryLogEntry;
use domain::result_cache::CachedQueryResult;
use domain::storage::Storage;
use domain::DomainError;
use infrastructure::{
    cache::CacheFactory,
    catalog::create_catalog_registry,
    olap::{HttpXmlaTransport, XmlaTransport},
    pool::ConnectionPool,
    query_log::StorageQueryLogRepository,
    result_cache::StorageCachedResultRepository,
    runner::QueryRunnerRegistry,
    runtime::{LaneQueue, LaneQueueConfig},
    services::{
        AsyncExecutionCoordinator, OlapQueryService, QueryLogService, QueryRouter,
        QueryRouterConfig, ResultCache, SchemaCatalogPublisher,
    },
    sink::ChannelResultSink,
    storage::InMemoryStorage,
};
use tracing::{info, warn};

/// Wired gateway components sharing one pool, queue and cache
#[derive(Debug, Clone)]
pub struct Gateway {
    pub models: Arc<dyn Storage<SemanticModel>>,
    pub pool: Arc<ConnectionPool>,
    pub queue: Arc<LaneQueue>,
    pub sink: Arc<ChannelResultSink>,
    pub result_cache: Arc<ResultCache>,
    pub query_logs: Arc<QueryLogService>,
    pub olap: Arc<OlapQueryService>,
    pub publisher: Arc<SchemaCatalogPublisher>,
    pub coordinator: Arc<AsyncExecutionCoordinator>,
}

/// Create the gateway with default configuration
pub async fn create_gateway() -> anyhow::Result<Gateway> {
    create_gateway_with_config(&AppConfig::default()).await
}

/// Create the gateway with custom configuration
pub async fn create_gateway_with_config(config: &AppConfig) -> anyhow::Result<Gateway> {
    info!(
        cache = ?config.cache.backend,
        catalog = ?config.catalog.backend,
        olap = %config.olap.endpoint(),
        "Wiring gateway components"
    );

    let transport: Arc<dyn XmlaTransport> = Arc::new(HttpXmlaTransport::new()?);
    let runners = Arc::new(QueryRunnerRegistry::new(transport.clone(), config.olap.timeout()));
    let pool = Arc::new(ConnectionPool::new(config.pool.idle_ttl()));

    let hot = CacheFactory::new().create(&config.cache).await?;
    let durable = Arc::new(StorageCachedResultRepository::new(Arc::new(
        InMemoryStorage::<CachedQueryResult>::new(),
    )));
    let result_cache = Arc::new(ResultCache::new(hot, durable).with_hot_ttl(config.cache.hot_ttl()));

    let router = Arc::new(QueryRouter::new(
        transport,
        pool.clone(),
        runners.clone(),
        QueryRouterConfig::from(&config.olap),
    ));
    let olap = Arc::new(OlapQueryService::new(router.clone(), result_cache.clone()));

    let registry = create_catalog_registry(&config.catalog).await?;
    let publisher = Arc::new(
        SchemaCatalogPublisher::new(registry, runners)
            .with_set_name(&config.catalog.set_name)
            .with_result_cache(result_cache.clone()),
    );

    let models: Arc<dyn Storage<SemanticModel>> = Arc::new(InMemoryStorage::<SemanticModel>::new());
    let query_logs = Arc::new(QueryLogService::new(Arc::new(StorageQueryLogRepository::new(
        Arc::new(InMemoryStorage::<QueryLogEntry>::new()),
    ))));
    let queue = Arc::new(LaneQueue::new(LaneQueueConfig::from(&config.queue)));
    let sink = Arc::new(ChannelResultSink::new());

    let coordinator = Arc::new(AsyncExecutionCoordinator::new(
        models.clone(),
        query_logs.clone(),
        olap.clone(),
        router,
        queue.clone(),
        sink.clone(),
    ));

    Ok(Gateway {
        models,
        pool,
        queue,
        sink,
        result_cache,
        query_logs,
        olap,
        publisher,
        coordinator,
    })
}

impl Gateway {
    /// Stores a model and publishes its catalogs
    pub async fn register_model(
        &self,
        model: SemanticModel,
    ) -> Result<Vec<CatalogEntry>, DomainError> {
        let model = self.models.save(model).await?;
        self.publisher.publish_model(&model).await
    }

    /// Registers every `*.json` model document of a directory.
    ///
    /// Unreadable documents are logged and skipped.
    pub async fn load_models(&self, directory: &Path) -> anyhow::Result<usize> {
        let mut entries = tokio::fs::read_dir(directory).await?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let registered = match read_model_file(&path).await {
                Ok(model) => self.register_model(model).await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };

            match registered {
                Ok(catalogs) => {
                    info!(path = %path.display(), catalogs = catalogs.len(), "Loaded semantic model");
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping semantic model"),
            }
        }

        Ok(loaded)
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.models.clone(), self.pool.clone(), self.queue.clone())
    }

    /// Rejects queued work and tears down every pooled runner
    pub async fn shutdown(&self) {
        self.queue.close();
        let closed = self.pool.close().await;
        info!(runners = closed, "Gateway shut down");
    }
}

/// Reads a semantic model JSON document
pub async fn read_model_file(path: &Path) -> anyhow::Result<SemanticModel> {
    let content = tokio::fs::read_to_string(path).await?;
    let model = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid model document {}: {}", path.display(), e))?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::model::ModelId;
    use serde_json::json;

    fn model_document(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Sales",
            "type": "xmla",
            "catalog": "dw",
            "dataSource": {
                "id": "ds1",
                "name": "Warehouse",
                "type": {"name": "pg", "protocol": "sql"},
                "options": {"host": "db", "port": 5432, "database": "dw"}
            },
            "schema": {"cubes": [{"name": "Orders"}]},
            "roles": [{"name": "Finance", "users": ["u1"]}]
        })
    }

    fn scratch_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("olap-gateway-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_register_model_publishes_both_catalogs() {
        let gateway = create_gateway().await.unwrap();
        let model: SemanticModel = serde_json::from_value(model_document("sales")).unwrap();

        let catalogs = gateway.register_model(model).await.unwrap();

        let names: Vec<_> = catalogs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["sales", "sales/draft"]);
        assert_eq!(catalogs[0].jdbc_driver, "org.postgresql.Driver");
        assert!(gateway
            .models
            .exists(&ModelId::new("sales").unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_load_models_skips_invalid_documents() {
        let dir = scratch_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("sales.json"), model_document("sales").to_string())
            .await
            .unwrap();
        tokio::fs::write(dir.join("broken.json"), "{not json").await.unwrap();
        tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

        let gateway = create_gateway().await.unwrap();
        let loaded = gateway.load_models(&dir).await.unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(gateway.models.list().await.unwrap().len(), 1);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_queue() {
        let gateway = create_gateway().await.unwrap();
        gateway.shutdown().await;
        assert!(gateway.queue.is_closed());
    }
}
