//! Publishes semantic model schemas to the shared catalog registry

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::catalog::{CatalogEntry, CatalogRegistry, DEFAULT_CATALOG_SET};
use crate::domain::model::{ModelType, Protocol, SemanticModel};
use crate::domain::runner::QueryRunnerFactory;
use crate::domain::DomainError;
use crate::infrastructure::catalog::{build_schema, cube_count, schema_document};

use super::result_cache::ResultCache;

/// Converts model schemas into XML catalogs and upserts them into the registry
#[derive(Debug)]
pub struct SchemaCatalogPublisher {
    registry: Arc<dyn CatalogRegistry>,
    runners: Arc<dyn QueryRunnerFactory>,
    result_cache: Option<Arc<ResultCache>>,
    set_name: String,
}

impl SchemaCatalogPublisher {
    pub fn new(registry: Arc<dyn CatalogRegistry>, runners: Arc<dyn QueryRunnerFactory>) -> Self {
        Self {
            registry,
            runners,
            result_cache: None,
            set_name: DEFAULT_CATALOG_SET.to_string(),
        }
    }

    pub fn with_set_name(mut self, set_name: impl Into<String>) -> Self {
        self.set_name = set_name.into();
        self
    }

    /// Cached results of a model are dropped whenever it is republished
    pub fn with_result_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.result_cache = Some(cache);
        self
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    /// Publishes the released schema under the model id.
    ///
    /// Returns `None` when the model is not served by the embedded engine or
    /// declares no cube.
    #[instrument(skip(self, model), fields(model_id = %model.id()))]
    pub async fn publish(&self, model: &SemanticModel) -> Result<Option<CatalogEntry>, DomainError> {
        match model.schema() {
            Some(schema) => self.publish_schema(model, schema, false).await,
            None => Ok(None),
        }
    }

    /// Publishes the draft schema under `{id}/draft`, falling back to the released one
    #[instrument(skip(self, model), fields(model_id = %model.id()))]
    pub async fn publish_draft(
        &self,
        model: &SemanticModel,
    ) -> Result<Option<CatalogEntry>, DomainError> {
        match model.draft_schema() {
            Some(schema) => self.publish_schema(model, schema, true).await,
            None => Ok(None),
        }
    }

    /// Publishes both catalogs of a model and drops its cached results
    #[instrument(skip(self, model), fields(model_id = %model.id()))]
    pub async fn publish_model(&self, model: &SemanticModel) -> Result<Vec<CatalogEntry>, DomainError> {
        let mut published = Vec::new();
        published.extend(self.publish(model).await?);
        published.extend(self.publish_draft(model).await?);

        if let Some(cache) = &self.result_cache {
            cache
                .invalidate_model(model.tenant_id(), model.id().as_str())
                .await;
        }

        info!(catalogs = published.len(), "Published model catalogs");
        Ok(published)
    }

    /// True when the embedded engine serves the model from a published catalog
    pub fn is_publishable(model: &SemanticModel, schema: &Value) -> bool {
        model.model_type() == ModelType::Xmla
            && model.data_source().protocol() == Protocol::Sql
            && cube_count(schema) > 0
    }

    /// Builds the catalog entry without publishing it
    pub async fn build_entry(
        &self,
        model: &SemanticModel,
        schema: &Value,
        draft: bool,
    ) -> Result<CatalogEntry, DomainError> {
        let catalog_content = build_schema(&schema_document(model, schema))?;

        let data_source = model.data_source();
        let runner = self
            .runners
            .resolve(&data_source.source_type.name, &data_source.options)
            .await?;

        let jdbc_driver = runner.jdbc_driver().unwrap_or_default().to_string();
        let jdbc_connection_string = runner.jdbc_url(model.catalog()).unwrap_or_default();

        Ok(CatalogEntry {
            name: model.id().catalog_name(draft),
            jdbc_driver,
            jdbc_connection_string,
            description: format!("Xmla connection for: {}", data_source.name),
            catalog: model.catalog().unwrap_or_default().to_string(),
            catalog_content,
        })
    }

    async fn publish_schema(
        &self,
        model: &SemanticModel,
        schema: &Value,
        draft: bool,
    ) -> Result<Option<CatalogEntry>, DomainError> {
        if !Self::is_publishable(model, schema) {
            debug!(draft, "Model has no embedded catalog to publish");
            return Ok(None);
        }

        let entry = self.build_entry(model, schema, draft).await?;

        self.registry
            .add_member(&self.set_name, &entry.name)
            .await?;
        self.registry
            .set_hash_fields(&entry.hash_key(&self.set_name), &entry.hash_fields())
            .await?;

        debug!(catalog = %entry.name, "Catalog entry upserted");
        Ok(Some(entry))
    }
}
