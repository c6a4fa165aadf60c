//! Query runner and runner factory contracts

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::query::QueryError;
use crate::domain::DomainError;

/// Per-call options passed to a runner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub headers: BTreeMap<String, String>,
    /// Catalog the statement runs against
    pub catalog: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }
}

/// Execution handle bound to a single data source
#[async_trait]
pub trait QueryRunner: Send + Sync + Debug {
    /// Runner type name, e.g. `xmla` or `pg`
    fn type_name(&self) -> &str;

    /// Runs a statement and returns the raw payload
    async fn run_query(&self, body: &str, options: &RunOptions) -> Result<String, QueryError>;

    /// Releases resources held by the runner. Must tolerate repeated calls.
    async fn teardown(&self) -> Result<(), DomainError>;

    /// JDBC driver class used when publishing a catalog for this source
    fn jdbc_driver(&self) -> Option<&str>;

    /// JDBC connection string for the given catalog
    fn jdbc_url(&self, catalog: Option<&str>) -> Option<String>;
}

/// Resolves a runner for a data source type
#[async_trait]
pub trait QueryRunnerFactory: Send + Sync + Debug {
    async fn resolve(
        &self,
        type_name: &str,
        options: &Value,
    ) -> Result<Arc<dyn QueryRunner>, DomainError>;
}
