//! Routes queries to the embedded engine or a remote XMLA source

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::OlapConfig;
use crate::domain::model::SemanticModel;
use crate::domain::query::{sanitize_payload, QueryError};
use crate::domain::runner::{QueryRunner, QueryRunnerFactory, RunOptions};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_olap_query, QueryPath};
use crate::infrastructure::olap::{XmlaHttpRequest, XmlaTransport, ROLE_HEADER};
use crate::infrastructure::pool::ConnectionPool;

/// Hard limit of a remote XMLA round trip
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct QueryRouterConfig {
    /// Embedded engine XMLA endpoint
    pub olap_url: String,
    /// `host:port` of the embedded engine, quoted in error messages
    pub olap_endpoint: String,
    pub olap_timeout: Duration,
    pub remote_timeout: Duration,
}

impl Default for QueryRouterConfig {
    fn default() -> Self {
        Self::from(&OlapConfig::default())
    }
}

impl From<&OlapConfig> for QueryRouterConfig {
    fn from(config: &OlapConfig) -> Self {
        Self {
            olap_url: config.xmla_url(),
            olap_endpoint: config.endpoint(),
            olap_timeout: config.timeout(),
            remote_timeout: REMOTE_TIMEOUT,
        }
    }
}

/// Per-call routing options
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Pool scope of remote runners
    pub session_id: String,
    pub language: Option<String>,
    /// Encoded role header value, sent to the embedded engine only
    pub role_header: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl RouteOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_role_header(mut self, header: Option<String>) -> Self {
        self.role_header = header;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Picks the execution path of a model's queries
#[derive(Debug)]
pub struct QueryRouter {
    transport: Arc<dyn XmlaTransport>,
    pool: Arc<ConnectionPool>,
    runners: Arc<dyn QueryRunnerFactory>,
    config: QueryRouterConfig,
}

impl QueryRouter {
    pub fn new(
        transport: Arc<dyn XmlaTransport>,
        pool: Arc<ConnectionPool>,
        runners: Arc<dyn QueryRunnerFactory>,
        config: QueryRouterConfig,
    ) -> Self {
        Self {
            transport,
            pool,
            runners,
            config,
        }
    }

    /// Executes an XMLA body and returns the sanitized raw payload
    #[instrument(skip(self, model, body, options), fields(model_id = %model.id(), session_id = %options.session_id))]
    pub async fn route(
        &self,
        model: &SemanticModel,
        body: &str,
        options: &RouteOptions,
    ) -> Result<String, QueryError> {
        let started = Instant::now();

        let (path, result) = if model.data_source().protocol().is_remote() {
            (QueryPath::RemoteXmla, self.remote(model, body, options).await)
        } else {
            (QueryPath::Embedded, self.embedded(body, options).await)
        };

        record_olap_query(path, result.is_ok(), started.elapsed());
        if let Err(e) = &result {
            warn!(path = path.as_str(), category = %e.category(), error = %e, "OLAP query failed");
        }
        result.map(sanitize_payload)
    }

    /// Runs a SQL statement on the model's pooled data source runner
    #[instrument(skip(self, model, statement, options), fields(model_id = %model.id(), session_id = %options.session_id))]
    pub async fn execute_sql(
        &self,
        model: &SemanticModel,
        statement: &str,
        options: &RouteOptions,
    ) -> Result<String, QueryError> {
        let started = Instant::now();
        let runner = self.acquire(model, &options.session_id).await?;

        let mut run_options = RunOptions::new();
        if let Some(catalog) = model.catalog() {
            run_options = run_options.with_catalog(catalog);
        }

        let result = self
            .bounded(
                runner.run_query(statement, &run_options),
                &model.data_source().name,
                options.cancel.as_ref(),
            )
            .await;

        record_olap_query(QueryPath::Sql, result.is_ok(), started.elapsed());
        result.map(sanitize_payload)
    }

    async fn remote(
        &self,
        model: &SemanticModel,
        body: &str,
        options: &RouteOptions,
    ) -> Result<String, QueryError> {
        let runner = self.acquire(model, &options.session_id).await?;

        let mut run_options = RunOptions::new();
        if let Some(language) = &options.language {
            run_options = run_options.with_header("Accept-Language", language);
        }
        if let Some(catalog) = model.catalog() {
            run_options = run_options.with_catalog(catalog);
        }

        debug!(data_source_id = %model.data_source().id, "Forwarding to remote XMLA source");
        self.bounded(
            runner.run_query(body, &run_options),
            &model.data_source().name,
            options.cancel.as_ref(),
        )
        .await
    }

    async fn embedded(&self, body: &str, options: &RouteOptions) -> Result<String, QueryError> {
        let mut request = XmlaHttpRequest::new(
            &self.config.olap_url,
            &self.config.olap_endpoint,
            body,
            self.config.olap_timeout,
        );
        if let Some(language) = &options.language {
            request = request.with_header("Accept-Language", language);
        }
        if let Some(roles) = &options.role_header {
            request = request.with_header(ROLE_HEADER, roles);
        }

        self.transport.post(request, options.cancel.clone()).await
    }

    async fn acquire(
        &self,
        model: &SemanticModel,
        session_id: &str,
    ) -> Result<Arc<dyn QueryRunner>, QueryError> {
        let data_source = model.data_source();
        self.pool
            .acquire(session_id, &data_source.id, || {
                self.runners
                    .resolve(&data_source.source_type.name, &data_source.options)
            })
            .await
            .map_err(into_query_error)
    }

    /// Applies the remote timeout and the caller's abort signal
    async fn bounded(
        &self,
        call: impl std::future::Future<Output = Result<String, QueryError>>,
        endpoint: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, QueryError> {
        let timed = tokio::time::timeout(self.config.remote_timeout, call);

        let outcome = match cancel {
            Some(cancel) => tokio::select! {
                outcome = timed => outcome,
                _ = cancel.cancelled() => return Err(QueryError::aborted(endpoint)),
            },
            None => timed.await,
        };

        outcome.unwrap_or_else(|_| Err(QueryError::timeout(endpoint)))
    }
}

fn into_query_error(error: DomainError) -> QueryError {
    match error {
        DomainError::Query(error) => error,
        other => QueryError::execution(other.to_string()),
    }
}
