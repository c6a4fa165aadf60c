//! Asynchronous, session-scoped execution of gateway queries

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::gateway::{
    AnalyticsSessionKeyResolver, ExecutionQueue, GatewayQuery, QueryKind, QueryResultMessage,
    ResultSink, RunRequest, SessionKeyResolver, MAIN_LANE,
};
use crate::domain::model::{ModelId, SemanticModel};
use crate::domain::query::{OlapRequest, OlapResult, QueryError};
use crate::domain::query_log::QueryLogId;
use crate::domain::storage::Storage;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_gateway_query;
use crate::infrastructure::olap::execute_envelope;

use super::olap_query_service::OlapQueryService;
use super::query_log_service::QueryLogService;
use super::query_router::{QueryRouter, RouteOptions};

/// Queue source tag of gateway runs
const RUN_SOURCE: &str = "gateway";

/// Handle returned once a query is queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub log_id: QueryLogId,
    pub run_id: String,
    pub session_key: String,
}

/// Collaborators a queued run needs once it is dequeued
#[derive(Debug)]
struct Executor {
    models: Arc<dyn Storage<SemanticModel>>,
    logs: Arc<QueryLogService>,
    olap: Arc<OlapQueryService>,
    router: Arc<QueryRouter>,
    sink: Arc<dyn ResultSink>,
}

/// Entry point for gateway-driven queries.
///
/// A submission creates the PENDING audit entry, then hands the work to the
/// execution queue. The run marks the entry RUNNING, dispatches on the query
/// kind and finalizes the entry exactly once before delivering the result
/// over the caller's session.
#[derive(Debug)]
pub struct AsyncExecutionCoordinator {
    executor: Arc<Executor>,
    queue: Arc<dyn ExecutionQueue>,
    sessions: Arc<dyn SessionKeyResolver>,
}

impl AsyncExecutionCoordinator {
    pub fn new(
        models: Arc<dyn Storage<SemanticModel>>,
        logs: Arc<QueryLogService>,
        olap: Arc<OlapQueryService>,
        router: Arc<QueryRouter>,
        queue: Arc<dyn ExecutionQueue>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            executor: Arc::new(Executor {
                models,
                logs,
                olap,
                router,
                sink,
            }),
            queue,
            sessions: Arc::new(AnalyticsSessionKeyResolver),
        }
    }

    pub fn with_session_resolver(mut self, sessions: Arc<dyn SessionKeyResolver>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Records and queues a query.
    ///
    /// Only the audit entry creation can fail here. Queue rejections are
    /// reported to the caller's session like any other failure.
    #[instrument(skip(self, query), fields(query_id = %query.id, model_id = %query.model_id, session_id = %query.session_id))]
    pub async fn submit(&self, query: GatewayQuery) -> Result<Submission, DomainError> {
        let entry = self.executor.logs.create_pending(&query).await?;
        let log_id = entry.id().clone();

        let run_id = self.queue.generate_run_id();
        let session_key = self.sessions.resolve(&query.session_id, &query.model_id);
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicBool::new(false));

        let task = self
            .executor
            .clone()
            .execute(query.clone(), log_id.clone(), cancel.clone(), started.clone())
            .boxed();

        let completion = self.queue.run(RunRequest {
            run_id: run_id.clone(),
            session_key: session_key.clone(),
            global_lane: MAIN_LANE.to_string(),
            cancel,
            source: RUN_SOURCE.to_string(),
            task,
        });

        let executor = self.executor.clone();
        let rejected_log = log_id.clone();
        tokio::spawn(async move {
            if let Err(e) = completion.await {
                if !started.load(Ordering::SeqCst) {
                    executor.reject(&query, &rejected_log, e).await;
                }
            }
        });

        debug!(run_id = %run_id, log_id = %log_id, "Gateway query queued");
        Ok(Submission {
            log_id,
            run_id,
            session_key,
        })
    }

    /// Aborts every queued or running query of a caller session on a model
    #[instrument(skip(self))]
    pub fn abort_session(&self, session_id: &str, model_id: &str) -> usize {
        let session_key = self.sessions.resolve(session_id, model_id);
        let aborted = self.queue.abort_session(&session_key);
        info!(session_key = %session_key, aborted, "Aborted session queries");
        aborted
    }

    /// Aborts a single run, returning false when it already finished
    pub fn abort(&self, run_id: &str) -> bool {
        self.queue.abort_run(run_id)
    }
}

impl Executor {
    async fn execute(
        self: Arc<Self>,
        query: GatewayQuery,
        log_id: QueryLogId,
        cancel: CancellationToken,
        started: Arc<AtomicBool>,
    ) {
        started.store(true, Ordering::SeqCst);

        if let Err(e) = self.logs.mark_running(&log_id).await {
            warn!(log_id = %log_id, error = %e, "Failed to mark query log running");
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueryError::aborted(format!("model {}", query.model_id))),
            result = AssertUnwindSafe(self.dispatch(&query, &cancel)).catch_unwind() => {
                result.unwrap_or_else(|panic| {
                    Err(QueryError::execution(format!(
                        "Query execution panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                })
            }
        };

        self.finish(&query, &log_id, outcome).await;
    }

    async fn dispatch(
        &self,
        query: &GatewayQuery,
        cancel: &CancellationToken,
    ) -> Result<OlapResult, QueryError> {
        let model = self.load_model(&query.model_id).await?;

        match &query.kind {
            QueryKind::Cube { statement, .. } => {
                let catalog = model.id().catalog_name(query.is_draft);
                let body = execute_envelope(statement, &catalog);
                self.olap
                    .query(&model, &olap_request(query, body), Some(cancel.clone()))
                    .await
            }
            QueryKind::Olap { body } => {
                self.olap
                    .query(&model, &olap_request(query, body.clone()), Some(cancel.clone()))
                    .await
            }
            QueryKind::Sql { statement } => {
                let options = RouteOptions::new(&query.session_id).with_cancel(cancel.clone());
                self.router
                    .execute_sql(&model, statement, &options)
                    .await
                    .map(OlapResult::fresh)
            }
        }
    }

    async fn load_model(&self, model_id: &str) -> Result<SemanticModel, QueryError> {
        let not_found = || QueryError::execution(format!("Semantic model '{}' not found", model_id));

        let id = ModelId::new(model_id).map_err(|_| not_found())?;
        match self.models.get(&id).await {
            Ok(Some(model)) => Ok(model),
            Ok(None) => Err(not_found()),
            Err(e) => Err(QueryError::execution(format!(
                "Failed to load semantic model '{}': {}",
                model_id, e
            ))),
        }
    }

    /// Finalizes the audit entry and delivers the outcome
    async fn finish(
        &self,
        query: &GatewayQuery,
        log_id: &QueryLogId,
        outcome: Result<OlapResult, QueryError>,
    ) {
        let (logged, message) = match outcome {
            Ok(result) => {
                record_gateway_query("success");
                (
                    Ok(json!({ "data": result.data, "cache": result.cache })),
                    QueryResultMessage::success(&query.id, result),
                )
            }
            Err(e) => {
                error!(log_id = %log_id, category = %e.category(), error = %e, "Gateway query failed");
                record_gateway_query("failed");
                (Err(e.to_string()), QueryResultMessage::failure(&query.id, &e))
            }
        };

        if let Err(e) = self.logs.complete(log_id, logged).await {
            warn!(log_id = %log_id, error = %e, "Failed to finalize query log");
        }

        self.deliver(&query.session_id, message).await;
    }

    /// Reports a run the queue refused before it started
    async fn reject(&self, query: &GatewayQuery, log_id: &QueryLogId, e: QueryError) {
        warn!(log_id = %log_id, error = %e, "Gateway query rejected by queue");
        if let Err(log_err) = self.logs.mark_failed(log_id, e.to_string()).await {
            warn!(log_id = %log_id, error = %log_err, "Failed to mark query log failed");
        }
        record_gateway_query("rejected");
        self.deliver(&query.session_id, QueryResultMessage::failure(&query.id, &e))
            .await;
    }

    async fn deliver(&self, session_id: &str, message: QueryResultMessage) {
        if let Err(e) = self.sink.send(session_id, message).await {
            warn!(session_id = %session_id, error = %e, "Failed to deliver query result");
        }
    }
}

fn olap_request(query: &GatewayQuery, body: String) -> OlapRequest {
    let mut request = OlapRequest::new(&query.id, &query.session_id, body).with_user(query.user.clone());
    if let Some(language) = &query.accept_language {
        request = request.with_language(language);
    }
    if query.force_refresh {
        request = request.force_refresh();
    }
    if query.is_draft {
        request = request.draft();
    }
    request
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
