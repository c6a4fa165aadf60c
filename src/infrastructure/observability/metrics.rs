//! Prometheus metrics

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Handle used to render the `/metrics` endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrometheusMetrics")
    }
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("olap_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Which executor served an OLAP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPath {
    Embedded,
    RemoteXmla,
    Sql,
}

impl QueryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::RemoteXmla => "remote_xmla",
            Self::Sql => "sql",
        }
    }
}

pub fn record_olap_query(path: QueryPath, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };

    counter!("olap_queries_total", "path" => path.as_str(), "status" => status).increment(1);
    histogram!("olap_query_duration_seconds", "path" => path.as_str())
        .record(duration.as_secs_f64());
}

/// Records a result cache lookup on a tier (`hot` or `durable`)
pub fn record_cache_lookup(tier: &'static str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("olap_cache_lookups_total", "tier" => tier, "outcome" => outcome).increment(1);
}

/// Records a connection pool event (`created`, `reused`, `evicted`, `teardown_failed`)
pub fn record_pool_event(event: &'static str) {
    counter!("connection_pool_events_total", "event" => event).increment(1);
}

/// Records the final status of a gateway query
pub fn record_gateway_query(status: &'static str) {
    counter!("gateway_queries_total", "status" => status).increment(1);
}
