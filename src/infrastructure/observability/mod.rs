//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_cache_lookup, record_gateway_query,
    record_olap_query, record_pool_event, PrometheusMetrics, QueryPath,
};
