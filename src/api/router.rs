use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

use super::health;
use super::state::AppState;

/// Create the operational router, with `/metrics` when a recorder is installed
pub fn create_router_with_state(
    state: AppState,
    metrics: Option<(PrometheusMetrics, String)>,
) -> Router {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .with_state(state);

    let router = match metrics {
        Some((metrics, path)) => router.merge(create_metrics_router(metrics, &path)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}
