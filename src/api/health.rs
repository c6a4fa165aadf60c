//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus, message: Option<String>, started: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }
}

/// Simple health check - returns 200 if the service is running
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check.
///
/// A closed execution queue cannot take queries, so it makes the service
/// unhealthy. A failing model store only degrades it.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let checks = vec![
        check_execution_queue(&state),
        check_model_store(&state).await,
        check_connection_pool(&state),
    ];

    let overall_status = checks.iter().fold(HealthStatus::Healthy, |acc, check| {
        match (acc, check.status) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    });

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still accept requests
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn check_execution_queue(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    if state.queue.is_closed() {
        return HealthCheck::new(
            "execution_queue",
            HealthStatus::Unhealthy,
            Some("queue is closed".to_string()),
            start,
        );
    }

    let message = format!(
        "{} pending, {} active",
        state.queue.pending(),
        state.queue.active()
    );
    HealthCheck::new("execution_queue", HealthStatus::Healthy, Some(message), start)
}

async fn check_model_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.models.list().await {
        Ok(models) => HealthCheck::new(
            "model_store",
            HealthStatus::Healthy,
            Some(format!("{} models", models.len())),
            start,
        ),
        Err(e) => HealthCheck::new(
            "model_store",
            HealthStatus::Degraded,
            Some(e.to_string()),
            start,
        ),
    }
}

fn check_connection_pool(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    HealthCheck::new(
        "connection_pool",
        HealthStatus::Healthy,
        Some(format!("{} pooled runners", state.pool.len())),
        start,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;

    use crate::domain::model::SemanticModel;
    use crate::domain::storage::mock::MockStorage;
    use crate::infrastructure::pool::ConnectionPool;
    use crate::infrastructure::runtime::LaneQueue;
    use crate::infrastructure::storage::InMemoryStorage;

    fn state(models: Arc<dyn crate::domain::storage::Storage<SemanticModel>>) -> AppState {
        AppState::new(
            models,
            Arc::new(ConnectionPool::default()),
            Arc::new(LaneQueue::default()),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "1.0.0".to_string(),
            checks: None,
            latency_ms: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("checks"));
    }

    #[tokio::test]
    async fn test_ready_when_queue_open() {
        let state = state(Arc::new(InMemoryStorage::<SemanticModel>::new()));

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_closed_queue_is_unavailable() {
        let state = state(Arc::new(InMemoryStorage::<SemanticModel>::new()));
        state.queue.close();

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_failing_model_store_degrades() {
        let state = state(Arc::new(
            MockStorage::<SemanticModel>::new().with_error("store offline"),
        ));

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"][1]["message"], "Storage error: store offline");
    }
}
