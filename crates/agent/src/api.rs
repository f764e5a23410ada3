//! HTTP API for health checks, Prometheus metrics and loop status

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use opsloop_lib::{Agent, ServiceStatus};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

/// Returns 200 unless a monitored service is known to be down
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.agent.monitoring().health().report().await;

    let status_code = match report.status {
        ServiceStatus::Healthy | ServiceStatus::Degraded => StatusCode::OK,
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(report))
}

/// Ready once the control loop is running
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.agent.is_running();
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(serde_json::json!({ "ready": ready })))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent.status().await)
}

async fn decisions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent.recent_decisions().await)
}

async fn executions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent.executor().execution_history().await)
}

async fn learning(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent.learning().learning_summary().await)
}

async fn services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent.monitoring().health().report().await)
}

#[derive(Debug, Deserialize)]
struct SummaryParams {
    #[serde(default = "default_summary_hours")]
    hours: u32,
}

fn default_summary_hours() -> u32 {
    1
}

async fn metrics_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> impl IntoResponse {
    Json(state.agent.monitoring().metrics_summary(params.hours))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .route("/api/v1/decisions", get(decisions))
        .route("/api/v1/executions", get(executions))
        .route("/api/v1/learning", get(learning))
        .route("/api/v1/services", get(services))
        .route("/api/v1/metrics/summary", get(metrics_summary))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use opsloop_lib::{Capabilities, LoopConfig, StructuredLogger};
    use tower::ServiceExt;

    fn setup_test_app() -> (Router, Arc<Agent>) {
        let agent = Arc::new(Agent::new(
            LoopConfig::default(),
            Capabilities::simulated(),
            StructuredLogger::new("api-test"),
        ));
        let state = Arc::new(AppState::new(Arc::clone(&agent)));
        (create_router(state), agent)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_with_healthy_services() {
        let (app, _) = setup_test_app();
        let (status, json) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert!(json["services"]["database"].is_object());
    }

    #[tokio::test]
    async fn test_healthz_unavailable_when_service_down() {
        let (app, agent) = setup_test_app();
        agent
            .monitoring()
            .health()
            .update(
                "database",
                opsloop_lib::ServiceHealth::unhealthy("connection refused"),
            )
            .await;

        let (status, json) = get_json(app, "/healthz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_readyz_before_start() {
        let (app, _) = setup_test_app();
        let (status, json) = get_json(app, "/readyz").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["ready"], false);
    }

    #[tokio::test]
    async fn test_status_report_shape() {
        let (app, _) = setup_test_app();
        let (status, json) = get_json(app, "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_running"], false);
        assert_eq!(json["monitoring"]["monitoring_interval"], 60);
        assert!(json["recent_decisions"].as_array().unwrap().is_empty());
        assert!(json["execution_history"].as_array().unwrap().is_empty());
        assert_eq!(json["learning_summary"]["total_actions_learned"], 0);
        assert!(json["learning_summary"]["action_effectiveness_by_type"].is_object());
        assert!(json["learning_summary"]["most_effective_action"].is_null());
    }

    #[tokio::test]
    async fn test_metrics_summary_hours_param() {
        let (app, _) = setup_test_app();
        let (status, json) = get_json(app, "/api/v1/metrics/summary?hours=6").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["period_hours"], 6);
        assert_eq!(json["total_datapoints"], 0);
    }

    #[tokio::test]
    async fn test_metrics_summary_huge_window_is_capped() {
        let (app, _) = setup_test_app();
        let (status, json) = get_json(app, "/api/v1/metrics/summary?hours=4294967295").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["period_hours"], 24);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _) = setup_test_app();
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("opsloop_"));
    }
}
