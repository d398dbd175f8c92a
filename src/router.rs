use crate::app_state::AppState;
use crate::store;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

/// HTTP surface shared by the binary and the integration tests.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tools/trigger_job", post(crate::rpc::tools::trigger_job))
        .route(
            "/tools/get_build_status",
            post(crate::rpc::tools::get_build_status),
        )
        .route("/tools/list_jobs", post(crate::rpc::tools::list_jobs))
        .route(
            "/tools/get_job_parameters",
            post(crate::rpc::tools::get_job_parameters),
        )
        .route(
            "/webhook/jenkins",
            post(crate::webhook::handler::handle_jenkins_webhook),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let store_healthy = store::health_check(&state.conn).await;

    if store_healthy {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "store": "connected",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unhealthy",
                "store": "disconnected",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
    }
}
