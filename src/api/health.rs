/// Health check and metrics endpoints
///
/// Liveness answers as long as the process can respond; readiness also
/// requires the database. The detailed check reports each component and
/// treats an unconfigured notification channel as degraded rather than down.

use crate::{context::AppContext, error::AppResult, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
        .route("/metrics", get(metrics_handler))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe; 503 while the database is unreachable
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness probe failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let checks = vec![
        check_database_detailed(&ctx).await,
        channel_health("email", ctx.notifier.email_configured()),
        channel_health("sms", ctx.notifier.sms_configured()),
    ];

    let overall_status = determine_overall_status(&checks);
    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let health = HealthStatus {
        message: (overall_status != "healthy")
            .then(|| "One or more components are not healthy".to_string()),
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: ctx.started_at.elapsed().as_secs_f64(),
        checks,
    };

    (status_code, Json(health))
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    metrics::UPTIME_SECONDS.set(ctx.started_at.elapsed().as_secs_f64());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

async fn check_database(ctx: &AppContext) -> AppResult<()> {
    crate::db::test_connection(&ctx.db).await
}

async fn check_database_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = check_database(ctx).await;

    ComponentHealth {
        name: "database".to_string(),
        status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: result.err().map(|e| e.to_string()),
    }
}

fn channel_health(name: &str, configured: bool) -> ComponentHealth {
    ComponentHealth {
        name: name.to_string(),
        status: if configured { "healthy" } else { "degraded" }.to_string(),
        response_time_ms: None,
        error: (!configured).then(|| "not configured".to_string()),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy".to_string()
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
