/// /auth/* endpoints: registration, login and agent administration
use crate::{
    agent::{
        AgentProfile, ApproveAgentRequest, LoginRequest, LoginResponse, RegisterAgentRequest,
        RegisterAgentResponse, TestSmsRequest,
    },
    api::extract::ValidatedJson,
    auth::SuperAdmin,
    context::AppContext,
    db::agent::Agent,
    error::AppResult,
    metrics,
    notifier::Delivery,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register-agent", post(register_agent))
        .route("/auth/login", post(login))
        .route("/auth/approve-agent", post(approve_agent))
        .route("/auth/pending-agents", get(pending_agents))
        .route("/auth/all-agents", get(all_agents))
        .route("/auth/agent/:id", get(get_agent))
        .route("/auth/test-sms", post(test_sms))
}

/// Register agent endpoint
async fn register_agent(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<RegisterAgentRequest>,
) -> AppResult<(StatusCode, Json<RegisterAgentResponse>)> {
    let agent = ctx.agent_manager.register(req).await?;
    metrics::record_agent_registration();

    // Registration stands even if the admin never hears about it
    ctx.notifier.agent_registered(&agent).await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAgentResponse {
            message: "Agent registered successfully".to_string(),
            agent_id: agent.id,
        }),
    ))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (agent, token) = ctx.agent_manager.login(&req.email, &req.password).await?;
    tracing::info!(agent_id = %agent.id, "agent logged in");

    Ok(Json(LoginResponse {
        token,
        agent: AgentProfile::from(&agent),
    }))
}

/// Approve agent endpoint
async fn approve_agent(
    State(ctx): State<AppContext>,
    SuperAdmin(admin): SuperAdmin,
    ValidatedJson(req): ValidatedJson<ApproveAgentRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let agent = ctx.agent_manager.approve(&req.agent_id).await?;
    tracing::info!(agent_id = %agent.id, approved_by = %admin.id, "agent approval granted");

    let (sms, email) = ctx.notifier.agent_approved(&agent).await;
    if !sms.is_sent() || !email.is_sent() {
        tracing::warn!(agent_id = %agent.id, ?sms, ?email, "welcome notifications incomplete");
    }

    Ok(Json(json!({
        "message": "Agent approved successfully. Welcome email and SMS have been sent.",
        "agent": agent,
    })))
}

/// List agents awaiting approval
async fn pending_agents(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
) -> AppResult<Json<Vec<Agent>>> {
    Ok(Json(ctx.agent_manager.list_pending().await?))
}

/// List every agent
async fn all_agents(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
) -> AppResult<Json<Vec<Agent>>> {
    Ok(Json(ctx.agent_manager.list_all().await?))
}

/// Get a single agent
async fn get_agent(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<Agent>> {
    Ok(Json(ctx.agent_manager.get_agent(&id).await?))
}

/// Send an arbitrary SMS to check the gateway
async fn test_sms(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
    ValidatedJson(req): ValidatedJson<TestSmsRequest>,
) -> Response {
    match ctx.notifier.sms(&req.phone, req.message).await {
        Delivery::Sent { id } => Json(json!({
            "success": true,
            "message": "SMS sent successfully",
            "sid": id,
        }))
        .into_response(),
        Delivery::Skipped => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to send SMS",
                "error": "SMS gateway is not configured",
            })),
        )
            .into_response(),
        Delivery::Failed(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to send SMS",
                "error": reason,
            })),
        )
            .into_response(),
    }
}
