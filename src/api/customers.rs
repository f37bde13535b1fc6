/// /customers/* endpoints
use crate::{
    api::extract::ValidatedJson,
    auth::{issue_link_token, verify_link_token, ApprovedAgent, SuperAdmin},
    context::AppContext,
    customer::{
        ApproveDeletionRequest, CreateCustomerRequest, DeletionDecision, RequestDeletionRequest,
        ReviewLinkQuery,
    },
    db::customer::Customer,
    error::{AppError, AppResult},
    metrics,
    notifier::{templates, ReviewLinks},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Build customer routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/customers/list", get(list_customers))
        .route("/customers/create", post(create_customer))
        .route("/customers/request-deletion", post(request_deletion))
        .route("/customers/approve-deletion", post(approve_deletion))
        .route(
            "/customers/approve-deletion/:customer_id",
            get(approve_deletion_link),
        )
        .route("/customers/deny-deletion/:customer_id", get(deny_deletion_link))
        .route("/customers/pending-deletions", get(pending_deletions))
        .route("/customers/agent/:agent_id", get(customers_by_agent))
        .route("/customers/:id", get(get_customer).delete(delete_customer))
}

/// List the caller's customers (all customers for a super-admin)
async fn list_customers(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(ctx.customer_manager.list(agent.scope()).await?))
}

/// Get one customer visible to the caller
async fn get_customer(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    Path(id): Path<String>,
) -> AppResult<Json<Customer>> {
    Ok(Json(
        ctx.customer_manager.get_scoped(&id, agent.scope()).await?,
    ))
}

/// Create customer endpoint
async fn create_customer(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let customer = ctx.customer_manager.create(&agent, req).await?;
    metrics::record_customer_created();

    let (sms, email) = ctx.notifier.customer_welcome(&customer).await;
    tracing::debug!(customer_id = %customer.id, ?sms, ?email, "welcome notifications");

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Delete a customer outright; super-admin only
async fn delete_customer(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !agent.role.is_super_admin() {
        return Err(AppError::Authorization(
            "Only super admin can delete customers directly".to_string(),
        ));
    }

    ctx.customer_manager.delete(&id).await?;

    Ok(Json(json!({
        "message": "Customer and all associated payments deleted successfully"
    })))
}

/// File a deletion request and email the admin review links
async fn request_deletion(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    ValidatedJson(req): ValidatedJson<RequestDeletionRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let reason = req.reason_or_default();
    let customer = ctx
        .customer_manager
        .request_deletion(&req.customer_id, &agent, &reason)
        .await?;

    let links = review_links(&ctx, &customer.id)?;
    ctx.notifier
        .deletion_requested(&customer, &agent, &reason, &links)
        .await;

    Ok(Json(json!({
        "message": "Deletion request submitted successfully",
        "customer": customer,
    })))
}

fn review_links(ctx: &AppContext, customer_id: &str) -> AppResult<ReviewLinks> {
    let auth = &ctx.config.authentication;
    let base = ctx.config.service.public_url.trim_end_matches('/');

    let approve = issue_link_token(auth, customer_id, DeletionDecision::Approve)?;
    let deny = issue_link_token(auth, customer_id, DeletionDecision::Deny)?;

    Ok(ReviewLinks {
        approve_url: format!(
            "{}/customers/approve-deletion/{}?token={}",
            base, customer_id, approve
        ),
        deny_url: format!("{}/customers/deny-deletion/{}?token={}", base, customer_id, deny),
    })
}

/// Resolve a request and tell the owning agent
async fn resolve_and_notify(
    ctx: &AppContext,
    customer_id: &str,
    decision: DeletionDecision,
) -> AppResult<Customer> {
    let customer = ctx
        .customer_manager
        .resolve_deletion(customer_id, decision)
        .await?;

    match ctx.agent_manager.find_by_id(&customer.agent_id).await? {
        Some(owner) => {
            ctx.notifier
                .deletion_resolved(&customer, &owner, decision == DeletionDecision::Approve)
                .await;
        }
        None => tracing::warn!(customer_id = %customer.id, "owning agent missing, not notified"),
    }

    Ok(customer)
}

/// Admin decision over the JSON API
async fn approve_deletion(
    State(ctx): State<AppContext>,
    SuperAdmin(admin): SuperAdmin,
    ValidatedJson(req): ValidatedJson<ApproveDeletionRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let decision = DeletionDecision::from_approved(req.approved.unwrap_or(false));
    resolve_and_notify(&ctx, &req.customer_id, decision).await?;
    tracing::info!(
        customer_id = %req.customer_id,
        decision = decision.as_str(),
        resolved_by = %admin.id,
        "deletion request resolved"
    );

    Ok(Json(json!({ "message": decision.message() })))
}

async fn approve_deletion_link(
    State(ctx): State<AppContext>,
    Path(customer_id): Path<String>,
    Query(query): Query<ReviewLinkQuery>,
) -> Response {
    review_link(&ctx, &customer_id, &query.token, DeletionDecision::Approve).await
}

async fn deny_deletion_link(
    State(ctx): State<AppContext>,
    Path(customer_id): Path<String>,
    Query(query): Query<ReviewLinkQuery>,
) -> Response {
    review_link(&ctx, &customer_id, &query.token, DeletionDecision::Deny).await
}

/// Admin decision through an emailed link; answers with an HTML page
async fn review_link(
    ctx: &AppContext,
    customer_id: &str,
    token: &str,
    decision: DeletionDecision,
) -> Response {
    let dashboard = format!("{}/admin", ctx.config.service.frontend_url.trim_end_matches('/'));

    let result = match verify_link_token(&ctx.config.authentication, token, customer_id, decision) {
        Ok(()) => resolve_and_notify(ctx, customer_id, decision).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(customer) => {
            let name = templates::escape_html(&customer.full_name());
            let (title, message) = match decision {
                DeletionDecision::Approve => (
                    "Customer Deletion Approved",
                    format!(
                        "The customer <strong>{}</strong> has been successfully deleted from the \
                         system. A confirmation email has been sent to the requesting agent.",
                        name
                    ),
                ),
                DeletionDecision::Deny => (
                    "Customer Deletion Denied",
                    format!(
                        "The deletion request for <strong>{}</strong> has been denied. The \
                         customer account remains active and the agent has been notified.",
                        name
                    ),
                ),
            };
            Html(templates::review_page(title, &message, &dashboard)).into_response()
        }
        Err(e) => {
            let (status, message) = match e {
                AppError::NotFound(m) => (StatusCode::NOT_FOUND, m),
                AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
                AppError::Authorization(m) => (StatusCode::FORBIDDEN, m),
                other => {
                    tracing::error!(error = %other, customer_id = %customer_id, "review link failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Server error occurred".to_string(),
                    )
                }
            };
            (
                status,
                Html(templates::review_page(
                    "Request Not Completed",
                    &templates::escape_html(&message),
                    &dashboard,
                )),
            )
                .into_response()
        }
    }
}

/// Customers with an open deletion request
async fn pending_deletions(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(ctx.customer_manager.pending_deletions().await?))
}

/// Customers owned by one agent
async fn customers_by_agent(
    State(ctx): State<AppContext>,
    _admin: SuperAdmin,
    Path(agent_id): Path<String>,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(ctx.customer_manager.list_by_agent(&agent_id).await?))
}
