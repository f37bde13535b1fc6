/// /payments/* endpoints
use crate::{
    api::extract::ValidatedJson,
    auth::ApprovedAgent,
    context::AppContext,
    db::payment::NotifyType,
    error::{AppError, AppResult},
    payment::{AddPaymentRequest, AddPaymentResponse, PaymentListing},
    schedule::{self, Calendar},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// Build payment routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/payments/add", post(add_payment))
        .route("/payments/list", get(list_payments))
        .route("/payments/customer/:customer_id", get(payments_by_customer))
        .route("/payments/agent/:agent_id", get(payments_by_agent))
        .route("/payments/schedule/:customer_id", get(payment_schedule))
        .route("/payments/clear-all", delete(clear_all))
}

/// Record a payment and send the requested receipt
async fn add_payment(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    ValidatedJson(req): ValidatedJson<AddPaymentRequest>,
) -> AppResult<(StatusCode, Json<AddPaymentResponse>)> {
    let (payment, customer) = ctx.payment_manager.add(&agent, &req).await?;

    // The payment is committed; a failed receipt is only logged
    match payment.notify_type {
        NotifyType::Sms => {
            ctx.notifier
                .payment_receipt_sms(&customer, payment.amount)
                .await;
        }
        NotifyType::Email => {
            if let Some(address) = &customer.email {
                ctx.notifier
                    .payment_receipt_email(&customer, address, payment.amount)
                    .await;
            }
        }
        NotifyType::None => {}
    }

    Ok((
        StatusCode::CREATED,
        Json(AddPaymentResponse { payment, customer }),
    ))
}

/// Every payment with display names
async fn list_payments(
    State(ctx): State<AppContext>,
    _agent: ApprovedAgent,
) -> AppResult<Json<Vec<PaymentListing>>> {
    let rows = ctx.payment_manager.list_all().await?;
    Ok(Json(rows.into_iter().map(PaymentListing::from).collect()))
}

/// Payments of one customer
async fn payments_by_customer(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    Path(customer_id): Path<String>,
) -> AppResult<Json<Vec<PaymentListing>>> {
    let rows = ctx
        .payment_manager
        .list_by_customer(&customer_id, agent.scope())
        .await?;
    Ok(Json(rows.into_iter().map(PaymentListing::from).collect()))
}

/// Payments collected by one agent; self or super-admin
async fn payments_by_agent(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    Path(agent_id): Path<String>,
) -> AppResult<Json<Vec<PaymentListing>>> {
    if !agent.scope().covers(&agent_id) {
        return Err(AppError::Authorization("Unauthorized".to_string()));
    }

    let rows = ctx.payment_manager.list_by_agent(&agent_id).await?;
    Ok(Json(rows.into_iter().map(PaymentListing::from).collect()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduleQuery {
    selected: Option<i64>,
}

/// Contribution calendar for a customer
async fn payment_schedule(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
    Path(customer_id): Path<String>,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<Calendar>> {
    let customer = ctx
        .customer_manager
        .get_scoped(&customer_id, agent.scope())
        .await?;
    let payments = ctx
        .payment_manager
        .payments_for_customer(&customer.id)
        .await?;

    Ok(Json(schedule::calendar(
        customer.contribution_frequency,
        &payments,
        Utc::now().date_naive(),
        query.selected,
    )))
}

/// Delete payment history and zero balances in the caller's scope
async fn clear_all(
    State(ctx): State<AppContext>,
    ApprovedAgent(agent): ApprovedAgent,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = ctx.payment_manager.clear_all(agent.scope()).await?;
    tracing::info!(agent_id = %agent.id, "clear-all requested");

    Ok(Json(json!({
        "message": "All payment history and balances cleared successfully",
        "paymentsDeleted": outcome.payments_deleted,
        "customersReset": outcome.customers_reset,
    })))
}
