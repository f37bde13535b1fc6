/// Payment recording
///
/// A payment adds to the customer's running balance; both writes commit in
/// one transaction so the balance always equals the sum of the payments.

mod manager;

pub use manager::PaymentManager;

use crate::{
    db::{
        customer::Customer,
        payment::{NotifyType, Payment, PaymentWithNames},
    },
    error::AppError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest single payment accepted
pub const MAX_PAYMENT_AMOUNT: i64 = 1_000_000_000;

/// Ceiling on a customer's running balance
pub const MAX_BALANCE: i64 = 1_000_000_000_000_000;

/// Payment recording request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPaymentRequest {
    #[validate(length(min = 1, message = "Customer ID is required"))]
    pub customer_id: String,
    #[validate(range(
        min = 1,
        max = MAX_PAYMENT_AMOUNT,
        message = "Amount must be a positive number no greater than 1000000000"
    ))]
    pub amount: i64,
    /// ISO date or datetime; defaults to now
    pub payment_date: Option<String>,
    #[validate(range(min = 1, message = "Payment index must be at least 1"))]
    pub payment_index: Option<i64>,
    pub notify_type: NotifyType,
}

impl AddPaymentRequest {
    /// Timestamp the payment is recorded at
    pub fn recorded_at(&self) -> Result<DateTime<Utc>, AppError> {
        match self.payment_date.as_deref().map(str::trim) {
            None | Some("") => Ok(Utc::now()),
            Some(raw) => parse_payment_date(raw)
                .ok_or_else(|| AppError::invalid("paymentDate", "Payment date must be a valid date")),
        }
    }
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date
fn parse_payment_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Result of recording a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPaymentResponse {
    pub payment: Payment,
    pub customer: Customer,
}

/// Payment as listed, with display names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListing {
    #[serde(flatten)]
    pub payment: Payment,
    pub customer_name: Option<String>,
    pub agent_name: String,
}

impl From<PaymentWithNames> for PaymentListing {
    fn from(row: PaymentWithNames) -> Self {
        let agent_name = row.agent_name();
        Self {
            payment: row.payment,
            customer_name: row.customer_name,
            agent_name,
        }
    }
}

/// Outcome of clearing payment history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub payments_deleted: u64,
    pub customers_reset: u64,
}
