/// Payment database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Receipt channel chosen when a payment is recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotifyType {
    #[default]
    None,
    Sms,
    Email,
}

/// Payment record; never updated once written
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub customer_id: String,
    pub agent_id: String,
    pub amount: i64,
    pub method: String,
    pub notify_type: NotifyType,
    pub payment_index: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined with customer and agent names
#[derive(Debug, Clone, FromRow)]
pub struct PaymentWithNames {
    #[sqlx(flatten)]
    pub payment: Payment,
    pub customer_name: Option<String>,
    pub agent_last_name: Option<String>,
}

impl PaymentWithNames {
    /// Display name of the collecting agent, "Agent <last name>"
    pub fn agent_name(&self) -> String {
        match &self.agent_last_name {
            Some(last) => format!("Agent {}", last),
            None => "Unknown Agent".to_string(),
        }
    }
}
