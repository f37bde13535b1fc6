/// Customer management
///
/// Customers are savings-plan holders owned by a single agent. Deletion is a
/// two-step flow: the owning agent files a request and the admin resolves it,
/// either over the JSON API or through the signed links in the review email.

mod manager;

pub use manager::CustomerManager;

use crate::{agent::PHONE_RE, db::customer::ContributionFrequency, error::AppError};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Longest reason accepted on a deletion request
pub const MAX_REASON_LEN: u64 = 500;

/// Reason stored when the agent gives none
pub const DEFAULT_DELETION_REASON: &str = "No reason provided";

/// Treat `""` the same as an absent value
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Customer creation request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Valid date of birth is required"))]
    pub date_of_birth: String,
    #[validate(
        length(min = 1, message = "Phone number is required"),
        regex(
            path = *PHONE_RE,
            message = "Phone number must be valid (e.g., +1234567890 or 1234567890)"
        )
    )]
    pub phone: String,
    #[serde(deserialize_with = "empty_as_none")]
    #[validate(email(message = "Email must be valid"))]
    pub email: Option<String>,
    #[validate(range(min = 1, message = "Contribution amount must be a positive number"))]
    pub contribution_amount: i64,
    #[validate(required(message = "Contribution frequency is required"))]
    pub contribution_frequency: Option<ContributionFrequency>,
}

impl CreateCustomerRequest {
    /// Parse the ISO-8601 date of birth (`YYYY-MM-DD`, optionally with a time part)
    pub fn parsed_date_of_birth(&self) -> Result<NaiveDate, AppError> {
        let raw = self.date_of_birth.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|_| AppError::invalid("dateOfBirth", "Valid date of birth is required"))
    }
}

/// Deletion request filed by the owning agent
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDeletionRequest {
    #[validate(length(min = 1, message = "Customer ID is required"))]
    pub customer_id: String,
    #[serde(deserialize_with = "empty_as_none")]
    #[validate(length(max = MAX_REASON_LEN, message = "Reason must not exceed 500 characters"))]
    pub reason: Option<String>,
}

impl RequestDeletionRequest {
    pub fn reason_or_default(&self) -> String {
        self.reason
            .clone()
            .unwrap_or_else(|| DEFAULT_DELETION_REASON.to_string())
    }
}

/// Admin decision on a pending deletion
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ApproveDeletionRequest {
    #[validate(length(min = 1, message = "Customer ID is required"))]
    pub customer_id: String,
    #[validate(required(message = "Approval decision must be a boolean"))]
    pub approved: Option<bool>,
}

/// Query string on the emailed review links
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewLinkQuery {
    pub token: String,
}

/// Outcome of resolving a deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionDecision {
    Approve,
    Deny,
}

impl DeletionDecision {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            DeletionDecision::Approve
        } else {
            DeletionDecision::Deny
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionDecision::Approve => "approve",
            DeletionDecision::Deny => "deny",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeletionDecision::Approve => "Customer deleted successfully",
            DeletionDecision::Deny => "Customer deletion denied",
        }
    }
}
