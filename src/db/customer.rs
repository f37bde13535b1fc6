/// Customer database models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cadence of expected contributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContributionFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ContributionFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionFrequency::Daily => "daily",
            ContributionFrequency::Weekly => "weekly",
            ContributionFrequency::Monthly => "monthly",
            ContributionFrequency::Yearly => "yearly",
        }
    }

    /// Label of one period ("Day", "Week", ...)
    pub fn period_label(&self) -> &'static str {
        match self {
            ContributionFrequency::Daily => "Day",
            ContributionFrequency::Weekly => "Week",
            ContributionFrequency::Monthly => "Month",
            ContributionFrequency::Yearly => "Year",
        }
    }
}

impl std::fmt::Display for ContributionFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a customer stands in the deletion workflow
///
/// `Active -> Requested` on an agent request, `Requested -> Active` when the
/// admin denies it; approval removes the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DeletionState {
    Active,
    #[serde(rename_all = "camelCase")]
    Requested {
        reason: String,
        requested_at: DateTime<Utc>,
    },
}

impl DeletionState {
    pub fn is_requested(&self) -> bool {
        matches!(self, DeletionState::Requested { .. })
    }
}

/// Customer row as stored
#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: Option<String>,
    pub balance: i64,
    pub contribution_amount: i64,
    pub contribution_frequency: ContributionFrequency,
    pub agent_id: String,
    pub deletion_requested_at: Option<DateTime<Utc>>,
    pub deletion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: Option<String>,
    pub balance: i64,
    pub contribution_amount: i64,
    pub contribution_frequency: ContributionFrequency,
    pub agent_id: String,
    pub deletion: DeletionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        // The table CHECK keeps both columns set or both NULL
        let deletion = match (row.deletion_requested_at, row.deletion_reason) {
            (Some(requested_at), Some(reason)) => DeletionState::Requested {
                reason,
                requested_at,
            },
            _ => DeletionState::Active,
        };

        Customer {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            phone: row.phone,
            email: row.email,
            balance: row.balance,
            contribution_amount: row.contribution_amount,
            contribution_frequency: row.contribution_frequency,
            agent_id: row.agent_id,
            deletion,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_state_wire_format() {
        let active = serde_json::to_value(DeletionState::Active).unwrap();
        assert_eq!(active, serde_json::json!({ "state": "active" }));

        let requested = DeletionState::Requested {
            reason: "moved away".into(),
            requested_at: Utc::now(),
        };
        let json = serde_json::to_value(&requested).unwrap();
        assert_eq!(json["state"], "requested");
        assert_eq!(json["reason"], "moved away");
        assert!(json.get("requestedAt").is_some());
    }
}
