/// Agent database models
use super::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Approval status of an agent account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Approved,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Approved => "approved",
        }
    }
}

/// Role carried in the agent's bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum AgentRole {
    Agent,
    SuperAdmin,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Agent => "agent",
            AgentRole::SuperAdmin => "super-admin",
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, AgentRole::SuperAdmin)
    }
}

/// Agent record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: AgentStatus,
    pub role: AgentRole,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_approved(&self) -> bool {
        self.status == AgentStatus::Approved
    }

    /// Rows this agent may read and modify
    pub fn scope(&self) -> Scope<'_> {
        if self.role.is_super_admin() {
            Scope::All
        } else {
            Scope::Agent(&self.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&AgentRole::SuperAdmin).unwrap(),
            "\"super-admin\""
        );
        assert_eq!(AgentRole::SuperAdmin.as_str(), "super-admin");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let agent = Agent {
            id: "a1".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "ada@example.com".into(),
            phone: "+2348000000000".into(),
            password_hash: "$argon2id$secret".into(),
            status: AgentStatus::Pending,
            role: AgentRole::Agent,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&agent).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["firstName"], "Ada");
    }
}
