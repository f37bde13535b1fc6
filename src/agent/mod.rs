/// Agent management
///
/// Registration, admin approval, login and agent lookups.

mod manager;

pub use manager::AgentManager;

use crate::db::agent::{Agent, AgentRole};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    /// E.164 with optional `+`, or a bare 10-15 digit local number
    pub static ref PHONE_RE: Regex = Regex::new(r"^(\+?[1-9]\d{1,14}|\d{10,15})$").unwrap();
}

/// Agent registration request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterAgentRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "Phone number is required"),
        regex(
            path = *PHONE_RE,
            message = "Phone number must be valid (e.g., +1234567890 or 1234567890)"
        )
    )]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgentResponse {
    pub message: String,
    pub agent_id: String,
}

/// Login request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Agent profile returned on login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: AgentRole,
}

impl From<&Agent> for AgentProfile {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            first_name: agent.first_name.clone(),
            last_name: agent.last_name.clone(),
            email: agent.email.clone(),
            role: agent.role,
        }
    }
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub agent: AgentProfile,
}

/// Admin approval request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ApproveAgentRequest {
    #[validate(length(min = 1, message = "Agent ID is required"))]
    pub agent_id: String,
}

/// Ad-hoc SMS request used to check the gateway
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TestSmsRequest {
    #[validate(length(min = 1, message = "Phone number and message are required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Phone number and message are required"))]
    pub message: String,
}

/// Claims carried in an agent bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClaims {
    /// Agent id
    pub sub: String,
    pub role: AgentRole,
    pub iat: i64,
    pub exp: i64,
}
