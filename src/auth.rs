/// Authentication extractors and utilities
use crate::{
    agent::AgentClaims,
    api::middleware::extract_bearer_token,
    config::AuthConfig,
    context::AppContext,
    customer::DeletionDecision,
    db::agent::{Agent, AgentRole},
    error::{AppError, AppResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Audience of deletion-review link tokens; keeps them from passing as bearer tokens
const LINK_AUDIENCE: &str = "deletion-review";

/// Bearer-token identity, without a database check
#[derive(Debug, Clone)]
pub struct AuthAgent {
    pub agent_id: String,
    pub role: AgentRole,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthAgent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Authentication("No token, authorization denied".to_string())
        })?;

        let claims: AgentClaims =
            verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;

        Ok(AuthAgent {
            agent_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Authenticated agent whose account is currently approved
///
/// Loads the agent row, so approval revoked after login is seen immediately.
#[derive(Debug, Clone)]
pub struct ApprovedAgent(pub Agent);

#[async_trait]
impl FromRequestParts<AppContext> for ApprovedAgent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthAgent::from_request_parts(parts, state).await?;

        match state.agent_manager.find_by_id(&auth.agent_id).await? {
            Some(agent) if agent.is_approved() => Ok(ApprovedAgent(agent)),
            _ => {
                tracing::warn!(agent_id = %auth.agent_id, "request from unapproved agent");
                Err(AppError::Authorization("Agent not approved".to_string()))
            }
        }
    }
}

/// Approved agent holding the super-admin role
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub Agent);

#[async_trait]
impl FromRequestParts<AppContext> for SuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let ApprovedAgent(agent) = ApprovedAgent::from_request_parts(parts, state).await?;

        // Role comes from the database, not the token
        if !agent.role.is_super_admin() {
            tracing::warn!(agent_id = %agent.id, "super admin route refused");
            return Err(AppError::Authorization(
                "Super admin access required".to_string(),
            ));
        }

        Ok(SuperAdmin(agent))
    }
}

/// Verify an HS256 token and decode its claims
pub fn verify_jwt_token<T: DeserializeOwned>(token: &str, jwt_secret: &str) -> AppResult<T> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60;

    decode::<T>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token has expired".to_string())
                }
                _ => AppError::Authentication("Token is not valid".to_string()),
            }
        })
}

/// Claims of a signed approve/deny link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkClaims {
    /// Customer id
    pub sub: String,
    pub action: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a link that resolves one customer's deletion request one way
pub fn issue_link_token(
    config: &AuthConfig,
    customer_id: &str,
    decision: DeletionDecision,
) -> AppResult<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now().timestamp();
    let claims = LinkClaims {
        sub: customer_id.to_string(),
        action: decision.as_str().to_string(),
        aud: LINK_AUDIENCE.to_string(),
        iat: now,
        exp: now + config.link_token_ttl_hours * 3600,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Jwt(format!("Failed to sign link: {}", e)))
}

/// Check a link token against the customer and action it is used for
pub fn verify_link_token(
    config: &AuthConfig,
    token: &str,
    customer_id: &str,
    decision: DeletionDecision,
) -> AppResult<()> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[LINK_AUDIENCE]);

    let claims = decode::<LinkClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(customer_id = %customer_id, "review link rejected: {}", e);
        AppError::Authorization("Invalid or expired link".to_string())
    })?
    .claims;

    if claims.sub != customer_id || claims.action != decision.as_str() {
        tracing::warn!(customer_id = %customer_id, "review link used for another action");
        return Err(AppError::Authorization("Invalid or expired link".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn auth_config() -> AuthConfig {
        ServerConfig::for_tests().authentication
    }

    #[test]
    fn test_link_token_scoped_to_customer_and_action() {
        let config = auth_config();
        let token = issue_link_token(&config, "c1", DeletionDecision::Approve).unwrap();

        assert!(verify_link_token(&config, &token, "c1", DeletionDecision::Approve).is_ok());
        assert!(verify_link_token(&config, &token, "c2", DeletionDecision::Approve).is_err());
        assert!(verify_link_token(&config, &token, "c1", DeletionDecision::Deny).is_err());
    }

    #[test]
    fn test_link_token_wrong_secret() {
        let config = auth_config();
        let token = issue_link_token(&config, "c1", DeletionDecision::Deny).unwrap();

        let mut other = auth_config();
        other.jwt_secret = "another-secret-key-that-is-long-enough-000".to_string();
        let result = verify_link_token(&other, &token, "c1", DeletionDecision::Deny);
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_link_token_is_not_a_bearer_token() {
        let config = auth_config();
        let token = issue_link_token(&config, "c1", DeletionDecision::Approve).unwrap();
        let result: AppResult<AgentClaims> = verify_jwt_token(&token, &config.jwt_secret);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let config = auth_config();
        let now = Utc::now().timestamp();
        let claims = AgentClaims {
            sub: "a1".into(),
            role: AgentRole::Agent,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let result: AppResult<AgentClaims> = verify_jwt_token(&token, &config.jwt_secret);
        assert!(matches!(result, Err(AppError::Authentication(m)) if m == "Token has expired"));
    }
}
