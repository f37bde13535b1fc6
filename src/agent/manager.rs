/// Agent manager implementation using runtime queries
use crate::{
    agent::{AgentClaims, RegisterAgentRequest},
    config::ServerConfig,
    db::agent::{Agent, AgentRole, AgentStatus},
    error::{AppError, AppResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const AGENT_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, status, role,
                             approved_at, created_at, updated_at";

/// Hash a password with Argon2id
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::PasswordHash(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored PHC string
pub(crate) fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::PasswordHash(format!("Stored hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Agent manager service
pub struct AgentManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AgentManager {
    /// Create a new agent manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new agent in `pending` status
    pub async fn register(&self, req: RegisterAgentRequest) -> AppResult<Agent> {
        let email = normalize_email(&req.email);

        if self.email_exists(&email).await? {
            return Err(AppError::Conflict("Agent already exists".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        self.insert(
            req.first_name.trim(),
            req.last_name.trim(),
            &email,
            req.phone.trim(),
            &password_hash,
            AgentStatus::Pending,
            AgentRole::Agent,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        phone: &str,
        password_hash: &str,
        status: AgentStatus,
        role: AgentRole,
    ) -> AppResult<Agent> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let approved_at = (status == AgentStatus::Approved).then_some(now);

        let result = sqlx::query(
            "INSERT INTO agent (id, first_name, last_name, email, phone, password_hash, status, role,
                                approved_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        )
        .bind(&id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .bind(status)
        .bind(role)
        .bind(approved_at)
        .bind(now)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {}
            // Lost a race with a concurrent registration for the same address
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict("Agent already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(agent_id = %id, status = status.as_str(), "agent registered");

        Ok(Agent {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password_hash: password_hash.to_string(),
            status,
            role,
            approved_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Mark an agent approved
    ///
    /// Re-approving an approved agent is allowed and refreshes `approved_at`.
    pub async fn approve(&self, agent_id: &str) -> AppResult<Agent> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE agent SET status = ?1, approved_at = ?2, updated_at = ?2 WHERE id = ?3",
        )
        .bind(AgentStatus::Approved)
        .bind(now)
        .bind(agent_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Agent not found".to_string()));
        }

        tracing::info!(agent_id = %agent_id, "agent approved");
        self.get_agent(agent_id).await
    }

    /// Authenticate an agent and issue a bearer token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(Agent, String)> {
        let invalid = || AppError::Authentication("Invalid credentials".to_string());

        let agent = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &agent.password_hash)? {
            return Err(invalid());
        }

        if !agent.is_approved() {
            return Err(AppError::Authentication(
                "Account not approved. Please wait for admin approval.".to_string(),
            ));
        }

        let token = self.issue_token(&agent)?;
        Ok((agent, token))
    }

    /// Generate an access token for an agent
    pub fn issue_token(&self, agent: &Agent) -> AppResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now().timestamp();
        let claims = AgentClaims {
            sub: agent.id.clone(),
            role: agent.role,
            iat: now,
            exp: now + self.config.authentication.token_ttl_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Get agent by id
    pub async fn get_agent(&self, agent_id: &str) -> AppResult<Agent> {
        self.find_by_id(agent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))
    }

    /// Get agent by id, `None` when absent
    pub async fn find_by_id(&self, agent_id: &str) -> AppResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agent WHERE id = ?1",
            AGENT_COLUMNS
        ))
        .bind(agent_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(agent)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agent WHERE email = ?1",
            AGENT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(agent)
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agent WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Agents awaiting approval, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<Agent>> {
        let agents = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agent WHERE status = ?1 ORDER BY created_at",
            AGENT_COLUMNS
        ))
        .bind(AgentStatus::Pending)
        .fetch_all(&self.db)
        .await?;

        tracing::debug!(count = agents.len(), "fetched pending agents");
        Ok(agents)
    }

    /// Every agent, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Agent>> {
        let agents = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {} FROM agent ORDER BY created_at DESC",
            AGENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(agents)
    }

    /// Create the approved super-admin account if it does not exist yet
    ///
    /// Returns the account and whether it was created by this call.
    pub async fn ensure_super_admin(
        &self,
        email: &str,
        password: &str,
        phone: &str,
    ) -> AppResult<(Agent, bool)> {
        let email = normalize_email(email);
        if let Some(existing) = self.find_by_email(&email).await? {
            return Ok((existing, false));
        }

        if password.len() < 6 {
            return Err(AppError::invalid(
                "password",
                "Password must be at least 6 characters long",
            ));
        }

        let password_hash = hash_password(password)?;
        let agent = self
            .insert(
                "Super",
                "Admin",
                &email,
                phone,
                &password_hash,
                AgentStatus::Approved,
                AgentRole::SuperAdmin,
            )
            .await?;

        Ok((agent, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn create_test_manager() -> AgentManager {
        let pool = db::test_pool().await;
        AgentManager::new(pool, Arc::new(ServerConfig::for_tests()))
    }

    fn registration(email: &str) -> RegisterAgentRequest {
        RegisterAgentRequest {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: email.into(),
            phone: "+2348012345678".into(),
            password: "secret1".into(),
        }
    }

    async fn agent_count(manager: &AgentManager) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM agent")
            .fetch_one(&manager.db)
            .await
            .unwrap()
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_creates_pending_agent() {
        let manager = create_test_manager().await;
        let agent = manager.register(registration("ada@example.com")).await.unwrap();

        assert_eq!(agent.status, AgentStatus::Pending);
        assert_eq!(agent.role, AgentRole::Agent);
        assert_ne!(agent.password_hash, "secret1");

        let stored = manager.get_agent(&agent.id).await.unwrap();
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.status, AgentStatus::Pending);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_rejected() {
        let manager = create_test_manager().await;
        manager.register(registration("ada@example.com")).await.unwrap();

        let result = manager.register(registration("ADA@example.com")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(agent_count(&manager).await, 1);
    }

    #[tokio::test]
    async fn test_approve_transitions_status() {
        let manager = create_test_manager().await;
        let agent = manager.register(registration("ada@example.com")).await.unwrap();

        let approved = manager.approve(&agent.id).await.unwrap();
        assert_eq!(approved.status, AgentStatus::Approved);
        assert!(approved.approved_at.is_some());

        // No guard against approving twice
        let again = manager.approve(&agent.id).await.unwrap();
        assert_eq!(again.status, AgentStatus::Approved);
    }

    #[tokio::test]
    async fn test_approve_unknown_agent() {
        let manager = create_test_manager().await;
        let result = manager.approve("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_login_requires_approval() {
        let manager = create_test_manager().await;
        let agent = manager.register(registration("ada@example.com")).await.unwrap();

        match manager.login("ada@example.com", "secret1").await {
            Err(AppError::Authentication(msg)) => assert!(msg.contains("not approved")),
            other => panic!("expected authentication error, got {:?}", other.map(|_| ())),
        }

        manager.approve(&agent.id).await.unwrap();
        let (logged_in, token) = manager.login("ada@example.com", "secret1").await.unwrap();
        assert_eq!(logged_in.id, agent.id);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let manager = create_test_manager().await;
        let agent = manager.register(registration("ada@example.com")).await.unwrap();
        manager.approve(&agent.id).await.unwrap();

        let result = manager.login("ada@example.com", "wrong-password").await;
        assert!(matches!(result, Err(AppError::Authentication(m)) if m == "Invalid credentials"));

        let result = manager.login("nobody@example.com", "secret1").await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_list_pending_and_all() {
        let manager = create_test_manager().await;
        let first = manager.register(registration("a@example.com")).await.unwrap();
        manager.register(registration("b@example.com")).await.unwrap();
        manager.approve(&first.id).await.unwrap();

        let pending = manager.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email, "b@example.com");
        assert_eq!(manager.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_super_admin_is_idempotent() {
        let manager = create_test_manager().await;
        let (admin, created) = manager
            .ensure_super_admin("root@example.com", "Sup3rSecret", "+1234567890")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(admin.role, AgentRole::SuperAdmin);
        assert_eq!(admin.status, AgentStatus::Approved);

        let (again, created) = manager
            .ensure_super_admin("root@example.com", "other-password", "+1234567890")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, admin.id);
    }
}
