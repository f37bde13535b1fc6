/// Customer manager implementation using runtime queries
use crate::{
    customer::{CreateCustomerRequest, DeletionDecision},
    db::{
        agent::Agent,
        customer::{Customer, CustomerRow},
        Scope,
    },
    error::{AppError, AppResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, date_of_birth, phone, email, balance,
                                contribution_amount, contribution_frequency, agent_id,
                                deletion_requested_at, deletion_reason, created_at, updated_at";

fn not_found() -> AppError {
    AppError::NotFound("Customer not found".to_string())
}

/// Customer manager service
pub struct CustomerManager {
    db: SqlitePool,
}

impl CustomerManager {
    /// Create a new customer manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a customer owned by `owner` with a zero balance
    pub async fn create(&self, owner: &Agent, req: CreateCustomerRequest) -> AppResult<Customer> {
        let date_of_birth = req.parsed_date_of_birth()?;
        let frequency = req.contribution_frequency.ok_or_else(|| {
            AppError::invalid("contributionFrequency", "Contribution frequency is required")
        })?;
        let phone = req.phone.trim().to_string();

        if self.phone_exists(&phone).await? {
            return Err(AppError::Conflict("Phone number already exists".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO customer (id, first_name, last_name, date_of_birth, phone, email, balance,
                                   contribution_amount, contribution_frequency, agent_id,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?10)",
        )
        .bind(&id)
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(date_of_birth)
        .bind(&phone)
        .bind(&req.email)
        .bind(req.contribution_amount)
        .bind(frequency)
        .bind(&owner.id)
        .bind(now)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict("Phone number already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(customer_id = %id, agent_id = %owner.id, "customer created");
        self.get(&id).await
    }

    async fn phone_exists(&self, phone: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer WHERE phone = ?1")
            .bind(phone)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Get a customer by id regardless of owner
    pub async fn get(&self, customer_id: &str) -> AppResult<Customer> {
        self.find(customer_id).await?.ok_or_else(not_found)
    }

    async fn find(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customer WHERE id = ?1",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Get a customer visible within `scope`
    ///
    /// Customers owned by someone else are reported as missing.
    pub async fn get_scoped(&self, customer_id: &str, scope: Scope<'_>) -> AppResult<Customer> {
        match self.find(customer_id).await? {
            Some(customer) if scope.covers(&customer.agent_id) => Ok(customer),
            _ => Err(not_found()),
        }
    }

    /// Customers visible within `scope`, newest first
    pub async fn list(&self, scope: Scope<'_>) -> AppResult<Vec<Customer>> {
        let rows = match scope {
            Scope::All => {
                sqlx::query_as::<_, CustomerRow>(&format!(
                    "SELECT {} FROM customer ORDER BY created_at DESC",
                    CUSTOMER_COLUMNS
                ))
                .fetch_all(&self.db)
                .await?
            }
            Scope::Agent(agent_id) => {
                sqlx::query_as::<_, CustomerRow>(&format!(
                    "SELECT {} FROM customer WHERE agent_id = ?1 ORDER BY created_at DESC",
                    CUSTOMER_COLUMNS
                ))
                .bind(agent_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Customers owned by one agent
    pub async fn list_by_agent(&self, agent_id: &str) -> AppResult<Vec<Customer>> {
        self.list(Scope::Agent(agent_id)).await
    }

    /// Customers with an open deletion request, oldest request first
    pub async fn pending_deletions(&self) -> AppResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customer
             WHERE deletion_requested_at IS NOT NULL
             ORDER BY deletion_requested_at",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Delete a customer and its payments in one transaction
    ///
    /// Returns the removed customer and the number of payments removed.
    pub async fn delete(&self, customer_id: &str) -> AppResult<(Customer, u64)> {
        let customer = self.get(customer_id).await?;

        let mut tx = self.db.begin().await?;

        let payments = sqlx::query("DELETE FROM payment WHERE customer_id = ?1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM customer WHERE id = ?1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Removed by a concurrent request after the lookup
            return Err(not_found());
        }

        tx.commit().await?;

        tracing::info!(
            customer_id = %customer_id,
            payments_deleted = payments,
            "customer deleted"
        );
        Ok((customer, payments))
    }

    /// File a deletion request on behalf of the owning agent
    pub async fn request_deletion(
        &self,
        customer_id: &str,
        requester: &Agent,
        reason: &str,
    ) -> AppResult<Customer> {
        let customer = self.get(customer_id).await?;

        if customer.agent_id != requester.id {
            return Err(AppError::Authorization("Unauthorized".to_string()));
        }

        if customer.deletion.is_requested() {
            return Err(AppError::BadRequest(
                "Deletion already requested for this customer".to_string(),
            ));
        }

        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE customer
             SET deletion_requested_at = ?1, deletion_reason = ?2, updated_at = ?1
             WHERE id = ?3 AND deletion_requested_at IS NULL",
        )
        .bind(now)
        .bind(reason)
        .bind(customer_id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::BadRequest(
                "Deletion already requested for this customer".to_string(),
            ));
        }

        tracing::info!(customer_id = %customer_id, agent_id = %requester.id, "deletion requested");
        self.get(customer_id).await
    }

    /// Approve (delete) or deny (reset) a pending deletion request
    ///
    /// Returns the customer as it was before approval, or as reset by denial.
    pub async fn resolve_deletion(
        &self,
        customer_id: &str,
        decision: DeletionDecision,
    ) -> AppResult<Customer> {
        let customer = self.get(customer_id).await?;

        if !customer.deletion.is_requested() {
            return Err(AppError::BadRequest(
                "No deletion request found for this customer".to_string(),
            ));
        }

        match decision {
            DeletionDecision::Approve => {
                let (customer, _) = self.delete(customer_id).await?;
                Ok(customer)
            }
            DeletionDecision::Deny => {
                sqlx::query(
                    "UPDATE customer
                     SET deletion_requested_at = NULL, deletion_reason = NULL, updated_at = ?1
                     WHERE id = ?2",
                )
                .bind(Utc::now())
                .bind(customer_id)
                .execute(&self.db)
                .await?;

                tracing::info!(customer_id = %customer_id, "deletion denied");
                self.get(customer_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{AgentManager, RegisterAgentRequest},
        config::ServerConfig,
        db::{self, customer::ContributionFrequency, customer::DeletionState},
    };
    use std::sync::Arc;

    struct Fixture {
        pool: SqlitePool,
        customers: CustomerManager,
        agent: Agent,
        other: Agent,
        admin: Agent,
    }

    async fn approved_agent(agents: &AgentManager, email: &str) -> Agent {
        let agent = agents
            .register(RegisterAgentRequest {
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                email: email.into(),
                phone: "+2348012345678".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        agents.approve(&agent.id).await.unwrap()
    }

    async fn fixture() -> Fixture {
        let pool = db::test_pool().await;
        let agents = AgentManager::new(pool.clone(), Arc::new(ServerConfig::for_tests()));
        let agent = approved_agent(&agents, "ada@example.com").await;
        let other = approved_agent(&agents, "tolu@example.com").await;
        let (admin, _) = agents
            .ensure_super_admin("root@example.com", "Sup3rSecret", "+1234567890")
            .await
            .unwrap();

        Fixture {
            customers: CustomerManager::new(pool.clone()),
            pool,
            agent,
            other,
            admin,
        }
    }

    fn new_customer(phone: &str) -> CreateCustomerRequest {
        CreateCustomerRequest {
            first_name: "Bola".into(),
            last_name: "Ade".into(),
            date_of_birth: "1990-05-17".into(),
            phone: phone.into(),
            email: Some("bola@example.com".into()),
            contribution_amount: 5000,
            contribution_frequency: Some(ContributionFrequency::Daily),
        }
    }

    async fn insert_payment(pool: &SqlitePool, customer: &Customer, amount: i64) {
        sqlx::query(
            "INSERT INTO payment (id, customer_id, agent_id, amount, notify_type, created_at)
             VALUES (?1, ?2, ?3, ?4, 'none', ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&customer.id)
        .bind(&customer.agent_id)
        .bind(amount)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn payment_count(pool: &SqlitePool, customer_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE customer_id = ?1")
            .bind(customer_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_customer_starts_at_zero() {
        let f = fixture().await;
        let customer = f
            .customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();

        assert_eq!(customer.balance, 0);
        assert_eq!(customer.agent_id, f.agent.id);
        assert_eq!(customer.deletion, DeletionState::Active);
        assert_eq!(customer.contribution_frequency, ContributionFrequency::Daily);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let f = fixture().await;
        f.customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();

        let result = f
            .customers
            .create(&f.other, new_customer("+2348099999999"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(m)) if m == "Phone number already exists"));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let f = fixture().await;
        f.customers
            .create(&f.agent, new_customer("+2348000000001"))
            .await
            .unwrap();
        let theirs = f
            .customers
            .create(&f.other, new_customer("+2348000000002"))
            .await
            .unwrap();

        assert_eq!(f.customers.list(f.agent.scope()).await.unwrap().len(), 1);
        assert_eq!(f.customers.list(f.admin.scope()).await.unwrap().len(), 2);

        let hidden = f.customers.get_scoped(&theirs.id, f.agent.scope()).await;
        assert!(matches!(hidden, Err(AppError::NotFound(_))));
        assert!(f.customers.get_scoped(&theirs.id, f.admin.scope()).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_payments() {
        let f = fixture().await;
        let customer = f
            .customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();
        insert_payment(&f.pool, &customer, 100).await;
        insert_payment(&f.pool, &customer, 200).await;

        let (_, removed) = f.customers.delete(&customer.id).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(payment_count(&f.pool, &customer.id).await, 0);
        assert!(matches!(
            f.customers.get(&customer.id).await,
            Err(AppError::NotFound(_))
        ));

        let again = f.customers.delete(&customer.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_request_deletion_flow() {
        let f = fixture().await;
        let customer = f
            .customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();

        let denied = f
            .customers
            .request_deletion(&customer.id, &f.other, "not mine")
            .await;
        assert!(matches!(denied, Err(AppError::Authorization(_))));

        let requested = f
            .customers
            .request_deletion(&customer.id, &f.agent, "moved away")
            .await
            .unwrap();
        match requested.deletion {
            DeletionState::Requested { ref reason, .. } => assert_eq!(reason, "moved away"),
            DeletionState::Active => panic!("expected a pending request"),
        }
        // Still present until an admin approves
        assert!(f.customers.get(&customer.id).await.is_ok());

        let twice = f
            .customers
            .request_deletion(&customer.id, &f.agent, "again")
            .await;
        assert!(matches!(twice, Err(AppError::BadRequest(_))));

        let pending = f.customers.pending_deletions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, customer.id);
    }

    #[tokio::test]
    async fn test_deny_resets_to_active() {
        let f = fixture().await;
        let customer = f
            .customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();
        f.customers
            .request_deletion(&customer.id, &f.agent, "moved away")
            .await
            .unwrap();

        let reset = f
            .customers
            .resolve_deletion(&customer.id, DeletionDecision::Deny)
            .await
            .unwrap();
        assert_eq!(reset.deletion, DeletionState::Active);
        assert!(f.customers.pending_deletions().await.unwrap().is_empty());

        let nothing = f
            .customers
            .resolve_deletion(&customer.id, DeletionDecision::Approve)
            .await;
        assert!(matches!(nothing, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_approve_deletes_with_payments() {
        let f = fixture().await;
        let customer = f
            .customers
            .create(&f.agent, new_customer("+2348099999999"))
            .await
            .unwrap();
        insert_payment(&f.pool, &customer, 500).await;
        f.customers
            .request_deletion(&customer.id, &f.agent, "closed account")
            .await
            .unwrap();

        f.customers
            .resolve_deletion(&customer.id, DeletionDecision::Approve)
            .await
            .unwrap();
        assert!(matches!(
            f.customers.get(&customer.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(payment_count(&f.pool, &customer.id).await, 0);
    }
}
