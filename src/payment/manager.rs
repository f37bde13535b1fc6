/// Payment manager implementation using runtime queries
use crate::{
    customer::CustomerManager,
    db::{
        agent::Agent,
        customer::Customer,
        payment::{NotifyType, Payment, PaymentWithNames},
        Scope,
    },
    error::{AppError, AppResult},
    metrics,
    payment::{AddPaymentRequest, ClearOutcome, MAX_BALANCE},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const PAYMENT_COLUMNS: &str =
    "id, customer_id, agent_id, amount, method, notify_type, payment_index, created_at";

const LISTING_SELECT: &str = "SELECT p.id, p.customer_id, p.agent_id, p.amount, p.method,
                                     p.notify_type, p.payment_index, p.created_at,
                                     c.first_name || ' ' || c.last_name AS customer_name,
                                     a.last_name AS agent_last_name
                              FROM payment p
                              LEFT JOIN customer c ON c.id = p.customer_id
                              LEFT JOIN agent a ON a.id = p.agent_id";

/// Payment manager service
pub struct PaymentManager {
    db: SqlitePool,
    customers: Arc<CustomerManager>,
}

impl PaymentManager {
    /// Create a new payment manager
    pub fn new(db: SqlitePool, customers: Arc<CustomerManager>) -> Self {
        Self { db, customers }
    }

    /// Record a payment and increment the customer's balance
    ///
    /// Nothing is written when the customer is not visible to `agent` or an
    /// email receipt is requested for a customer without an address.
    pub async fn add(&self, agent: &Agent, req: &AddPaymentRequest) -> AppResult<(Payment, Customer)> {
        let customer = self
            .customers
            .get_scoped(&req.customer_id, agent.scope())
            .await?;

        if req.notify_type == NotifyType::Email && customer.email.is_none() {
            return Err(AppError::BadRequest("Customer has no email".to_string()));
        }

        let over_limit = || AppError::BadRequest("Payment would exceed the balance limit".to_string());
        match customer.balance.checked_add(req.amount) {
            Some(total) if total <= MAX_BALANCE => {}
            _ => return Err(over_limit()),
        }

        let created_at = req.recorded_at()?;
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            agent_id: agent.id.clone(),
            amount: req.amount,
            method: "cash".to_string(),
            notify_type: req.notify_type,
            payment_index: req.payment_index,
            created_at,
        };

        let mut tx = self.db.begin().await?;

        // Guarded so a concurrent payment cannot push the balance past the ceiling
        let updated = sqlx::query(
            "UPDATE customer SET balance = balance + ?1, updated_at = ?2
             WHERE id = ?3 AND balance <= ?4",
        )
        .bind(payment.amount)
        .bind(chrono::Utc::now())
        .bind(&payment.customer_id)
        .bind(MAX_BALANCE - payment.amount)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customer WHERE id = ?1")
                .bind(&payment.customer_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => over_limit(),
                None => AppError::NotFound("Customer not found".to_string()),
            });
        }

        sqlx::query(
            "INSERT INTO payment (id, customer_id, agent_id, amount, method, notify_type,
                                  payment_index, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&payment.id)
        .bind(&payment.customer_id)
        .bind(&payment.agent_id)
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(payment.notify_type)
        .bind(payment.payment_index)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::record_payment(notify_label(payment.notify_type), payment.amount);
        tracing::info!(
            payment_id = %payment.id,
            customer_id = %payment.customer_id,
            amount = payment.amount,
            "payment recorded"
        );

        let customer = self.customers.get(&payment.customer_id).await?;
        Ok((payment, customer))
    }

    /// Every payment with customer and agent names, newest first
    pub async fn list_all(&self) -> AppResult<Vec<PaymentWithNames>> {
        let rows = sqlx::query_as::<_, PaymentWithNames>(&format!(
            "{} ORDER BY p.created_at DESC",
            LISTING_SELECT
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Payments of one customer visible within `scope`, newest first
    pub async fn list_by_customer(
        &self,
        customer_id: &str,
        scope: Scope<'_>,
    ) -> AppResult<Vec<PaymentWithNames>> {
        self.customers.get_scoped(customer_id, scope).await?;

        let rows = sqlx::query_as::<_, PaymentWithNames>(&format!(
            "{} WHERE p.customer_id = ?1 ORDER BY p.created_at DESC",
            LISTING_SELECT
        ))
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Payments collected by one agent, newest first
    pub async fn list_by_agent(&self, agent_id: &str) -> AppResult<Vec<PaymentWithNames>> {
        let rows = sqlx::query_as::<_, PaymentWithNames>(&format!(
            "{} WHERE p.agent_id = ?1 ORDER BY p.created_at DESC",
            LISTING_SELECT
        ))
        .bind(agent_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Raw payment rows of one customer, oldest first
    pub async fn payments_for_customer(&self, customer_id: &str) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payment WHERE customer_id = ?1 ORDER BY created_at",
            PAYMENT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    /// Delete payments and zero balances within `scope` in one transaction
    pub async fn clear_all(&self, scope: Scope<'_>) -> AppResult<ClearOutcome> {
        let mut tx = self.db.begin().await?;
        let now = chrono::Utc::now();

        let (payments_deleted, customers_reset) = match scope {
            Scope::All => {
                let payments = sqlx::query("DELETE FROM payment")
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                let customers = sqlx::query("UPDATE customer SET balance = 0, updated_at = ?1")
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                (payments, customers)
            }
            Scope::Agent(agent_id) => {
                let payments = sqlx::query(
                    "DELETE FROM payment
                     WHERE customer_id IN (SELECT id FROM customer WHERE agent_id = ?1)",
                )
                .bind(agent_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                let customers = sqlx::query(
                    "UPDATE customer SET balance = 0, updated_at = ?1 WHERE agent_id = ?2",
                )
                .bind(now)
                .bind(agent_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                (payments, customers)
            }
        };

        tx.commit().await?;

        tracing::warn!(
            scope = ?scope,
            payments_deleted,
            customers_reset,
            "payment history cleared"
        );
        Ok(ClearOutcome {
            payments_deleted,
            customers_reset,
        })
    }
}

fn notify_label(notify_type: NotifyType) -> &'static str {
    match notify_type {
        NotifyType::None => "none",
        NotifyType::Sms => "sms",
        NotifyType::Email => "email",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{AgentManager, RegisterAgentRequest},
        config::ServerConfig,
        customer::CreateCustomerRequest,
        db::{self, customer::ContributionFrequency},
    };

    struct Fixture {
        payments: PaymentManager,
        customers: Arc<CustomerManager>,
        agent: Agent,
        other: Agent,
        admin: Agent,
    }

    async fn approved_agent(agents: &AgentManager, email: &str, last_name: &str) -> Agent {
        let agent = agents
            .register(RegisterAgentRequest {
                first_name: "Ada".into(),
                last_name: last_name.into(),
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
        let agent = approved_agent(&agents, "ada@example.com", "Obi").await;
        let other = approved_agent(&agents, "tolu@example.com", "Bello").await;
        let (admin, _) = agents
            .ensure_super_admin("root@example.com", "Sup3rSecret", "+1234567890")
            .await
            .unwrap();
        let customers = Arc::new(CustomerManager::new(pool.clone()));

        Fixture {
            payments: PaymentManager::new(pool, customers.clone()),
            customers,
            agent,
            other,
            admin,
        }
    }

    async fn customer_for(f: &Fixture, owner: &Agent, phone: &str, email: Option<&str>) -> Customer {
        f.customers
            .create(
                owner,
                CreateCustomerRequest {
                    first_name: "Bola".into(),
                    last_name: "Ade".into(),
                    date_of_birth: "1990-05-17".into(),
                    phone: phone.into(),
                    email: email.map(String::from),
                    contribution_amount: 5000,
                    contribution_frequency: Some(ContributionFrequency::Weekly),
                },
            )
            .await
            .unwrap()
    }

    fn payment(customer: &Customer, amount: i64, notify_type: NotifyType) -> AddPaymentRequest {
        AddPaymentRequest {
            customer_id: customer.id.clone(),
            amount,
            notify_type,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_payment_increments_balance() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.agent, "+2348000000001", None).await;

        let (recorded, updated) = f
            .payments
            .add(&f.agent, &payment(&customer, 5000, NotifyType::None))
            .await
            .unwrap();

        assert_eq!(recorded.amount, 5000);
        assert_eq!(recorded.method, "cash");
        assert_eq!(updated.balance, 5000);

        let rows = f.payments.payments_for_customer(&customer.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 5000);
    }

    #[tokio::test]
    async fn test_balance_equals_sum_of_payments() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.agent, "+2348000000001", None).await;

        for amount in [1000, 2500, 300] {
            f.payments
                .add(&f.agent, &payment(&customer, amount, NotifyType::Sms))
                .await
                .unwrap();
        }

        let stored = f.customers.get(&customer.id).await.unwrap();
        let total: i64 = f
            .payments
            .payments_for_customer(&customer.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.amount)
            .sum();
        assert_eq!(stored.balance, 3800);
        assert_eq!(stored.balance, total);
    }

    #[tokio::test]
    async fn test_balance_ceiling_rejects_payment_and_writes_nothing() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.agent, "+2348000000001", None).await;

        f.payments
            .add(&f.agent, &payment(&customer, 100, NotifyType::None))
            .await
            .unwrap();

        let result = f
            .payments
            .add(&f.agent, &payment(&customer, i64::MAX, NotifyType::None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        sqlx::query("UPDATE customer SET balance = ?1 WHERE id = ?2")
            .bind(MAX_BALANCE - 50)
            .bind(&customer.id)
            .execute(&f.payments.db)
            .await
            .unwrap();
        let result = f
            .payments
            .add(&f.agent, &payment(&customer, 100, NotifyType::None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let stored = f.customers.get(&customer.id).await.unwrap();
        assert_eq!(stored.balance, MAX_BALANCE - 50);
        assert_eq!(f.payments.payments_for_customer(&customer.id).await.unwrap().len(), 1);
        assert_eq!(f.customers.list(Scope::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_email_receipt_requires_address() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.agent, "+2348000000001", None).await;

        let result = f
            .payments
            .add(&f.agent, &payment(&customer, 5000, NotifyType::Email))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(m)) if m == "Customer has no email"));

        let stored = f.customers.get(&customer.id).await.unwrap();
        assert_eq!(stored.balance, 0);
        assert!(f.payments.payments_for_customer(&customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_agents_customer_is_not_found() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.other, "+2348000000002", None).await;

        let result = f
            .payments
            .add(&f.agent, &payment(&customer, 100, NotifyType::None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // Super-admin may record for anyone
        let (_, updated) = f
            .payments
            .add(&f.admin, &payment(&customer, 100, NotifyType::None))
            .await
            .unwrap();
        assert_eq!(updated.balance, 100);
    }

    #[tokio::test]
    async fn test_listing_carries_names() {
        let f = fixture().await;
        let customer = customer_for(&f, &f.agent, "+2348000000001", None).await;
        f.payments
            .add(&f.agent, &payment(&customer, 700, NotifyType::None))
            .await
            .unwrap();

        let all = f.payments.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].customer_name.as_deref(), Some("Bola Ade"));
        assert_eq!(all[0].agent_name(), "Agent Obi");

        assert_eq!(f.payments.list_by_agent(&f.agent.id).await.unwrap().len(), 1);
        assert!(f.payments.list_by_agent(&f.other.id).await.unwrap().is_empty());

        let hidden = f
            .payments
            .list_by_customer(&customer.id, f.other.scope())
            .await;
        assert!(matches!(hidden, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_all_respects_scope() {
        let f = fixture().await;
        let mine = customer_for(&f, &f.agent, "+2348000000001", None).await;
        let theirs = customer_for(&f, &f.other, "+2348000000002", None).await;
        f.payments
            .add(&f.agent, &payment(&mine, 100, NotifyType::None))
            .await
            .unwrap();
        f.payments
            .add(&f.other, &payment(&theirs, 200, NotifyType::None))
            .await
            .unwrap();

        let outcome = f.payments.clear_all(f.agent.scope()).await.unwrap();
        assert_eq!(outcome.payments_deleted, 1);
        assert_eq!(f.customers.get(&mine.id).await.unwrap().balance, 0);
        assert_eq!(f.customers.get(&theirs.id).await.unwrap().balance, 200);

        let outcome = f.payments.clear_all(f.admin.scope()).await.unwrap();
        assert_eq!(outcome.payments_deleted, 1);
        assert_eq!(outcome.customers_reset, 2);
        assert!(f.payments.list_all().await.unwrap().is_empty());
        assert_eq!(f.customers.get(&theirs.id).await.unwrap().balance, 0);
    }
}
