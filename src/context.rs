/// Application context and dependency injection
use crate::{
    agent::AgentManager,
    config::ServerConfig,
    customer::CustomerManager,
    db,
    error::AppResult,
    mailer::Mailer,
    notifier::{EmailTransport, Notifier, SmsTransport},
    payment::PaymentManager,
    rate_limit::RateLimiter,
    sms::TwilioSms,
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Instant};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub agent_manager: Arc<AgentManager>,
    pub customer_manager: Arc<CustomerManager>,
    pub payment_manager: Arc<PaymentManager>,
    pub notifier: Arc<Notifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let email: Arc<dyn EmailTransport> = Arc::new(Mailer::new(config.email.clone())?);
        let sms: Arc<dyn SmsTransport> = Arc::new(TwilioSms::new(config.sms.clone())?);

        if !email.is_configured() {
            tracing::warn!("SMTP_URL not set; emails will be skipped");
        }
        if !sms.is_configured() {
            tracing::warn!("Twilio credentials not set; SMS will be skipped");
        }

        Ok(Self::with_transports(config, db, email, sms))
    }

    /// Assemble a context around an existing pool and transports
    ///
    /// The pool must already be migrated.
    pub fn with_transports(
        config: ServerConfig,
        db: SqlitePool,
        email: Arc<dyn EmailTransport>,
        sms: Arc<dyn SmsTransport>,
    ) -> Self {
        let config = Arc::new(config);

        let agent_manager = Arc::new(AgentManager::new(db.clone(), config.clone()));
        let customer_manager = Arc::new(CustomerManager::new(db.clone()));
        let payment_manager = Arc::new(PaymentManager::new(db.clone(), customer_manager.clone()));
        let notifier = Arc::new(Notifier::new(
            email,
            sms,
            config.admin.notification_email.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config,
            db,
            agent_manager,
            customer_manager,
            payment_manager,
            notifier,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
