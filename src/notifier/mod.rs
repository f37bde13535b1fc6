/// Outbound notifications (email and SMS)
///
/// `Notifier` owns one transport per channel and turns domain events into
/// messages. Delivery failures are logged and reported as `Delivery::Failed`;
/// callers decide whether a failure matters (it almost never does).

pub mod templates;
pub mod testing;

use crate::{
    db::{agent::Agent, customer::Customer},
    error::AppResult,
    metrics,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a single send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the provider, with its message id when one is returned
    Sent { id: Option<String> },
    /// Channel not configured
    Skipped,
    Failed(String),
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }

    fn outcome(&self) -> &'static str {
        match self {
            Delivery::Sent { .. } => "sent",
            Delivery::Skipped => "skipped",
            Delivery::Failed(_) => "failed",
        }
    }
}

/// An email message ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// An SMS ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Email delivery backend
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Deliver a message. `Ok(Delivery::Skipped)` when unconfigured.
    async fn send_email(&self, message: &EmailMessage) -> AppResult<Delivery>;

    fn is_configured(&self) -> bool;
}

/// SMS delivery backend
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, message: &SmsMessage) -> AppResult<Delivery>;

    fn is_configured(&self) -> bool;
}

/// Links embedded in the admin's deletion-review email
#[derive(Debug, Clone)]
pub struct ReviewLinks {
    pub approve_url: String,
    pub deny_url: String,
}

/// Notification service shared through the application context
#[derive(Clone)]
pub struct Notifier {
    email: Arc<dyn EmailTransport>,
    sms: Arc<dyn SmsTransport>,
    admin_email: Option<String>,
}

impl Notifier {
    pub fn new(
        email: Arc<dyn EmailTransport>,
        sms: Arc<dyn SmsTransport>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            email,
            sms,
            admin_email,
        }
    }

    pub fn email_configured(&self) -> bool {
        self.email.is_configured()
    }

    pub fn sms_configured(&self) -> bool {
        self.sms.is_configured()
    }

    /// Send an email, logging instead of failing
    pub async fn email(&self, to: &str, subject: &str, html: String) -> Delivery {
        let message = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html,
        };
        let delivery = match self.email.send_email(&message).await {
            Ok(delivery) => delivery,
            Err(e) => Delivery::Failed(e.to_string()),
        };
        match &delivery {
            Delivery::Failed(reason) => {
                tracing::error!(to = %to, subject = %subject, error = %reason, "email send failed")
            }
            Delivery::Skipped => {
                tracing::warn!(to = %to, subject = %subject, "email not configured, skipping")
            }
            Delivery::Sent { .. } => tracing::info!(to = %to, subject = %subject, "email sent"),
        }
        metrics::record_notification("email", delivery.outcome());
        delivery
    }

    /// Send an SMS, logging instead of failing
    pub async fn sms(&self, to: &str, body: String) -> Delivery {
        if !to.starts_with('+') {
            tracing::warn!(to = %to, "phone number should be in E.164 format (+countrycode)");
        }
        let message = SmsMessage {
            to: to.to_string(),
            body,
        };
        let delivery = match self.sms.send_sms(&message).await {
            Ok(delivery) => delivery,
            Err(e) => Delivery::Failed(e.to_string()),
        };
        match &delivery {
            Delivery::Failed(reason) => tracing::error!(to = %to, error = %reason, "SMS send failed"),
            Delivery::Skipped => tracing::warn!(to = %to, "SMS not configured, skipping"),
            Delivery::Sent { id } => tracing::info!(to = %to, sid = ?id, "SMS sent"),
        }
        metrics::record_notification("sms", delivery.outcome());
        delivery
    }

    async fn email_admin(&self, subject: &str, html: String) -> Delivery {
        match &self.admin_email {
            Some(admin) => self.email(admin, subject, html).await,
            None => {
                tracing::warn!(subject = %subject, "no admin address configured, skipping");
                Delivery::Skipped
            }
        }
    }

    /// Tell the admin a new agent is waiting for approval
    pub async fn agent_registered(&self, agent: &Agent) -> Delivery {
        self.email_admin(
            "New Agent Registration - Action Required",
            templates::agent_registered(agent),
        )
        .await
    }

    /// Welcome an approved agent on both channels
    pub async fn agent_approved(&self, agent: &Agent) -> (Delivery, Delivery) {
        let sms = self
            .sms(
                &agent.phone,
                format!(
                    "Dear {}, your account has been approved. Welcome to Owode Agent!",
                    agent.full_name()
                ),
            )
            .await;
        let email = self
            .email(
                &agent.email,
                "Welcome to Owode Agent - Account Approved!",
                templates::agent_approved(agent),
            )
            .await;
        (sms, email)
    }

    /// Welcome SMS always, welcome email when the customer has an address
    pub async fn customer_welcome(&self, customer: &Customer) -> (Delivery, Option<Delivery>) {
        let sms = self
            .sms(
                &customer.phone,
                format!(
                    "Welcome {}! Your savings account with Owode Agent has been created. \
                     Your contribution plan: ₦{} {}. Start building your financial future today!",
                    customer.full_name(),
                    customer.contribution_amount,
                    customer.contribution_frequency
                ),
            )
            .await;

        let email = match &customer.email {
            Some(address) => Some(
                self.email(
                    address,
                    "Welcome to Owode Agent - Your Account is Ready!",
                    templates::customer_welcome(customer),
                )
                .await,
            ),
            None => None,
        };

        (sms, email)
    }

    /// SMS receipt for a recorded payment
    pub async fn payment_receipt_sms(&self, customer: &Customer, amount: i64) -> Delivery {
        self.sms(&customer.phone, templates::payment_sms(customer, amount))
            .await
    }

    /// Email receipt for a recorded payment
    pub async fn payment_receipt_email(
        &self,
        customer: &Customer,
        address: &str,
        amount: i64,
    ) -> Delivery {
        self.email(
            address,
            "Payment Confirmation - Owode Agent",
            templates::payment_email(customer, amount),
        )
        .await
    }

    /// Ask the admin to review a deletion request
    pub async fn deletion_requested(
        &self,
        customer: &Customer,
        agent: &Agent,
        reason: &str,
        links: &ReviewLinks,
    ) -> Delivery {
        self.email_admin(
            &format!("Customer Deletion Request - {}", customer.full_name()),
            templates::deletion_requested(customer, agent, reason, links),
        )
        .await
    }

    /// Tell the requesting agent how the admin decided
    pub async fn deletion_resolved(
        &self,
        customer: &Customer,
        agent: &Agent,
        approved: bool,
    ) -> Delivery {
        let subject = if approved {
            "Customer Deletion Approved"
        } else {
            "Customer Deletion Denied"
        };
        self.email(
            &agent.email,
            subject,
            templates::deletion_resolved(customer, approved),
        )
        .await
    }
}
