/// In-memory transports that record what would have been sent
use super::{Delivery, EmailMessage, EmailTransport, SmsMessage, SmsTransport};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

/// Records every email and SMS; can be switched to fail
#[derive(Default)]
pub struct RecordingTransport {
    emails: Mutex<Vec<EmailMessage>>,
    sms: Mutex<Vec<SmsMessage>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn sms_messages(&self) -> Vec<SmsMessage> {
        self.sms.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn emails_to(&self, to: &str) -> Vec<EmailMessage> {
        self.emails().into_iter().filter(|m| m.to == to).collect()
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Notification("transport unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send_email(&self, message: &EmailMessage) -> AppResult<Delivery> {
        self.check()?;
        if let Ok(mut emails) = self.emails.lock() {
            emails.push(message.clone());
        }
        Ok(Delivery::Sent { id: None })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[async_trait]
impl SmsTransport for RecordingTransport {
    async fn send_sms(&self, message: &SmsMessage) -> AppResult<Delivery> {
        self.check()?;
        if let Ok(mut sms) = self.sms.lock() {
            sms.push(message.clone());
        }
        Ok(Delivery::Sent { id: None })
    }

    fn is_configured(&self) -> bool {
        true
    }
}
