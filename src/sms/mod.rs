/// SMS transport backed by the Twilio REST API
use crate::{
    config::SmsConfig,
    error::{AppError, AppResult},
    notifier::{Delivery, SmsMessage, SmsTransport},
};
use async_trait::async_trait;
use serde::Deserialize;

/// Subset of Twilio's message resource we care about
#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
}

/// Twilio SMS client
#[derive(Clone)]
pub struct TwilioSms {
    config: Option<SmsConfig>,
    http_client: reqwest::Client,
}

impl TwilioSms {
    /// Create a new client; `None` yields a client that skips every send
    pub fn new(config: Option<SmsConfig>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("owode-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn messages_url(config: &SmsConfig) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base.trim_end_matches('/'),
            config.account_sid
        )
    }
}

#[async_trait]
impl SmsTransport for TwilioSms {
    async fn send_sms(&self, message: &SmsMessage) -> AppResult<Delivery> {
        let Some(config) = &self.config else {
            return Ok(Delivery::Skipped);
        };

        let response = self
            .http_client
            .post(Self::messages_url(config))
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[
                ("To", message.to.as_str()),
                ("From", config.from_number.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("SMS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response
                .json::<TwilioError>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::Notification(format!("SMS rejected: {}", reason)));
        }

        let created: TwilioMessage = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("Invalid SMS response: {}", e)))?;

        Ok(Delivery::Sent {
            id: Some(created.sid),
        })
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let config = SmsConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550001111".into(),
            api_base: "https://api.twilio.com/".into(),
        };
        assert_eq!(
            TwilioSms::messages_url(&config),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_skips() {
        let sms = TwilioSms::new(None).unwrap();
        let delivery = sms
            .send_sms(&SmsMessage {
                to: "+2348000000000".into(),
                body: "hello".into(),
            })
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Skipped);
    }
}
