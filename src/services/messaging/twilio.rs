use anyhow::Context;
use async_trait::async_trait;

use super::MessagingProvider;
use crate::config::AppConfig;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Customer SMS through the Twilio Messages API.
pub struct TwilioSmsProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioSmsProvider {
    /// `None` unless all three credentials are configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.sms_enabled() {
            return None;
        }
        Some(Self {
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_phone_number.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{API_BASE}/Accounts/{}/Messages.json", self.account_sid)
    }
}

#[async_trait]
impl MessagingProvider for TwilioSmsProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .context("failed to reach Twilio")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Twilio rejected SMS to {to}: {status} {detail}");
        }

        tracing::debug!(to, "customer SMS sent");
        Ok(())
    }
}
