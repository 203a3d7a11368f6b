//! Outbound SMS abstraction.
//!
//! Escalation notifications, renewal reminders, and review requests all go
//! through [`SmsSender`]. When Twilio credentials are absent the platform
//! runs with a no-op sender that logs instead of sending.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use twilio::TwilioService;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Wrapper around TwilioService that implements the SmsSender trait
pub struct TwilioSmsSender(pub Arc<TwilioService>);

impl TwilioSmsSender {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.0
            .send_sms(to, body)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

/// No-op sender for deployments without SMS credentials.
pub struct DisabledSmsSender;

#[async_trait]
impl SmsSender for DisabledSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        info!(to = %to, body_len = body.len(), "SMS disabled, dropping message");
        Ok(())
    }
}
