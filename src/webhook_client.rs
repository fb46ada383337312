use async_trait::async_trait;

use crate::config::NotifyConfig;
use crate::dispatcher::NotificationSink;
use crate::errors::NotifyError;
use crate::notification_models::NotificationPayload;

/// Posts new leads as flat JSON to an automation webhook (n8n and the like).
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookClient {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let Some(ref url) = self.url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&payload.to_webhook_body())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifyError::Status { status, body });
        }

        tracing::debug!("✓ Lead {} posted to webhook", payload.id);
        Ok(())
    }
}
