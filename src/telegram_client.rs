use async_trait::async_trait;

use crate::config::NotifyConfig;
use crate::dispatcher::NotificationSink;
use crate::errors::NotifyError;
use crate::notification_models::{NotificationPayload, TelegramMessage};

/// Client for the Telegram Bot API `sendMessage` call.
///
/// Without both a bot token and a chat id the client is inert: sends
/// succeed without touching the network.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the operator-facing summary of a new lead.
pub fn format_lead_message(payload: &NotificationPayload) -> String {
    let mut lines = vec!["<b>Новая заявка с сайта</b>".to_string()];

    lines.push(format!("👤 Имя: {}", escape_html(&payload.name)));
    lines.push(format!("📞 Телефон: {}", escape_html(&payload.phone_e164)));
    if let Some(ref service) = payload.service {
        lines.push(format!("🛠 Услуга: {}", escape_html(service)));
    }
    if let Some(ref comment) = payload.comment {
        lines.push(format!("📝 Комментарий: {}", escape_html(comment)));
    }
    if let Some(utm) = payload.utm_summary() {
        lines.push(format!("🔗 UTM: {}", escape_html(&utm)));
    }

    lines.join("\n")
}

impl TelegramClient {
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_base: config.telegram_api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Sends `text` to the configured chat with HTML formatting and link
    /// previews off. One attempt, no retry.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = TelegramMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifyError::Status { status, body });
        }

        tracing::debug!("✓ Telegram message delivered to chat {}", chat_id);
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.send_message(&format_lead_message(payload)).await
    }
}
