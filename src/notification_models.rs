use serde::Serialize;

use crate::i18n::Locale;
use crate::models::Lead;

/// Denormalized view of a freshly accepted lead, handed to every sink.
///
/// Built once per lead and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub id: i64,
    pub name: String,
    pub phone_e164: String,
    /// Resolved service title rather than its id.
    pub service: Option<String>,
    pub comment: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub lang: Locale,
}

impl NotificationPayload {
    pub fn from_lead(lead: &Lead, service_title: Option<String>) -> Self {
        Self {
            id: lead.id,
            name: lead.name.clone(),
            phone_e164: lead.phone_e164.clone(),
            service: service_title,
            comment: Some(lead.message.clone()).filter(|m| !m.is_empty()),
            utm_source: lead.utm_source.clone(),
            utm_medium: lead.utm_medium.clone(),
            utm_campaign: lead.utm_campaign.clone(),
            lang: lead.lang,
        }
    }

    /// `utm_source=X, utm_medium=Y, utm_campaign=Z`, listing only the keys
    /// that are present, always in that order. `None` if none are.
    pub fn utm_summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("utm_source", &self.utm_source),
            ("utm_medium", &self.utm_medium),
            ("utm_campaign", &self.utm_campaign),
        ]
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, v))
        })
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    pub fn to_webhook_body(&self) -> WebhookBody<'_> {
        WebhookBody {
            id: self.id,
            name: &self.name,
            phone_e164: &self.phone_e164,
            service: self.service.as_deref().unwrap_or(""),
            comment: self.comment.as_deref().unwrap_or(""),
            utm_source: self.utm_source.as_deref().unwrap_or(""),
            utm_medium: self.utm_medium.as_deref().unwrap_or(""),
            utm_campaign: self.utm_campaign.as_deref().unwrap_or(""),
            lang: self.lang.as_str(),
        }
    }
}

/// Flat JSON object POSTed to the automation webhook. Absent values are
/// sent as empty strings so the key set never changes.
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    pub id: i64,
    pub name: &'a str,
    pub phone_e164: &'a str,
    pub service: &'a str,
    pub comment: &'a str,
    pub utm_source: &'a str,
    pub utm_medium: &'a str,
    pub utm_campaign: &'a str,
    pub lang: &'a str,
}

/// Telegram `sendMessage` request body.
#[derive(Debug, Serialize)]
pub struct TelegramMessage<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
}
