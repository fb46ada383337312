use serde::Deserialize;
use std::time::Duration;

use crate::phone::{normalize_phone, pretty_phone};

/// Where leads, reviews and the service catalog live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
    pub webhook_url: Option<String>,
    pub notify_timeout_secs: u64,
    pub notify_workers: usize,
    pub notify_queue_capacity: usize,
    /// Public business phone in E.164, shown by the contacts endpoint.
    pub contact_phone: Option<String>,
}

/// Settings the notification sinks are built from.
///
/// Passed explicitly into the dispatcher's sinks; an absent credential
/// means the matching sink stays silent.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub telegram_api_base: String,
    pub webhook_url: Option<String>,
    pub timeout: Duration,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match optional_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        None => Ok(default),
    }
}

fn check_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(())
}

/// `scheme://host[:port]` of a connection URL, without credentials or path.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            match parsed.port() {
                Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
                None => format!("{}://{}", parsed.scheme(), host),
            }
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match optional_var("STORAGE").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => anyhow::bail!("STORAGE must be 'postgres' or 'memory', got {}", other),
        };

        let database_url = optional_var("DB_URL").or_else(|| optional_var("DATABASE_URL"));
        if storage == StorageBackend::Postgres {
            match database_url.as_deref() {
                None => anyhow::bail!("DB_URL or DATABASE_URL environment variable required"),
                Some(url) if !url.starts_with("postgresql://") && !url.starts_with("postgres://") => {
                    anyhow::bail!("DB_URL must start with postgresql:// or postgres://")
                }
                Some(_) => {}
            }
        }

        let port = parse_var("PORT", 3000u16)
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let telegram_api_base = optional_var("TELEGRAM_API_BASE")
            .unwrap_or_else(|| "https://api.telegram.org".to_string());
        check_http_url("TELEGRAM_API_BASE", &telegram_api_base)?;

        let webhook_url = optional_var("WEBHOOK_URL").or_else(|| optional_var("N8N_WEBHOOK_URL"));
        if let Some(ref url) = webhook_url {
            check_http_url("WEBHOOK_URL", url)?;
        }

        let notify_timeout_secs = parse_var("NOTIFY_TIMEOUT_SECS", 5u64)?;
        if !(1..=9).contains(&notify_timeout_secs) {
            anyhow::bail!("NOTIFY_TIMEOUT_SECS must be between 1 and 9");
        }

        let notify_workers = parse_var("NOTIFY_WORKERS", 4usize)?;
        if notify_workers == 0 {
            anyhow::bail!("NOTIFY_WORKERS must be at least 1");
        }

        let notify_queue_capacity = parse_var("NOTIFY_QUEUE_CAPACITY", 256usize)?;
        if notify_queue_capacity == 0 {
            anyhow::bail!("NOTIFY_QUEUE_CAPACITY must be at least 1");
        }

        let contact_phone = match optional_var("CONTACT_PHONE") {
            Some(raw) => Some(
                normalize_phone(&raw)
                    .map_err(|e| anyhow::anyhow!("CONTACT_PHONE is not a valid phone: {}", e))?,
            ),
            None => None,
        };

        let config = Self {
            storage,
            database_url,
            port,
            telegram_bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_var("TELEGRAM_CHAT_ID"),
            telegram_api_base,
            webhook_url,
            notify_timeout_secs,
            notify_workers,
            notify_queue_capacity,
            contact_phone,
        };

        // Log without sensitive values
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Storage backend: {:?}", config.storage);
        if let Some(ref url) = config.database_url {
            tracing::debug!("Database: {}", redact_url(url));
        }
        if config.telegram_bot_token.is_none() || config.telegram_chat_id.is_none() {
            tracing::warn!("Telegram notifications disabled (TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID unset)");
        }
        match config.webhook_url {
            Some(ref url) => tracing::info!("Lead webhook configured: {}", url),
            None => tracing::info!("Lead webhook disabled (WEBHOOK_URL unset)"),
        }
        match config.contact_phone {
            Some(ref phone) => tracing::info!("Contact phone: {}", pretty_phone(phone)),
            None => tracing::info!("Contact phone not set (CONTACT_PHONE unset)"),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn notify(&self) -> NotifyConfig {
        NotifyConfig {
            bot_token: self.telegram_bot_token.clone(),
            chat_id: self.telegram_chat_id.clone(),
            telegram_api_base: self.telegram_api_base.clone(),
            webhook_url: self.webhook_url.clone(),
            timeout: Duration::from_secs(self.notify_timeout_secs),
        }
    }
}
