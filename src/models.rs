use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::i18n::Locale;
use crate::phone::{pretty_phone, wa_link};

// ============ Leads ============

/// Back-office workflow state of a lead.
///
/// Leads created by the intake flow always start as `New`; later
/// transitions happen outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    InWork,
    Done,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::InWork => "inwork",
            LeadStatus::Done => "done",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "new" => Some(LeadStatus::New),
            "inwork" => Some(LeadStatus::InWork),
            "done" => Some(LeadStatus::Done),
            _ => None,
        }
    }
}

/// A validated lead, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLead {
    pub name: String,
    /// Phone as the visitor typed it.
    pub phone: String,
    /// Normalized dialable form of `phone`.
    pub phone_e164: String,
    pub message: String,
    pub service_id: Option<i64>,
    /// Display title of `service_id`, resolved during validation.
    #[serde(skip)]
    pub service_title: Option<String>,
    pub lang: Locale,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// A persisted lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub phone_e164: String,
    pub message: String,
    pub service_id: Option<i64>,
    pub lang: Locale,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn from_new(id: i64, new: NewLead, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            phone: new.phone,
            phone_e164: new.phone_e164,
            message: new.message,
            service_id: new.service_id,
            lang: new.lang,
            utm_source: new.utm_source,
            utm_medium: new.utm_medium,
            utm_campaign: new.utm_campaign,
            status: LeadStatus::New,
            created_at,
        }
    }
}

// ============ Catalog ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Engine,
    Diagnostics,
    Fluids,
    Detailing,
}

impl ServiceCategory {
    pub fn from_db(value: &str) -> Self {
        match value {
            "diagnostics" => ServiceCategory::Diagnostics,
            "fluids" => ServiceCategory::Fluids,
            "detailing" => ServiceCategory::Detailing,
            _ => ServiceCategory::Engine,
        }
    }
}

/// A catalog service leads can be submitted for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: i64,
    pub category: ServiceCategory,
    pub title: String,
    pub slug: String,
    pub short_desc: String,
    /// Starting price in som.
    pub price_from: Option<i32>,
    pub order: i32,
    pub is_published: bool,
}

// ============ Reviews ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReviewSource {
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "2gis")]
    Gis2,
    #[serde(rename = "instagram")]
    Instagram,
    #[default]
    #[serde(rename = "manual")]
    Manual,
}

impl ReviewSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::Google => "google",
            ReviewSource::Gis2 => "2gis",
            ReviewSource::Instagram => "instagram",
            ReviewSource::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "google" => Some(ReviewSource::Google),
            "2gis" => Some(ReviewSource::Gis2),
            "instagram" => Some(ReviewSource::Instagram),
            "manual" => Some(ReviewSource::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview {
    pub author: String,
    pub rating: u8,
    pub text: String,
    pub source: ReviewSource,
    pub source_url: Option<String>,
}

/// A submitted review. Visitors never publish directly; moderation does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: i64,
    pub author: String,
    pub rating: u8,
    pub text: String,
    pub source: ReviewSource,
    pub source_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn from_new(id: i64, new: NewReview, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author: new.author,
            rating: new.rating,
            text: new.text,
            source: new.source,
            source_url: new.source_url,
            is_published: false,
            created_at,
        }
    }
}

// ============ Contacts ============

/// Public contact block for the business phone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contacts {
    pub phone_e164: String,
    /// Grouped for display, e.g. `+996 700 123 456`.
    pub phone_display: String,
    pub whatsapp: Option<String>,
}

impl Contacts {
    pub fn from_phone(e164: &str) -> Self {
        Self {
            phone_e164: e164.to_string(),
            phone_display: pretty_phone(e164),
            whatsapp: wa_link(e164, ""),
        }
    }
}
