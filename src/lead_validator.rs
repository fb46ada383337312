//! Validation of inbound lead submissions.
//!
//! A submission either becomes a [`NewLead`] ready for storage or is
//! rejected with field-level [`ValidationErrors`]. Validation has no side
//! effects; the only I/O is the read-only catalog lookup for `service`.

use serde::Deserialize;

use crate::errors::{AppError, ValidationErrors};
use crate::i18n::{translate, Locale, Msg};
use crate::models::NewLead;
use crate::phone::normalize_phone;
use crate::store::ServiceCatalog;

pub const NAME_MAX_LEN: usize = 120;
pub const PHONE_MAX_LEN: usize = 32;
pub const UTM_MAX_LEN: usize = 64;

/// Raw lead form as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, alias = "comment")]
    pub message: String,
    /// Service id, empty when the form was not opened from a service page.
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
    #[serde(default)]
    pub utm_campaign: String,
    /// Honeypot. Hidden from people, filled in by bots.
    #[serde(default)]
    pub website: String,
}

/// Error returned for any submission that trips the honeypot.
///
/// Deliberately identical for every such submission, whatever else it
/// contains, so the response does not reveal what was detected.
pub fn bot_rejection() -> ValidationErrors {
    ValidationErrors::non_field(translate(Msg::CheckForm, Locale::default()))
}

/// Trims `value` and checks presence and length. Returns `None` for empty
/// input (recording an error if the field is required).
pub(crate) fn clean_text(
    value: &str,
    field: &str,
    max_len: Option<usize>,
    required: bool,
    locale: Locale,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        if required {
            errors.add(field, translate(Msg::Required, locale));
        }
        return None;
    }

    if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.add(field, translate(Msg::TooLong(max), locale));
            return None;
        }
    }

    Some(value.to_string())
}

pub struct LeadValidator<'a> {
    catalog: &'a dyn ServiceCatalog,
}

impl<'a> LeadValidator<'a> {
    pub fn new(catalog: &'a dyn ServiceCatalog) -> Self {
        Self { catalog }
    }

    /// Validates a submission.
    ///
    /// `path_locale` is the locale from the URL prefix, which wins over the
    /// form's own `lang` field. Rejections come back as
    /// [`AppError::Validation`]; any other error is a catalog failure.
    pub async fn validate(
        &self,
        form: &LeadForm,
        path_locale: Option<Locale>,
    ) -> Result<NewLead, AppError> {
        if !form.website.trim().is_empty() {
            tracing::debug!("Honeypot field filled, rejecting submission");
            return Err(bot_rejection().into());
        }

        let lang = path_locale.unwrap_or_else(|| Locale::from_tag(&form.lang));
        let mut errors = ValidationErrors::new();

        let name = clean_text(&form.name, "name", Some(NAME_MAX_LEN), true, lang, &mut errors);

        let phone = clean_text(&form.phone, "phone", Some(PHONE_MAX_LEN), true, lang, &mut errors);
        let phone_e164 = phone.as_deref().and_then(|raw| match normalize_phone(raw) {
            Ok(normalized) => Some(normalized),
            Err(e) => {
                tracing::debug!("Rejecting phone '{}': {}", raw, e);
                errors.add("phone", translate(Msg::InvalidPhone, lang));
                None
            }
        });

        let message = form.message.trim().to_string();

        let utm_source = clean_text(&form.utm_source, "utm_source", Some(UTM_MAX_LEN), false, lang, &mut errors);
        let utm_medium = clean_text(&form.utm_medium, "utm_medium", Some(UTM_MAX_LEN), false, lang, &mut errors);
        let utm_campaign = clean_text(&form.utm_campaign, "utm_campaign", Some(UTM_MAX_LEN), false, lang, &mut errors);

        let service = match form.service.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => match self.catalog.find_published_service(id).await? {
                    Some(service) => Some(service),
                    None => {
                        errors.add("service", translate(Msg::InvalidService, lang));
                        None
                    }
                },
                Err(_) => {
                    errors.add("service", translate(Msg::InvalidService, lang));
                    None
                }
            },
        };

        match (name, phone, phone_e164) {
            (Some(name), Some(phone), Some(phone_e164)) if errors.is_empty() => Ok(NewLead {
                name,
                phone,
                phone_e164,
                message,
                service_id: service.as_ref().map(|s| s.id),
                service_title: service.map(|s| s.title),
                lang,
                utm_source,
                utm_medium,
                utm_campaign,
            }),
            _ => Err(errors.into()),
        }
    }
}
