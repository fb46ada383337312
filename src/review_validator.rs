use serde::Deserialize;

use crate::errors::ValidationErrors;
use crate::i18n::{translate, Locale, Msg};
use crate::lead_validator::clean_text;
use crate::models::{NewReview, ReviewSource};

pub const AUTHOR_MAX_LEN: usize = 120;

/// Raw review form as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_url: String,
}

/// Validates a review submission. Rating must be 1..=5, the source URL (if
/// any) an absolute http(s) URL.
pub fn validate_review(form: &ReviewForm, locale: Locale) -> Result<NewReview, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let author = clean_text(&form.author, "author", Some(AUTHOR_MAX_LEN), true, locale, &mut errors);
    let text = clean_text(&form.text, "text", None, true, locale, &mut errors);

    let rating = match form.rating.trim() {
        "" => {
            errors.add("rating", translate(Msg::Required, locale));
            None
        }
        raw => match raw.parse::<u8>() {
            Ok(r) if (1..=5).contains(&r) => Some(r),
            _ => {
                errors.add("rating", translate(Msg::RatingRange, locale));
                None
            }
        },
    };

    let source = match form.source.trim() {
        "" => ReviewSource::default(),
        raw => ReviewSource::parse(raw).unwrap_or_else(|| {
            errors.add("source", translate(Msg::InvalidChoice, locale));
            ReviewSource::default()
        }),
    };

    let source_url = match form.source_url.trim() {
        "" => None,
        raw => match url::Url::parse(raw) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {
                Some(raw.to_string())
            }
            _ => {
                errors.add("source_url", translate(Msg::InvalidUrl, locale));
                None
            }
        },
    };

    match (author, text, rating) {
        (Some(author), Some(text), Some(rating)) if errors.is_empty() => Ok(NewReview {
            author,
            rating,
            text,
            source,
            source_url,
        }),
        _ => Err(errors),
    }
}
