//! Site locales and the user-facing messages returned by form validation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the site is published in. Russian is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    Ky,
    En,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Ru, Locale::Ky, Locale::En];

    /// Normalizes a language tag (`en-US`, `KY`, `kg`) to a site locale.
    ///
    /// Anything unrecognized falls back to the default locale.
    pub fn from_tag(tag: &str) -> Self {
        Self::parse(tag).unwrap_or_default()
    }

    /// Strict variant of [`Locale::from_tag`]: `None` for unknown tags.
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        match primary.as_str() {
            "ru" => Some(Locale::Ru),
            // "kg" is the country code, but it shows up in hand-written links
            "ky" | "kg" => Some(Locale::Ky),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::Ky => "ky",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message keys used by the form validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Required,
    TooLong(usize),
    InvalidPhone,
    InvalidService,
    CheckForm,
    RatingRange,
    InvalidUrl,
    InvalidChoice,
}

pub fn translate(msg: Msg, locale: Locale) -> String {
    match (msg, locale) {
        (Msg::Required, Locale::Ru) => "Обязательное поле.".to_string(),
        (Msg::Required, Locale::Ky) => "Милдеттүү талаа.".to_string(),
        (Msg::Required, Locale::En) => "This field is required.".to_string(),

        (Msg::TooLong(max), Locale::Ru) => format!("Не более {} символов.", max),
        (Msg::TooLong(max), Locale::Ky) => format!("{} белгиден ашпашы керек.", max),
        (Msg::TooLong(max), Locale::En) => format!("At most {} characters.", max),

        (Msg::InvalidPhone, Locale::Ru) => "Введите корректный номер телефона.".to_string(),
        (Msg::InvalidPhone, Locale::Ky) => "Туура телефон номерин киргизиңиз.".to_string(),
        (Msg::InvalidPhone, Locale::En) => "Enter a valid phone number.".to_string(),

        (Msg::InvalidService, Locale::Ru) => "Выбранная услуга недоступна.".to_string(),
        (Msg::InvalidService, Locale::Ky) => "Тандалган кызмат жеткиликсиз.".to_string(),
        (Msg::InvalidService, Locale::En) => "The selected service is not available.".to_string(),

        (Msg::CheckForm, Locale::Ru) => "Проверьте форму".to_string(),
        (Msg::CheckForm, Locale::Ky) => "Форманы текшериңиз".to_string(),
        (Msg::CheckForm, Locale::En) => "Please check the form".to_string(),

        (Msg::RatingRange, Locale::Ru) => "Оценка должна быть от 1 до 5.".to_string(),
        (Msg::RatingRange, Locale::Ky) => "Баа 1ден 5ке чейин болушу керек.".to_string(),
        (Msg::RatingRange, Locale::En) => "Rating must be between 1 and 5.".to_string(),

        (Msg::InvalidUrl, Locale::Ru) => "Введите правильный URL.".to_string(),
        (Msg::InvalidUrl, Locale::Ky) => "Туура URL киргизиңиз.".to_string(),
        (Msg::InvalidUrl, Locale::En) => "Enter a valid URL.".to_string(),

        (Msg::InvalidChoice, Locale::Ru) => "Выберите корректный вариант.".to_string(),
        (Msg::InvalidChoice, Locale::Ky) => "Туура вариантты тандаңыз.".to_string(),
        (Msg::InvalidChoice, Locale::En) => "Select a valid choice.".to_string(),
    }
}
