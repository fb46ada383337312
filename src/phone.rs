use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Region assumed for numbers typed without a country code.
pub const DEFAULT_REGION: CountryId = CountryId::KG;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    Empty,
    Unparseable(String),
    Invalid,
}

impl fmt::Display for PhoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneError::Empty => write!(f, "Phone is empty"),
            PhoneError::Unparseable(e) => write!(f, "Parse error: {}", e),
            PhoneError::Invalid => write!(f, "Not a valid phone number"),
        }
    }
}

/// Validate and normalize a phone number to E.164.
///
/// Uses the phonenumber library (port of Google's libphonenumber). Numbers
/// without a `+` prefix are read as Kyrgyz numbers, so `0700 123 456`
/// becomes `+996700123456`.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PhoneError::Empty);
    }

    let number = phonenumber::parse(Some(DEFAULT_REGION), raw).map_err(|e| {
        tracing::debug!("Failed to parse phone '{}': {:?}", raw, e);
        PhoneError::Unparseable(format!("{:?}", e))
    })?;

    if !phonenumber::is_valid(&number) {
        tracing::debug!("Invalid phone number: {}", raw);
        return Err(PhoneError::Invalid);
    }

    Ok(number.format().mode(Mode::E164).to_string())
}

fn kg_mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+996(\d{3})(\d{3})(\d{3})$").expect("static regex"))
}

fn non_digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\D").expect("static regex"))
}

/// Groups a Kyrgyz E.164 number for display: `+996 700 123 456`.
/// Other numbers come back unchanged.
pub fn pretty_phone(e164: &str) -> String {
    kg_mobile_regex()
        .replace(e164, "+996 $1 $2 $3")
        .into_owned()
}

/// Builds a `wa.me` chat link for the number, optionally with prefilled text.
pub fn wa_link(e164: &str, text: &str) -> Option<String> {
    let digits = non_digits_regex().replace_all(e164, "");
    if digits.is_empty() {
        return None;
    }

    if text.is_empty() {
        return Some(format!("https://wa.me/{}", digits));
    }

    // byte_serialize uses '+' for spaces; a literal '+' is already %2B
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    Some(format!("https://wa.me/{}?text={}", digits, encoded))
}
