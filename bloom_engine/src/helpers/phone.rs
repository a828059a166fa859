use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,
    #[error("Phone number could not be normalised: {0}")]
    Unrecognised(String),
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9]").unwrap())
}

/// Normalises a phone number to the canonical international form `+91XXXXXXXXXX`.
///
/// Accepted inputs: a bare 10-digit local number, a `91`-prefixed 12-digit number, or either with a leading `+`,
/// with any spaces, dashes or parentheses in between. Anything else is an error; a notification attempt with an
/// unusable number must short-circuit rather than guess.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }
    let digits = digits_re().replace_all(trimmed, "").to_string();
    match digits.len() {
        10 if !digits.starts_with('0') => Ok(format!("+91{digits}")),
        12 if digits.starts_with("91") => Ok(format!("+{digits}")),
        _ => Err(PhoneError::Unrecognised(mask_phone(raw))),
    }
}

/// Masks a phone number for logging, keeping a short prefix and suffix only.
/// Full contact details must never reach the logs.
pub fn mask_phone(raw: &str) -> String {
    let digits = digits_re().replace_all(raw.trim(), "").to_string();
    if digits.len() < 6 {
        return "***".to_string();
    }
    format!("{}***{}", &digits[..2], &digits[digits.len() - 2..])
}
