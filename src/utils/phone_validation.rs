//! Phone number validation for outbound calls
//!
//! Numbers are accepted in E.164 form with common visual separators
//! (spaces, dashes, dots, parentheses) and normalized to `+<digits>`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Country code followed by 6 to 14 more digits, 15 at most in total.
static E164: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[1-9][0-9]{6,14}$").unwrap_or_else(|e| panic!("invalid E.164 regex: {e}"))
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneValidationError {
    #[error("Phone number is empty")]
    Empty,

    #[error("Invalid phone number '{0}': expected E.164 format such as +14155550100")]
    InvalidFormat(String),
}

/// Validate and normalize a destination number.
///
/// # Example
/// ```
/// use voxcall_gateway::utils::validate_phone_number;
///
/// assert_eq!(validate_phone_number(" +1 (415) 555-0100 ").unwrap(), "+14155550100");
/// assert!(validate_phone_number("12").is_err());
/// ```
pub fn validate_phone_number(raw: &str) -> Result<String, PhoneValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneValidationError::Empty);
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if !E164.is_match(&compact) {
        return Err(PhoneValidationError::InvalidFormat(trimmed.to_string()));
    }

    Ok(format!("+{}", compact.trim_start_matches('+')))
}
