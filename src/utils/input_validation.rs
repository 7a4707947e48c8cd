use derive_more::derive::Display;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{ValidateEmail, ValidateUrl};

use crate::consts::{MAX_LONG_TEXT_LENGTH, MAX_SHORT_TEXT_LENGTH, OTP_LENGTH};

// One letter followed by four digits, e.g. "A1234"
static ISA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][0-9]{4}$").expect("Failed to compile ISA regex"));

static OTP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^[0-9]{{{OTP_LENGTH}}}$")).expect("Failed to compile OTP regex")
});

const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("Invalid e-mail address")]
    Email,
    #[error("ISA number must be one letter followed by 4 digits")]
    IsaNumber,
    #[error("Please enter a valid 6-digit code")]
    OtpCode,
    #[error("Field '{0}' cannot be empty")]
    Missing(&'static str),
    #[error("Field '{0}' is too long")]
    TooLong(&'static str),
    #[error("Field '{0}' contains invalid control characters")]
    ControlCharacters(&'static str),
    #[error("Field '{0}' must be a valid URL")]
    Url(&'static str),
}

/// Wrapper type for an e-mail address that has been validated and normalized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct EmailAddress(String);

impl TryFrom<&str> for EmailAddress {
    type Error = InvalidInput;

    fn try_from(email: &str) -> Result<Self, Self::Error> {
        let trimmed = email.trim();

        if trimmed.is_empty() || trimmed.len() > MAX_EMAIL_LENGTH || !trimmed.validate_email() {
            return Err(InvalidInput::Email);
        }

        // Addresses are compared case-insensitively
        Ok(Self(trimmed.to_lowercase()))
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = InvalidInput;

    fn try_from(email: String) -> Result<Self, Self::Error> {
        Self::try_from(email.as_str())
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Wrapper type for a validated association membership number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
pub struct IsaNumber(String);

impl TryFrom<&str> for IsaNumber {
    type Error = InvalidInput;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if ISA_REGEX.is_match(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(InvalidInput::IsaNumber)
        }
    }
}

impl TryFrom<String> for IsaNumber {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for IsaNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A one-time code as typed by the user. Only its format is checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl TryFrom<&str> for OtpCode {
    type Error = InvalidInput;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if OTP_REGEX.is_match(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(InvalidInput::OtpCode)
        }
    }
}

impl AsRef<str> for OtpCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn checked_text(
    field: &'static str,
    value: &str,
    max_length: usize,
    multiline: bool,
) -> Result<String, InvalidInput> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(InvalidInput::Missing(field));
    }

    if trimmed.chars().count() > max_length {
        return Err(InvalidInput::TooLong(field));
    }

    let forbidden = |c: char| c.is_control() && !(multiline && (c == '\n' || c == '\t'));
    if trimmed.chars().any(forbidden) {
        return Err(InvalidInput::ControlCharacters(field));
    }

    Ok(trimmed.to_owned())
}

/// Validates a single-line field such as a name or a title
pub fn short_text(field: &'static str, value: &str) -> Result<String, InvalidInput> {
    checked_text(field, value, MAX_SHORT_TEXT_LENGTH, false)
}

/// Validates free-form content such as a description or an abstract
pub fn long_text(field: &'static str, value: &str) -> Result<String, InvalidInput> {
    checked_text(field, value, MAX_LONG_TEXT_LENGTH, true)
}

/// Same as [`short_text`] but an empty value is allowed
pub fn optional_text(field: &'static str, value: &str) -> Result<String, InvalidInput> {
    if value.trim().is_empty() {
        Ok(String::new())
    } else {
        short_text(field, value)
    }
}

/// Splits a comma separated list, dropping blank entries
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Validates every entry of a list field, at least one entry is required
pub fn text_list(field: &'static str, values: &[String]) -> Result<Vec<String>, InvalidInput> {
    if values.is_empty() {
        return Err(InvalidInput::Missing(field));
    }
    values.iter().map(|value| short_text(field, value)).collect()
}

/// Same as [`text_list`] but the list may be empty
pub fn optional_list(field: &'static str, values: &[String]) -> Result<Vec<String>, InvalidInput> {
    values.iter().map(|value| short_text(field, value)).collect()
}

/// Validates a link to an image, a document or an attachment
pub fn url(field: &'static str, value: &str) -> Result<String, InvalidInput> {
    let value = short_text(field, value)?;
    if value.validate_url() {
        Ok(value)
    } else {
        Err(InvalidInput::Url(field))
    }
}
