//! Payer phone numbers for the push channel.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Kenyan mobile number in the `2547XXXXXXXX` / `2541XXXXXXXX` form Daraja
/// expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalises `07…`, `01…`, `7…`, `+254…` and `254…` inputs. Spaces and
    /// dashes are ignored.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if cleaned.is_empty() {
            return Err(ValidationError::empty_field("phone_number"));
        }

        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must contain digits only"));
        }

        let subscriber = if let Some(rest) = digits.strip_prefix("254") {
            rest
        } else if let Some(rest) = digits.strip_prefix('0') {
            rest
        } else {
            digits
        };

        if subscriber.len() != 9 {
            return Err(invalid("expected 9 subscriber digits"));
        }
        if !(subscriber.starts_with('7') || subscriber.starts_with('1')) {
            return Err(invalid("not a mobile number"));
        }

        Ok(Self(format!("254{}", subscriber)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn invalid(reason: &str) -> ValidationError {
    ValidationError::invalid_format("phone_number", reason)
}
