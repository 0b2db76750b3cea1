use super::UserId;
use super::order::OrderId;
use crate::error::{Result, StorefrontError};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_NAME_LEN: usize = 128;
const MIN_REFERENCE_LEN: usize = 4;
const MAX_REFERENCE_LEN: usize = 64;

/// The input a session is currently waiting for.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    #[default]
    None,
    Name,
    Email,
    PaymentReference,
}

impl Field {
    /// Trims and validates a raw text message for this field.
    pub fn validate(&self, raw: &str) -> Result<String> {
        let value = raw.trim();
        match self {
            Field::None => Err(StorefrontError::MalformedInput(
                "no input expected".to_string(),
            )),
            Field::Name => {
                if value.is_empty() || value.chars().count() > MAX_NAME_LEN {
                    return Err(StorefrontError::MalformedInput(format!(
                        "name must be 1 to {} characters",
                        MAX_NAME_LEN
                    )));
                }
                Ok(value.to_string())
            }
            Field::Email => {
                let valid = value.split_once('@').is_some_and(|(local, domain)| {
                    !local.is_empty()
                        && !domain.contains('@')
                        && domain.split('.').count() >= 2
                        && domain.split('.').all(|label| !label.is_empty())
                });
                if !valid || value.chars().any(char::is_whitespace) {
                    return Err(StorefrontError::MalformedInput(format!(
                        "'{}' is not a valid email address",
                        value
                    )));
                }
                Ok(value.to_string())
            }
            Field::PaymentReference => normalize_reference(value),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::None => "none",
            Field::Name => "name",
            Field::Email => "email",
            Field::PaymentReference => "payment_reference",
        };
        f.write_str(s)
    }
}

/// Normalizes a payment reference (UTR) so that duplicates are detected
/// regardless of case or surrounding whitespace.
pub fn normalize_reference(raw: &str) -> Result<String> {
    let code = raw.trim();
    let len_ok = (MIN_REFERENCE_LEN..=MAX_REFERENCE_LEN).contains(&code.len());
    let chars_ok = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !len_ok || !chars_ok {
        return Err(StorefrontError::MalformedInput(format!(
            "payment reference must be {}-{} letters, digits, '-' or '_'",
            MIN_REFERENCE_LEN, MAX_REFERENCE_LEN
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Per-buyer cursor over an in-progress purchase.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Session {
    pub buyer: UserId,
    pub order_id: OrderId,
    pub awaiting: Field,
}

impl Session {
    pub fn new(buyer: UserId, order_id: OrderId) -> Self {
        Self {
            buyer,
            order_id,
            awaiting: Field::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert_eq!(Field::Name.validate("  Asha Rao ").unwrap(), "Asha Rao");
        assert!(Field::Name.validate("   ").is_err());
        assert!(Field::Name.validate(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(Field::Email.validate("asha@example.com").is_ok());
        assert!(Field::Email.validate("asha@localhost").is_err());
        assert!(Field::Email.validate("@example.com").is_err());
        assert!(Field::Email.validate("a@b@example.com").is_err());
        assert!(Field::Email.validate("a b@example.com").is_err());
        assert!(Field::Email.validate("asha@example.").is_err());
    }

    #[test]
    fn test_reference_normalization() {
        assert_eq!(normalize_reference(" utr-12345 ").unwrap(), "UTR-12345");
        assert!(normalize_reference("").is_err());
        assert!(normalize_reference("abc").is_err());
        assert!(normalize_reference("TXN 1234").is_err());
        assert!(normalize_reference(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_no_field_accepts_nothing() {
        assert!(matches!(
            Field::None.validate("hello"),
            Err(StorefrontError::MalformedInput(_))
        ));
    }
}
