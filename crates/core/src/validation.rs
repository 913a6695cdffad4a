//! Booking form validation

use crate::error::{Error, Result};
use crate::models::Customer;

const MAX_NAME_LEN: usize = 100;
const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

/// Trim and check the customer's details; returns the normalized customer.
///
/// Phone separators (spaces, dashes, dots, parentheses) are dropped; an
/// optional leading `+` is kept.
pub fn validate_customer(customer: &Customer) -> Result<Customer> {
    let name = customer.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Customer name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "Customer name is longer than {} characters",
            MAX_NAME_LEN
        )));
    }

    let phone = normalize_phone(&customer.phone)?;

    Ok(Customer {
        name: name.to_string(),
        phone,
    })
}

pub fn normalize_phone(raw: &str) -> Result<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    let valid = digits.chars().all(|c| c.is_ascii_digit())
        && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len());

    if valid {
        Ok(compact)
    } else {
        Err(Error::Validation(format!("Invalid phone number '{}'", raw.trim())))
    }
}

/// Free-text field that must not be blank
pub fn require_text(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_customer_is_normalized() {
        let customer =
            validate_customer(&Customer::new("  Sami Ben Ali ", "+216 20-123 456")).unwrap();
        assert_eq!(customer.name, "Sami Ben Ali");
        assert_eq!(customer.phone, "+21620123456");
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(validate_customer(&Customer::new("   ", "20123456")).is_err());
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(normalize_phone("(216) 20.123.456").unwrap(), "21620123456");
        assert!(normalize_phone("1234567").is_err());
        assert!(normalize_phone("1234567890123456").is_err());
        assert!(normalize_phone("20 12a 456").is_err());
        assert!(normalize_phone("++21620123456").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(" wedding ", "Event type").unwrap(), "wedding");
        assert!(require_text("  ", "Event type").is_err());
    }
}
