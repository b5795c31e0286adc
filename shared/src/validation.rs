//! Validation utilities for the Obra Operations Platform

use rust_decimal::Decimal;

/// Validate that a requested quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate that a required text field is not blank
pub fn validate_required_text(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Field cannot be blank");
    }
    Ok(())
}

/// Validate an official order number (e.g., "OC-001")
///
/// Format: an uppercase alphabetic prefix, a dash, and a numeric sequence.
pub fn validate_order_number(number: &str) -> Result<(), &'static str> {
    let mut parts = number.splitn(2, '-');
    let prefix = parts.next().unwrap_or("");
    let sequence = parts.next().unwrap_or("");

    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err("Order number must start with an uppercase prefix");
    }
    if sequence.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
        return Err("Order number must end with a numeric sequence");
    }
    Ok(())
}

/// Validate a priced line item
pub fn validate_priced_item(quantity: Decimal, unit_price: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Priced quantity must be greater than zero");
    }
    if unit_price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Check that a set of request quantities is conserved by a split
///
/// A partial receipt must divide one request into two whose quantities sum
/// to the original.
pub fn split_conserves_quantity(original: Decimal, received: Decimal, remainder: Decimal) -> bool {
    received + remainder == original && received > Decimal::ZERO && remainder > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(dec(1)).is_ok());
        assert!(validate_positive_quantity(dec(100)).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec(-5)).is_err());
    }

    #[test]
    fn test_validate_required_text() {
        assert!(validate_required_text("Cemento").is_ok());
        assert!(validate_required_text("").is_err());
        assert!(validate_required_text("   ").is_err());
    }

    #[test]
    fn test_validate_order_number() {
        assert!(validate_order_number("OC-001").is_ok());
        assert!(validate_order_number("OC-12345").is_ok());
        assert!(validate_order_number("oc-001").is_err());
        assert!(validate_order_number("OC001").is_err());
        assert!(validate_order_number("OC-").is_err());
        assert!(validate_order_number("-001").is_err());
        assert!(validate_order_number("OC-00A").is_err());
    }

    #[test]
    fn test_validate_priced_item() {
        assert!(validate_priced_item(dec(10), dec(250)).is_ok());
        assert!(validate_priced_item(dec(10), Decimal::ZERO).is_ok());
        assert!(validate_priced_item(Decimal::ZERO, dec(250)).is_err());
        assert!(validate_priced_item(dec(10), dec(-1)).is_err());
    }

    #[test]
    fn test_split_conserves_quantity() {
        assert!(split_conserves_quantity(dec(100), dec(60), dec(40)));
        assert!(!split_conserves_quantity(dec(100), dec(60), dec(50)));
        assert!(!split_conserves_quantity(dec(100), dec(100), Decimal::ZERO));
    }
}
