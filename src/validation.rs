// Validation utilities module
// Domain checks that don't fit the validator derive attributes

use rust_decimal::Decimal;

/// Validates that a menu price is positive
pub fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        Err("Price must be a positive amount".to_string())
    } else {
        Ok(())
    }
}

/// Validates an optional price for partial updates
pub fn validate_optional_price(price: Option<Decimal>) -> Result<(), String> {
    match price {
        Some(value) => validate_price(value),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_price_accepted() {
        assert!(validate_price(dec!(0.01)).is_ok());
        assert!(validate_price(dec!(120)).is_ok());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        assert!(validate_price(Decimal::ZERO).is_err());
        assert!(validate_price(dec!(-5)).is_err());
    }

    #[test]
    fn test_optional_price() {
        assert!(validate_optional_price(None).is_ok());
        assert!(validate_optional_price(Some(dec!(3.50))).is_ok());
        assert!(validate_optional_price(Some(dec!(-1))).is_err());
    }
}
