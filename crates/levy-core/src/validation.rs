//! # Validation Module
//!
//! Request validation for the tax engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (checkout / API layer)                                │
//! │  ├── Deserialization type checks                                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - engine preconditions                           │
//! │  ├── Shipping address country present                                  │
//! │  ├── At least one item, at most MAX_LINE_ITEMS                         │
//! │  └── No negative quantity / price / subtotal / shipping                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Repositories (configuration invariants at creation time)     │
//! │                                                                         │
//! │  Fail fast: validation runs BEFORE any repository access               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::{ValidationError, ValidationResult};
use crate::request::{TaxCalculationRequest, TaxableItem};
use crate::types::Address;
use crate::MAX_LINE_ITEMS;

// =============================================================================
// Request Validation
// =============================================================================

/// Validates a complete calculation request.
///
/// ## Rules
/// - Shipping address country must be present
/// - At least one item, at most [`MAX_LINE_ITEMS`]
/// - No item with negative quantity, unit price or subtotal
/// - Shipping amount must be non-negative
///
/// ## Example
/// ```rust
/// use levy_core::{Address, TaxCalculationRequest};
/// use levy_core::validation::validate_request;
///
/// let request = TaxCalculationRequest::new(Address::country_only("US"), vec![]);
/// assert!(validate_request(&request).is_err()); // no items
/// ```
pub fn validate_request(request: &TaxCalculationRequest) -> ValidationResult<()> {
    validate_address(&request.shipping_address)?;

    if request.items.is_empty() {
        return Err(ValidationError::NoItems);
    }

    if request.items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::TooManyItems {
            max: MAX_LINE_ITEMS,
        });
    }

    for item in &request.items {
        validate_item(item)?;
    }

    validate_non_negative("shipping amount", request.shipping_amount)?;

    Ok(())
}

/// Validates that an address can be matched: the country must be present.
///
/// All other fields are optional wildcard targets.
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    if address.country.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "shipping address country".to_string(),
        });
    }

    Ok(())
}

/// Validates a single line item.
///
/// ## Rules
/// - Quantity must be >= 0 (zero is allowed: a zero-quantity line simply
///   contributes no flat tax)
/// - Unit price and subtotal must be >= 0 (zero is allowed for free items)
pub fn validate_item(item: &TaxableItem) -> ValidationResult<()> {
    if item.quantity < 0 {
        return Err(ValidationError::Negative {
            field: format!("quantity for item {}", item.item_id),
        });
    }

    validate_non_negative(&format!("unit price for item {}", item.item_id), item.unit_price)?;
    validate_non_negative(&format!("subtotal for item {}", item.item_id), item.subtotal)?;

    Ok(())
}

/// Rejects negative decimal amounts.
fn validate_non_negative(field: &str, amount: Decimal) -> ValidationResult<()> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxCategory;
    use rust_decimal_macros::dec;

    fn item(quantity: i64, unit_price: Decimal, subtotal: Decimal) -> TaxableItem {
        TaxableItem {
            item_id: "i-1".to_string(),
            sku: "WIDGET".to_string(),
            quantity,
            unit_price,
            subtotal,
            tax_category: TaxCategory::General,
            is_exempt: false,
        }
    }

    fn request_with(items: Vec<TaxableItem>) -> TaxCalculationRequest {
        TaxCalculationRequest::new(Address::country_only("US"), items)
    }

    #[test]
    fn test_valid_request() {
        let request = request_with(vec![item(2, dec!(50), dec!(100))]);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_missing_country() {
        let mut request = request_with(vec![item(1, dec!(1), dec!(1))]);
        request.shipping_address.country = "  ".to_string();
        assert!(matches!(
            validate_request(&request),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_empty_items() {
        let request = request_with(vec![]);
        assert!(matches!(
            validate_request(&request),
            Err(ValidationError::NoItems)
        ));
    }

    #[test]
    fn test_negative_quantity() {
        let request = request_with(vec![item(-1, dec!(1), dec!(1))]);
        assert!(matches!(
            validate_request(&request),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_negative_price_and_shipping() {
        let request = request_with(vec![item(1, dec!(-1), dec!(1))]);
        assert!(validate_request(&request).is_err());

        let mut request = request_with(vec![item(1, dec!(1), dec!(1))]);
        request.shipping_amount = dec!(-0.01);
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_zero_quantity_and_free_items_allowed() {
        let request = request_with(vec![item(0, dec!(0), dec!(0))]);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_too_many_items() {
        let items: Vec<TaxableItem> = (0..=MAX_LINE_ITEMS)
            .map(|_| item(1, dec!(1), dec!(1)))
            .collect();
        let request = request_with(items);
        assert!(matches!(
            validate_request(&request),
            Err(ValidationError::TooManyItems { .. })
        ));
    }
}
