//! # Calculation Request
//!
//! Wire-facing request DTOs for a tax calculation.
//!
//! ## Request Shape (JSON)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {                                                                      │
//! │    "orderId": "ord-1001",            (optional)                        │
//! │    "customerId": "cust-42",          (optional, enables exemptions)    │
//! │    "shippingAddress": { "country": "US", "stateProvince": "CA", ... }, │
//! │    "billingAddress":  { ... },       (optional, not used for matching) │
//! │    "items": [                                                           │
//! │      { "itemId": "i-1", "sku": "WIDGET", "quantity": 2,                │
//! │        "unitPrice": "50.00", "subtotal": "100.00",                     │
//! │        "taxCategory": "general", "isExempt": false }                   │
//! │    ],                                                                   │
//! │    "shippingAmount": "10.00"                                           │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request objects are created fresh per calculation and discarded after
//! use; the engine never mutates them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Address, TaxCategory};

// =============================================================================
// Taxable Item
// =============================================================================

/// One taxable line item in a calculation request.
///
/// ## Snapshot Semantics
/// `unit_price` and `subtotal` are frozen by the caller at request time;
/// the engine does not recompute `subtotal` from `unit_price * quantity`
/// (discount layers upstream may have adjusted it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxableItem {
    /// Caller's line-item identifier, echoed back in the result.
    pub item_id: String,

    /// Stock Keeping Unit.
    pub sku: String,

    /// Units purchased. Must be >= 0.
    pub quantity: i64,

    /// Price per unit.
    #[ts(as = "String")]
    pub unit_price: Decimal,

    /// Pre-tax line subtotal. Must be >= 0. Used as the taxable base and
    /// for rate threshold checks.
    #[ts(as = "String")]
    pub subtotal: Decimal,

    /// Category used to select applicable rates.
    pub tax_category: TaxCategory,

    /// Explicit item-level exemption. Stronger than any customer
    /// exemption: bypasses all rate application for this item.
    #[serde(default)]
    pub is_exempt: bool,
}

// =============================================================================
// Calculation Request
// =============================================================================

/// A complete tax calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxCalculationRequest {
    /// Optional order reference, echoed back in the result.
    pub order_id: Option<String>,

    /// Optional customer. When present, active exemptions for this
    /// customer are loaded and evaluated per rate.
    pub customer_id: Option<String>,

    /// Destination address. Drives jurisdiction resolution.
    pub shipping_address: Address,

    /// Billing address. Carried for completeness; jurisdiction matching
    /// uses the shipping address only.
    pub billing_address: Option<Address>,

    /// Ordered line items. Result items preserve this order.
    pub items: Vec<TaxableItem>,

    /// Shipping charge. Taxed only by shipping-taxable rates in the
    /// SHIPPING category, and only when non-zero.
    #[ts(as = "String")]
    pub shipping_amount: Decimal,
}

impl TaxCalculationRequest {
    /// Creates a request with no order/customer context and no shipping.
    pub fn new(shipping_address: Address, items: Vec<TaxableItem>) -> Self {
        TaxCalculationRequest {
            order_id: None,
            customer_id: None,
            shipping_address,
            billing_address: None,
            items,
            shipping_amount: Decimal::ZERO,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_json_field_names() {
        let request = TaxCalculationRequest {
            order_id: Some("ord-1".to_string()),
            customer_id: None,
            shipping_address: Address::country_only("US"),
            billing_address: None,
            items: vec![TaxableItem {
                item_id: "i-1".to_string(),
                sku: "WIDGET".to_string(),
                quantity: 2,
                unit_price: dec!(50.00),
                subtotal: dec!(100.00),
                tax_category: TaxCategory::General,
                is_exempt: false,
            }],
            shipping_amount: dec!(10.00),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], "ord-1");
        assert_eq!(json["shippingAddress"]["country"], "US");
        assert_eq!(json["items"][0]["itemId"], "i-1");
        assert_eq!(json["items"][0]["taxCategory"], "general");
        assert_eq!(json["items"][0]["unitPrice"], "50.00");
        assert_eq!(json["shippingAmount"], "10.00");
    }

    #[test]
    fn test_is_exempt_defaults_to_false() {
        let json = r#"{
            "itemId": "i-1", "sku": "WIDGET", "quantity": 1,
            "unitPrice": "5.00", "subtotal": "5.00", "taxCategory": "food"
        }"#;
        let item: TaxableItem = serde_json::from_str(json).unwrap();
        assert!(!item.is_exempt);
        assert_eq!(item.tax_category, TaxCategory::Food);
    }
}
