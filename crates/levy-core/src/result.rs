//! # Calculation Result & Aggregation
//!
//! Result DTOs plus the incremental aggregator that assembles them.
//!
//! ## Aggregation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Result Aggregation                                  │
//! │                                                                         │
//! │  ResultAggregator::new()                                               │
//! │       │                                                                 │
//! │       ├── add_item(TaxedItem)      ← running Subtotal += item.subtotal │
//! │       │   (one per request item)     running TotalTax += item.tax      │
//! │       │                                                                 │
//! │       ├── set_shipping(...)        ← TotalTax += shipping tax          │
//! │       │                                                                 │
//! │       ├── set_jurisdictions_used() ← distinct codes resolved           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  finalize(jurisdictions, at)       ← ONE pass:                         │
//! │       │                              • group AppliedTax by code        │
//! │       │                              • Total = Subtotal+Shipping+Tax   │
//! │       │                              • EffectiveRate = Tax/Subtotal    │
//! │       ▼                                                                 │
//! │  TaxCalculationResult (immutable)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Item addition order does not affect the sums but is preserved in the
//! result's item list. Breakdown groups appear in first-contribution order,
//! keeping identical requests byte-identical across runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Jurisdiction, JurisdictionType, RateKind};

// =============================================================================
// Applied Tax
// =============================================================================

/// One rate's contribution to an item or the shipping charge.
///
/// Immutable audit record: captures the base the tax was computed on, not
/// just the outcome, so a reviewer can reproduce every amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTax {
    /// Business code of the jurisdiction that levied this tax.
    pub jurisdiction_code: String,

    /// Display name of the jurisdiction.
    pub jurisdiction_name: String,

    /// Display name of the rate.
    pub tax_rate_name: String,

    /// How the amount was computed.
    pub tax_type: RateKind,

    /// The configured rate value (fraction or flat amount).
    #[ts(as = "String")]
    pub rate: Decimal,

    /// The taxable base actually used (includes prior tax for compounds).
    #[ts(as = "String")]
    pub taxable_amount: Decimal,

    /// The computed tax amount.
    #[ts(as = "String")]
    pub tax_amount: Decimal,

    /// Whether the base included previously accumulated tax.
    pub is_compound: bool,
}

// =============================================================================
// Taxed Item
// =============================================================================

/// An input item echoed back with its computed taxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxedItem {
    /// Caller's line-item identifier, echoed from the request.
    pub item_id: String,

    /// SKU, echoed from the request.
    pub sku: String,

    /// Pre-tax line subtotal, echoed from the request.
    #[ts(as = "String")]
    pub subtotal: Decimal,

    /// Total tax for this item (sum of `taxes` amounts).
    #[ts(as = "String")]
    pub tax_amount: Decimal,

    /// Per-rate contributions, in application order. Empty for exempt
    /// items.
    pub taxes: Vec<AppliedTax>,
}

// =============================================================================
// Tax Breakdown
// =============================================================================

/// Taxes grouped by jurisdiction for reporting and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    /// Business code of the jurisdiction.
    pub jurisdiction_code: String,

    /// Display name of the jurisdiction.
    pub jurisdiction_name: String,

    /// Authority level of the jurisdiction.
    pub jurisdiction_type: JurisdictionType,

    /// Sum of all tax amounts this jurisdiction contributed.
    #[ts(as = "String")]
    pub total_tax_amount: Decimal,

    /// The constituent applied-tax records.
    pub taxes: Vec<AppliedTax>,
}

// =============================================================================
// Calculation Result
// =============================================================================

/// The complete, finalized outcome of one tax calculation.
///
/// Built incrementally by [`ResultAggregator`], then finalized exactly
/// once. Partial results are never surfaced: a calculation either fully
/// succeeds or fails as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxCalculationResult {
    /// Order reference, echoed from the request.
    pub order_id: Option<String>,

    /// Per-item results, in request order.
    pub items: Vec<TaxedItem>,

    /// Tax on the shipping charge.
    #[ts(as = "String")]
    pub shipping_tax: Decimal,

    /// Sum of all item taxes plus shipping tax.
    #[ts(as = "String")]
    pub total_tax: Decimal,

    /// Sum of all item subtotals (shipping excluded).
    #[ts(as = "String")]
    pub subtotal: Decimal,

    /// `subtotal + shipping charge + total_tax`, the amount the
    /// customer actually pays.
    #[ts(as = "String")]
    pub total_amount: Decimal,

    /// `total_tax / subtotal`; zero when the subtotal is zero.
    #[ts(as = "String")]
    pub effective_tax_rate: Decimal,

    /// Taxes grouped by jurisdiction code.
    pub breakdowns: Vec<TaxBreakdown>,

    /// Distinct jurisdiction codes resolved for the request, whether or
    /// not any of their rates contributed tax.
    pub jurisdictions_used: Vec<String>,

    /// When the calculation ran.
    #[ts(as = "String")]
    pub calculated_at: DateTime<Utc>,
}

// =============================================================================
// Result Aggregator
// =============================================================================

/// Incrementally accumulates per-item and shipping taxes into a final
/// [`TaxCalculationResult`].
#[derive(Debug, Default)]
pub struct ResultAggregator {
    order_id: Option<String>,
    items: Vec<TaxedItem>,
    subtotal: Decimal,
    total_tax: Decimal,
    shipping_amount: Decimal,
    shipping_tax: Decimal,
    shipping_taxes: Vec<AppliedTax>,
    jurisdictions_used: Vec<String>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    pub fn new(order_id: Option<String>) -> Self {
        ResultAggregator {
            order_id,
            ..Default::default()
        }
    }

    /// Adds one taxed item, folding its subtotal and tax into the running
    /// totals as it is added (incremental accumulation, not a final pass).
    pub fn add_item(&mut self, item: TaxedItem) {
        self.subtotal += item.subtotal;
        self.total_tax += item.tax_amount;
        self.items.push(item);
    }

    /// Folds the shipping charge and its tax into the running totals.
    ///
    /// The charge itself participates in the final total amount (not the
    /// item subtotal); the applied-tax records participate in the
    /// jurisdiction breakdowns alongside item taxes, so
    /// `sum(breakdowns) == total_tax` holds even when shipping is taxed.
    pub fn set_shipping(&mut self, charge: Decimal, tax: Decimal, taxes: Vec<AppliedTax>) {
        self.shipping_amount = charge;
        self.total_tax += tax;
        self.shipping_tax = tax;
        self.shipping_taxes = taxes;
    }

    /// Records the distinct jurisdiction codes resolved for the request.
    pub fn set_jurisdictions_used(&mut self, codes: Vec<String>) {
        self.jurisdictions_used = codes;
    }

    /// Finalizes the result: builds the jurisdiction breakdowns in one
    /// pass and derives total amount and effective rate.
    pub fn finalize(
        self,
        jurisdictions: &[Jurisdiction],
        calculated_at: DateTime<Utc>,
    ) -> TaxCalculationResult {
        let breakdowns = build_breakdowns(&self.items, &self.shipping_taxes, jurisdictions);

        let effective_tax_rate = if self.subtotal > Decimal::ZERO {
            self.total_tax / self.subtotal
        } else {
            Decimal::ZERO
        };

        TaxCalculationResult {
            order_id: self.order_id,
            total_amount: self.subtotal + self.shipping_amount + self.total_tax,
            effective_tax_rate,
            items: self.items,
            shipping_tax: self.shipping_tax,
            total_tax: self.total_tax,
            subtotal: self.subtotal,
            breakdowns,
            jurisdictions_used: self.jurisdictions_used,
            calculated_at,
        }
    }
}

/// Groups every applied-tax record (items + shipping) by jurisdiction
/// code, preserving first-contribution order.
fn build_breakdowns(
    items: &[TaxedItem],
    shipping_taxes: &[AppliedTax],
    jurisdictions: &[Jurisdiction],
) -> Vec<TaxBreakdown> {
    let mut breakdowns: Vec<TaxBreakdown> = Vec::new();

    let all_taxes = items
        .iter()
        .flat_map(|item| item.taxes.iter())
        .chain(shipping_taxes.iter());

    for tax in all_taxes {
        match breakdowns
            .iter_mut()
            .find(|b| b.jurisdiction_code == tax.jurisdiction_code)
        {
            Some(group) => {
                group.total_tax_amount += tax.tax_amount;
                group.taxes.push(tax.clone());
            }
            None => {
                let jurisdiction_type = jurisdictions
                    .iter()
                    .find(|j| j.code == tax.jurisdiction_code)
                    .map(|j| j.jurisdiction_type)
                    .unwrap_or(JurisdictionType::District);

                breakdowns.push(TaxBreakdown {
                    jurisdiction_code: tax.jurisdiction_code.clone(),
                    jurisdiction_name: tax.jurisdiction_name.clone(),
                    jurisdiction_type,
                    total_tax_amount: tax.tax_amount,
                    taxes: vec![tax.clone()],
                });
            }
        }
    }

    breakdowns
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support;
    use rust_decimal_macros::dec;

    fn applied(code: &str, amount: Decimal) -> AppliedTax {
        AppliedTax {
            jurisdiction_code: code.to_string(),
            jurisdiction_name: format!("{code} name"),
            tax_rate_name: format!("{code} rate"),
            tax_type: RateKind::Percentage,
            rate: dec!(0.05),
            taxable_amount: dec!(100),
            tax_amount: amount,
            is_compound: false,
        }
    }

    fn taxed_item(id: &str, subtotal: Decimal, taxes: Vec<AppliedTax>) -> TaxedItem {
        let tax_amount = taxes.iter().map(|t| t.tax_amount).sum();
        TaxedItem {
            item_id: id.to_string(),
            sku: format!("SKU-{id}"),
            subtotal,
            tax_amount,
            taxes,
        }
    }

    #[test]
    fn test_incremental_totals() {
        let mut agg = ResultAggregator::new(None);
        agg.add_item(taxed_item("a", dec!(100), vec![applied("US", dec!(5))]));
        agg.add_item(taxed_item("b", dec!(50), vec![applied("US", dec!(2.5))]));

        let result = agg.finalize(&[], Utc::now());
        assert_eq!(result.subtotal, dec!(150));
        assert_eq!(result.total_tax, dec!(7.5));
        assert_eq!(result.total_amount, dec!(157.5));
        assert_eq!(result.effective_tax_rate, dec!(0.05));
    }

    #[test]
    fn test_zero_subtotal_effective_rate_is_zero() {
        let mut agg = ResultAggregator::new(None);
        agg.add_item(taxed_item("a", dec!(0), vec![]));

        let result = agg.finalize(&[], Utc::now());
        assert_eq!(result.effective_tax_rate, Decimal::ZERO);
    }

    #[test]
    fn test_breakdowns_group_by_code_and_sum_to_total() {
        let mut agg = ResultAggregator::new(Some("ord-1".to_string()));
        agg.add_item(taxed_item(
            "a",
            dec!(100),
            vec![applied("US", dec!(5)), applied("US-CA", dec!(7.25))],
        ));
        agg.add_item(taxed_item("b", dec!(40), vec![applied("US", dec!(2))]));
        agg.set_shipping(dec!(5), dec!(0.5), vec![applied("US", dec!(0.5))]);

        let jurisdictions = vec![
            test_support::jurisdiction("US", "United States"),
            test_support::jurisdiction("US-CA", "California"),
        ];
        let result = agg.finalize(&jurisdictions, Utc::now());

        assert_eq!(result.breakdowns.len(), 2);
        // First-contribution order
        assert_eq!(result.breakdowns[0].jurisdiction_code, "US");
        assert_eq!(result.breakdowns[0].total_tax_amount, dec!(7.5));
        assert_eq!(result.breakdowns[0].taxes.len(), 3);
        assert_eq!(result.breakdowns[1].jurisdiction_code, "US-CA");
        assert_eq!(result.breakdowns[1].total_tax_amount, dec!(7.25));

        // Aggregation identity: breakdown totals sum to total tax
        let breakdown_sum: Decimal = result
            .breakdowns
            .iter()
            .map(|b| b.total_tax_amount)
            .sum();
        assert_eq!(breakdown_sum, result.total_tax);
    }

    #[test]
    fn test_shipping_folds_into_totals() {
        let mut agg = ResultAggregator::new(None);
        agg.add_item(taxed_item("a", dec!(100), vec![applied("US", dec!(8.25))]));
        agg.set_shipping(dec!(10), dec!(0.825), vec![applied("US", dec!(0.825))]);

        let result = agg.finalize(&[], Utc::now());
        // Shipping charge is not part of the item subtotal...
        assert_eq!(result.subtotal, dec!(100));
        assert_eq!(result.shipping_tax, dec!(0.825));
        assert_eq!(result.total_tax, dec!(9.075));
        // ...but it is part of what the customer pays
        assert_eq!(result.total_amount, dec!(119.075));
    }

    #[test]
    fn test_result_json_field_names() {
        let mut agg = ResultAggregator::new(Some("ord-9".to_string()));
        agg.add_item(taxed_item("a", dec!(100), vec![applied("US", dec!(5))]));
        agg.set_jurisdictions_used(vec!["US".to_string()]);

        let result = agg.finalize(&[], Utc::now());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["orderId"], "ord-9");
        assert_eq!(json["totalTax"], "5");
        assert_eq!(json["items"][0]["taxes"][0]["jurisdictionCode"], "US");
        assert_eq!(json["items"][0]["taxes"][0]["taxType"], "percentage");
        assert_eq!(json["jurisdictionsUsed"][0], "US");
        assert!(json["calculatedAt"].is_string());
    }
}
