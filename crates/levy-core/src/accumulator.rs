//! # Tax Accumulation
//!
//! Applies a sorted, filtered rate list to one taxable base, handling
//! compounding. Shared by items and the shipping charge.
//!
//! ## Per-Item State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Item Tax Accumulation                                │
//! │                                                                         │
//! │  cumulative_tax := 0                                                    │
//! │  for rate in rates (priority-sorted):                                   │
//! │       │                                                                 │
//! │       ├── inactive / out of window?        → skip (defensive re-check) │
//! │       ├── base outside rate thresholds?    → skip                      │
//! │       ├── customer exemption covers rate?  → skip (silent, no record)  │
//! │       ├── unknown jurisdiction?            → skip (defensive)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  taxable_base = subtotal                  (non-compound)               │
//! │               = subtotal + cumulative_tax (compound)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tax = taxable_base * rate     (percentage / compound)                 │
//! │      = rate * quantity         (flat; ignores the base)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cumulative_tax += tax; append AppliedTax audit record                 │
//! │                                                                         │
//! │  Example (spec'd compound ordering):                                   │
//! │    $100, A = 5% prio 1 non-compound, B = 2% prio 2 compound            │
//! │    A: base $100.00 → $5.00                                             │
//! │    B: base $105.00 → $2.10        item tax = $7.10                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An item with `is_exempt == true` short-circuits before rate iteration:
//! zero tax, empty applied-tax list. This is stronger than a per-rate
//! customer exemption and is checked first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::exemption::rate_exempted;
use crate::rates::within_thresholds;
use crate::request::TaxableItem;
use crate::result::{AppliedTax, TaxedItem};
use crate::types::{Jurisdiction, RateKind, TaxExemption, TaxRate};

// =============================================================================
// Jurisdiction Index
// =============================================================================

/// Jurisdiction lookup by id for building audit records.
///
/// Rates carry only their owning jurisdiction's id; applied-tax records
/// need the business code and display name.
#[derive(Debug)]
pub struct JurisdictionIndex<'a> {
    by_id: HashMap<&'a str, &'a Jurisdiction>,
}

impl<'a> JurisdictionIndex<'a> {
    /// Builds the index from the resolved jurisdiction set.
    pub fn new(jurisdictions: &'a [Jurisdiction]) -> Self {
        JurisdictionIndex {
            by_id: jurisdictions.iter().map(|j| (j.id.as_str(), j)).collect(),
        }
    }

    /// Looks up a jurisdiction by id.
    pub fn get(&self, id: &str) -> Option<&'a Jurisdiction> {
        self.by_id.get(id).copied()
    }
}

// =============================================================================
// Accumulation Context
// =============================================================================

/// Shared inputs for one accumulation run.
///
/// All references point into request-scoped snapshots; the accumulator
/// never mutates them.
#[derive(Debug)]
pub struct AccumulationContext<'a> {
    /// The customer's active exemptions (empty if no customer id).
    pub exemptions: &'a [TaxExemption],
    /// Resolved jurisdictions for audit-record lookup.
    pub index: &'a JurisdictionIndex<'a>,
    /// The single time snapshot used for every window re-check.
    pub now: DateTime<Utc>,
}

// =============================================================================
// Accumulation
// =============================================================================

/// Runs the accumulation state machine over a prepared rate list.
///
/// `rates` must already be filtered and priority-sorted (see
/// [`crate::rates::prepare_rates`]). Returns the cumulative tax and the
/// applied-tax audit trail in application order.
pub fn accumulate(
    base: Decimal,
    quantity: i64,
    rates: &[TaxRate],
    ctx: &AccumulationContext<'_>,
) -> (Decimal, Vec<AppliedTax>) {
    let mut cumulative_tax = Decimal::ZERO;
    let mut applied: Vec<AppliedTax> = Vec::new();

    for rate in rates {
        // Defensive re-check; prepare_rates already filtered these.
        if !rate.is_active || !rate.is_effective_at(ctx.now) {
            continue;
        }

        if !within_thresholds(rate, base) {
            continue;
        }

        // Suppressed rates are silent: no zero-valued audit entries.
        if rate_exempted(ctx.exemptions, rate, ctx.now) {
            continue;
        }

        // A rate pointing at a jurisdiction outside the resolved set is a
        // configuration anomaly; treat it as non-applicable.
        let Some(jurisdiction) = ctx.index.get(&rate.jurisdiction_id) else {
            continue;
        };

        let taxable_base = if rate.compounds() {
            base + cumulative_tax
        } else {
            base
        };

        let tax_amount = match rate.kind {
            RateKind::Percentage | RateKind::Compound => taxable_base * rate.rate,
            RateKind::Flat => rate.rate * Decimal::from(quantity),
        };

        cumulative_tax += tax_amount;
        applied.push(AppliedTax {
            jurisdiction_code: jurisdiction.code.clone(),
            jurisdiction_name: jurisdiction.name.clone(),
            tax_rate_name: rate.name.clone(),
            tax_type: rate.kind,
            rate: rate.rate,
            taxable_amount: taxable_base,
            tax_amount,
            is_compound: rate.compounds(),
        });
    }

    (cumulative_tax, applied)
}

/// Computes taxes for one line item.
///
/// Explicitly exempt items short-circuit before rate iteration and return
/// zero tax with an empty applied-tax list, regardless of configured
/// rates.
pub fn tax_item(
    item: &TaxableItem,
    rates: &[TaxRate],
    ctx: &AccumulationContext<'_>,
) -> TaxedItem {
    if item.is_exempt {
        return TaxedItem {
            item_id: item.item_id.clone(),
            sku: item.sku.clone(),
            subtotal: item.subtotal,
            tax_amount: Decimal::ZERO,
            taxes: Vec::new(),
        };
    }

    let (tax_amount, taxes) = accumulate(item.subtotal, item.quantity, rates, ctx);

    TaxedItem {
        item_id: item.item_id.clone(),
        sku: item.sku.clone(),
        subtotal: item.subtotal,
        tax_amount,
        taxes,
    }
}

/// Computes taxes for the shipping charge.
///
/// Same accumulation algorithm, restricted to rates flagged
/// shipping-taxable, with quantity fixed at 1 and the shipping amount as
/// the base. Callers invoke this only when the shipping amount is
/// non-zero.
pub fn tax_shipping(
    shipping_amount: Decimal,
    rates: &[TaxRate],
    ctx: &AccumulationContext<'_>,
) -> (Decimal, Vec<AppliedTax>) {
    let shipping_rates: Vec<TaxRate> = rates
        .iter()
        .filter(|rate| rate.is_shipping_taxable)
        .cloned()
        .collect();

    accumulate(shipping_amount, 1, &shipping_rates, ctx)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::prepare_rates;
    use crate::types::{test_support, TaxCategory};
    use rust_decimal_macros::dec;

    fn fixture() -> Vec<Jurisdiction> {
        vec![test_support::jurisdiction("US", "United States")]
    }

    fn item(subtotal: Decimal, quantity: i64) -> TaxableItem {
        TaxableItem {
            item_id: "i-1".to_string(),
            sku: "WIDGET".to_string(),
            quantity,
            unit_price: subtotal,
            subtotal,
            tax_category: TaxCategory::General,
            is_exempt: false,
        }
    }

    #[test]
    fn test_single_percentage_rate() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let now = Utc::now();
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now,
        };

        let rates = vec![test_support::percentage_rate(
            "r1",
            "jur-US",
            dec!(0.0825),
            TaxCategory::General,
            1,
        )];

        let taxed = tax_item(&item(dec!(100), 1), &rates, &ctx);
        assert_eq!(taxed.tax_amount, dec!(8.2500));
        assert_eq!(taxed.taxes.len(), 1);
        assert_eq!(taxed.taxes[0].jurisdiction_code, "US");
        assert_eq!(taxed.taxes[0].taxable_amount, dec!(100));
        assert!(!taxed.taxes[0].is_compound);
    }

    #[test]
    fn test_compound_ordering() {
        // A: 5% prio 1 non-compound, B: 2% prio 2 compound, base $100
        // A = $5.00; B base = $105.00, B = $2.10; total $7.10
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let now = Utc::now();
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now,
        };

        let a = test_support::percentage_rate("a", "jur-US", dec!(0.05), TaxCategory::General, 1);
        let mut b =
            test_support::percentage_rate("b", "jur-US", dec!(0.02), TaxCategory::General, 2);
        b.is_compound = true;

        // Deliberately out of order: prepare_rates must sort
        let rates = prepare_rates(vec![b, a], now);
        let (tax, applied) = accumulate(dec!(100), 1, &rates, &ctx);

        assert_eq!(tax, dec!(7.1000));
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].tax_amount, dec!(5.00));
        assert_eq!(applied[0].taxable_amount, dec!(100));
        assert_eq!(applied[1].taxable_amount, dec!(105.00));
        assert_eq!(applied[1].tax_amount, dec!(2.1000));
        assert!(applied[1].is_compound);
    }

    #[test]
    fn test_non_compound_rates_independent_of_order() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let now = Utc::now();
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now,
        };

        let a = test_support::percentage_rate("a", "jur-US", dec!(0.05), TaxCategory::General, 1);
        let b = test_support::percentage_rate("b", "jur-US", dec!(0.02), TaxCategory::General, 2);

        let (tax_ab, _) = accumulate(dec!(100), 1, &[a.clone(), b.clone()], &ctx);
        let (tax_ba, _) = accumulate(dec!(100), 1, &[b, a], &ctx);

        // Each non-compound rate taxes the original subtotal
        assert_eq!(tax_ab, dec!(7.00));
        assert_eq!(tax_ba, tax_ab);
    }

    #[test]
    fn test_flat_rate_multiplies_quantity_only() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let now = Utc::now();
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now,
        };

        let mut flat =
            test_support::percentage_rate("flat", "jur-US", dec!(0.50), TaxCategory::General, 1);
        flat.kind = RateKind::Flat;

        // $0.50 per unit, 3 units; the $1000 base is ignored
        let (tax, applied) = accumulate(dec!(1000), 3, &[flat], &ctx);
        assert_eq!(tax, dec!(1.50));
        assert_eq!(applied[0].tax_type, RateKind::Flat);
    }

    #[test]
    fn test_exempt_item_short_circuits() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now: Utc::now(),
        };

        let rates = vec![test_support::percentage_rate(
            "r1",
            "jur-US",
            dec!(0.0825),
            TaxCategory::General,
            1,
        )];

        let mut exempt_item = item(dec!(100), 1);
        exempt_item.is_exempt = true;

        let taxed = tax_item(&exempt_item, &rates, &ctx);
        assert_eq!(taxed.tax_amount, Decimal::ZERO);
        assert!(taxed.taxes.is_empty());
    }

    #[test]
    fn test_customer_exemption_suppresses_exactly_one_rate() {
        let jurisdictions = vec![
            test_support::jurisdiction("US", "United States"),
            test_support::jurisdiction("US-CA", "California"),
        ];
        let index = JurisdictionIndex::new(&jurisdictions);
        let now = Utc::now();

        let federal =
            test_support::percentage_rate("fed", "jur-US", dec!(0.05), TaxCategory::General, 1);
        let state =
            test_support::percentage_rate("ca", "jur-US-CA", dec!(0.0725), TaxCategory::General, 2);

        let mut exemption = test_support::exemption("e1", "cust-1");
        exemption.jurisdiction_id = Some("jur-US-CA".to_string());
        exemption.category = Some(TaxCategory::General);
        let exemptions = vec![exemption];

        let ctx = AccumulationContext {
            exemptions: &exemptions,
            index: &index,
            now,
        };

        let (tax, applied) = accumulate(dec!(100), 1, &[federal, state], &ctx);

        // Only the federal rate applies; no record for the suppressed one
        assert_eq!(tax, dec!(5.00));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].jurisdiction_code, "US");
    }

    #[test]
    fn test_threshold_filters_against_base() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now: Utc::now(),
        };

        let mut luxury =
            test_support::percentage_rate("lux", "jur-US", dec!(0.10), TaxCategory::General, 1);
        luxury.min_threshold = Some(dec!(500));

        let (below, _) = accumulate(dec!(100), 1, &[luxury.clone()], &ctx);
        assert_eq!(below, Decimal::ZERO);

        let (above, _) = accumulate(dec!(600), 1, &[luxury], &ctx);
        assert_eq!(above, dec!(60.000));
    }

    #[test]
    fn test_shipping_requires_shipping_taxable_flag() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now: Utc::now(),
        };

        let mut taxable =
            test_support::percentage_rate("s1", "jur-US", dec!(0.0825), TaxCategory::Shipping, 1);
        taxable.is_shipping_taxable = true;
        let not_flagged =
            test_support::percentage_rate("s2", "jur-US", dec!(0.0200), TaxCategory::Shipping, 2);

        let (tax, applied) = tax_shipping(dec!(10), &[taxable, not_flagged], &ctx);
        assert_eq!(tax, dec!(0.825000));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].tax_rate_name, "s1 rate");
    }

    #[test]
    fn test_unknown_jurisdiction_rate_is_skipped() {
        let jurisdictions = fixture();
        let index = JurisdictionIndex::new(&jurisdictions);
        let ctx = AccumulationContext {
            exemptions: &[],
            index: &index,
            now: Utc::now(),
        };

        let orphan = test_support::percentage_rate(
            "orphan",
            "jur-unknown",
            dec!(0.05),
            TaxCategory::General,
            1,
        );

        let (tax, applied) = accumulate(dec!(100), 1, &[orphan], &ctx);
        assert_eq!(tax, Decimal::ZERO);
        assert!(applied.is_empty());
    }
}
