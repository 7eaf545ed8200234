//! # Rate Selection
//!
//! Filters and orders candidate rates before accumulation.
//!
//! ## Selection Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Rate Selection Pipeline                            │
//! │                                                                         │
//! │  Repository fetch (jurisdiction ids + category + active_only)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  prepare_rates(rates, now) ← THIS MODULE                               │
//! │       │                                                                 │
//! │       ├── drop inactive rates                                          │
//! │       ├── drop rates outside [start_date, end_date]                    │
//! │       ├── drop rates with invalid config (defensive)                   │
//! │       └── sort by (priority asc, id asc)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Accumulator applies per-item threshold check against the base         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Rates sort ascending by priority; rates sharing a priority tie-break on
//! their id. The secondary key makes the order deterministic even when the
//! storage layer returns rows in arbitrary order, so identical inputs always
//! produce identical results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::TaxRate;

// =============================================================================
// Filtering & Ordering
// =============================================================================

/// Filters candidate rates to those currently applicable and sorts them
/// into application order.
///
/// The amount-threshold check is *not* applied here: it depends on the
/// item's subtotal and is evaluated per item by the accumulator via
/// [`within_thresholds`].
pub fn prepare_rates(mut rates: Vec<TaxRate>, now: DateTime<Utc>) -> Vec<TaxRate> {
    rates.retain(|rate| rate.is_active && rate.is_effective_at(now) && rate.has_valid_config());
    rates.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    rates
}

/// Checks an amount against a rate's min/max thresholds.
///
/// Open bounds are unconstrained; set bounds are inclusive.
pub fn within_thresholds(rate: &TaxRate, amount: Decimal) -> bool {
    if let Some(min) = rate.min_threshold {
        if amount < min {
            return false;
        }
    }
    if let Some(max) = rate.max_threshold {
        if amount > max {
            return false;
        }
    }
    true
}

// =============================================================================
// Unit Tests
// =============================================================================
