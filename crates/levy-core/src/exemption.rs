//! # Exemption Evaluation
//!
//! Determines whether a customer exemption nullifies a specific rate.
//!
//! ## Evaluation Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Exemption Evaluation                                 │
//! │                                                                         │
//! │  For each exemption in the customer's list (empty if no customer):     │
//! │                                                                         │
//! │    active? ── within window? ── jurisdiction matches? ── category?     │
//! │       │             │                   │                    │          │
//! │       └──── any check fails → try next exemption ────────────┘          │
//! │                                                                         │
//! │  FIRST MATCH WINS: the rate is suppressed entirely for that item.      │
//! │  The would-be tax is not added, and no AppliedTax record is emitted    │
//! │  (exemptions are silent, not zero-valued entries).                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exemptions never partially reduce a rate; coverage is all-or-nothing
//! per rate.

use chrono::{DateTime, Utc};

use crate::types::{TaxExemption, TaxRate};

// =============================================================================
// Coverage
// =============================================================================

/// Whether one exemption covers one rate at the given instant.
///
/// Unset jurisdiction/category scopes act as wildcards.
pub fn covers(exemption: &TaxExemption, rate: &TaxRate, now: DateTime<Utc>) -> bool {
    if !exemption.is_active || !exemption.is_effective_at(now) {
        return false;
    }

    if let Some(jurisdiction_id) = &exemption.jurisdiction_id {
        if *jurisdiction_id != rate.jurisdiction_id {
            return false;
        }
    }

    if let Some(category) = exemption.category {
        if category != rate.category {
            return false;
        }
    }

    true
}

/// Whether any exemption in the customer's list suppresses the rate.
///
/// First match wins; with an empty list the rate always applies.
pub fn rate_exempted(exemptions: &[TaxExemption], rate: &TaxRate, now: DateTime<Utc>) -> bool {
    exemptions.iter().any(|e| covers(e, rate, now))
}

// =============================================================================
// Unit Tests
// =============================================================================
