//! # levy-core: Pure Tax Calculation Logic
//!
//! This crate is the **heart** of Levy. It contains all tax calculation
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Levy Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (checkout, admin, API)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  levy-engine (orchestration)                    │   │
//! │  │      Calculate / EstimateTax / ValidateAddress + repos          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ levy-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐    │   │
//! │  │   │  types   │ │  rates   │ │ exemption │ │ accumulator  │    │   │
//! │  │   │ matching │ │ ordering │ │ coverage  │ │ compounding  │    │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘    │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐                     │   │
//! │  │   │ request  │ │  result  │ │ validation│                     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Address, Jurisdiction, TaxRate, TaxExemption)
//! - [`request`] / [`result`] - Wire DTOs and the result aggregator
//! - [`rates`] - Rate filtering and deterministic ordering
//! - [`exemption`] - Customer exemption coverage
//! - [`accumulator`] - Per-item and shipping tax accumulation
//! - [`validation`] - Request precondition checks
//! - [`error`] - Validation error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: All monetary values and rates are `rust_decimal::Decimal`
//!    (never floating point - compounding and thresholds must be exact)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Snapshots In, Records Out**: configuration entities are immutable
//!    during a calculation; results are immutable once finalized
//!
//! ## Example Usage
//!
//! ```rust
//! use levy_core::accumulator::{accumulate, AccumulationContext, JurisdictionIndex};
//! use levy_core::rates::prepare_rates;
//! use levy_core::test_support;
//! use levy_core::TaxCategory;
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let jurisdictions = vec![test_support::jurisdiction("US", "United States")];
//! let rate = test_support::percentage_rate(
//!     "r1", "jur-US", Decimal::from_str("0.0825").unwrap(), TaxCategory::General, 1,
//! );
//!
//! let now = chrono::Utc::now();
//! let index = JurisdictionIndex::new(&jurisdictions);
//! let ctx = AccumulationContext { exemptions: &[], index: &index, now };
//!
//! let rates = prepare_rates(vec![rate], now);
//! let (tax, applied) = accumulate(Decimal::from(100), 1, &rates, &ctx);
//!
//! // $100.00 at 8.25% = $8.25
//! assert_eq!(tax, Decimal::from_str("8.25").unwrap());
//! assert_eq!(applied.len(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accumulator;
pub mod error;
pub mod exemption;
pub mod rates;
pub mod request;
pub mod result;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use levy_core::TaxRate` instead of
// `use levy_core::types::TaxRate`

pub use error::{ValidationError, ValidationResult};
pub use request::{TaxCalculationRequest, TaxableItem};
pub use result::{AppliedTax, ResultAggregator, TaxBreakdown, TaxCalculationResult, TaxedItem};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items accepted in a single calculation request.
///
/// ## Business Reason
/// Bounds worst-case work per request (each item triggers a rate fetch
/// and an accumulation pass). Can be made configurable per tenant later.
pub const MAX_LINE_ITEMS: usize = 500;
