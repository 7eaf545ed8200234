//! # levy-engine: Tax Calculation Orchestration
//!
//! This crate wires the pure logic in `levy-core` to storage through
//! repository traits and exposes the engine's three public operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Levy Data Flow                                   │
//! │                                                                         │
//! │  Caller (checkout, admin API)                                          │
//! │       │  engine.calculate(request)                                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  levy-engine (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   TaxEngine   │    │  Repository   │    │    Errors    │  │   │
//! │  │   │  (engine.rs)  │───►│    traits     │    │  (TaxError)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ calculate     │    │ Jurisdiction  │    │ Validation   │  │   │
//! │  │   │ estimate_tax  │    │ TaxRate       │    │ NoJurisdict. │  │   │
//! │  │   │ validate_addr │    │ TaxExemption  │    │ Repository   │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │     levy-core (pure)      levy-db (sqlx impls)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - `TaxEngine` and the orchestration of a calculation
//! - [`repository`] - Read-only repository contracts + `RepositoryError`
//! - [`error`] - `TaxError` taxonomy (client vs infrastructure)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use levy_engine::TaxEngine;
//! use std::sync::Arc;
//!
//! let engine = TaxEngine::new(jurisdictions, rates, exemptions);
//!
//! let result = engine.calculate(&request).await?;
//! println!("total tax: {}", result.total_tax);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::TaxEngine;
pub use error::{TaxError, TaxResult};
pub use repository::{
    JurisdictionRepository, RepositoryError, RepositoryResult, TaxExemptionRepository,
    TaxRateRepository,
};
