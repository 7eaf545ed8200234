//! # Repository Contracts
//!
//! Read-only collaborator contracts consumed by the engine.
//!
//! ## Contract View
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Engine-Side Repository View                           │
//! │                                                                         │
//! │  JurisdictionRepository                                                │
//! │  └── find_by_address(address) → [Jurisdiction]                         │
//! │                                                                         │
//! │  TaxRateRepository                                                     │
//! │  └── find_applicable(jurisdiction_ids, category, active_only)          │
//! │                                     → [TaxRate]                        │
//! │                                                                         │
//! │  TaxExemptionRepository                                                │
//! │  └── find_active_for_customer(customer_id) → [TaxExemption]            │
//! │                                                                         │
//! │  The engine only READS through these traits. Administrative mutation   │
//! │  (create/update/activate/deactivate) lives behind the storage layer    │
//! │  and never passes through the engine.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must be safe for concurrent reads; the engine runs
//! independent calculations concurrently and holds no locks of its own.

use async_trait::async_trait;
use thiserror::Error;

use levy_core::{Address, Jurisdiction, TaxCategory, TaxExemption, TaxRate};

// =============================================================================
// Repository Error
// =============================================================================

/// A repository failure wrapped with operation context.
///
/// The engine propagates these unmodified - no retry, no partial
/// recovery. A failed rate lookup aborts the whole calculation rather
/// than silently assuming zero tax.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct RepositoryError {
    /// The operation that failed (e.g., "find applicable rates").
    operation: String,
    /// The underlying storage error.
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl RepositoryError {
    /// Wraps a storage error with the name of the failed operation.
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RepositoryError {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

// =============================================================================
// Repository Traits
// =============================================================================

/// Lookup of jurisdictions applicable to an address.
#[async_trait]
pub trait JurisdictionRepository: Send + Sync {
    /// Returns the active jurisdictions whose location filters all match
    /// the address. An empty result is not an error here; the engine
    /// decides how to treat it per operation.
    async fn find_by_address(&self, address: &Address) -> RepositoryResult<Vec<Jurisdiction>>;
}

/// Lookup of candidate tax rates.
#[async_trait]
pub trait TaxRateRepository: Send + Sync {
    /// Returns candidate rates for the given jurisdictions and category.
    /// With `active_only`, inactive rates are excluded at the source; the
    /// engine re-filters defensively either way.
    async fn find_applicable(
        &self,
        jurisdiction_ids: &[String],
        category: TaxCategory,
        active_only: bool,
    ) -> RepositoryResult<Vec<TaxRate>>;
}

/// Lookup of customer exemptions.
#[async_trait]
pub trait TaxExemptionRepository: Send + Sync {
    /// Returns the active exemptions for a customer; empty if none.
    async fn find_active_for_customer(
        &self,
        customer_id: &str,
    ) -> RepositoryResult<Vec<TaxExemption>>;
}

// =============================================================================
// Unit Tests
// =============================================================================
