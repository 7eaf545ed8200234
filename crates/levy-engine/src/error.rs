//! # Engine Error Types
//!
//! The calculation error taxonomy.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       TaxError Taxonomy                                 │
//! │                                                                         │
//! │  Validation        - caller input malformed; checked before any I/O    │
//! │                      never retried                        → 4xx        │
//! │                                                                         │
//! │  NoApplicable-     - address resolves to zero jurisdictions            │
//! │  Jurisdictions       "not serviceable", distinct from failure → 4xx    │
//! │                                                                         │
//! │  Repository        - infrastructure failure, wrapped with operation    │
//! │                      context; aborts the whole calculation   → 5xx     │
//! │                                                                         │
//! │  Partial results are never returned: a calculation either fully        │
//! │  succeeds or fails as a whole.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::repository::RepositoryError;
use levy_core::ValidationError;

// =============================================================================
// Tax Error
// =============================================================================

/// Errors surfaced by the tax engine's exposed operations.
#[derive(Debug, Error)]
pub enum TaxError {
    /// Malformed request. Raised eagerly, before any repository access.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The destination address matched no active jurisdiction.
    ///
    /// Surfaced distinctly so callers can map it to a "not serviceable"
    /// response rather than a generic failure.
    #[error("no applicable tax jurisdictions for country '{country}'")]
    NoApplicableJurisdictions { country: String },

    /// A repository lookup failed. Propagated unmodified with its
    /// operation context; the engine performs no retry.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TaxError {
    /// Whether the error is the caller's fault (4xx-equivalent) rather
    /// than an infrastructure failure (5xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TaxError::Validation(_) | TaxError::NoApplicableJurisdictions { .. }
        )
    }
}

/// Result type for engine operations.
pub type TaxResult<T> = Result<T, TaxError>;

// =============================================================================
// Unit Tests
// =============================================================================
