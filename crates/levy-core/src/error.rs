//! # Error Types
//!
//! Domain-specific error types for levy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  levy-core errors (this file)                                          │
//! │  └── ValidationError  - Request input validation failures              │
//! │                                                                         │
//! │  levy-engine errors (separate crate)                                   │
//! │  ├── TaxError         - Calculation failures (wraps ValidationError)   │
//! │  └── RepositoryError  - Lookup failures with operation context         │
//! │                                                                         │
//! │  levy-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → TaxError → caller maps to 4xx/5xx             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, limits)
//! 3. Errors are enum variants, never String
//! 4. Validation errors are raised before any repository access

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Request input validation errors.
///
/// These errors occur when a calculation request doesn't meet requirements.
/// They are checked eagerly, before any repository lookup, and are never
/// retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    ///
    /// ## When This Occurs
    /// - Shipping address has an empty country
    /// - An item is missing its identifier
    #[error("{field} is required")]
    Required { field: String },

    /// A numeric value that must be non-negative is negative.
    ///
    /// ## When This Occurs
    /// - Item quantity or unit price below zero
    /// - Negative subtotal or shipping amount
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// The request carries no line items.
    ///
    /// A tax calculation over zero items is meaningless; callers should
    /// not invoke the engine for empty carts.
    #[error("request must contain at least one item")]
    NoItems,

    /// The request carries more line items than the engine accepts.
    #[error("request cannot contain more than {max} items")]
    TooManyItems { max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "shipping address country".to_string(),
        };
        assert_eq!(err.to_string(), "shipping address country is required");

        let err = ValidationError::Negative {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must not be negative");

        let err = ValidationError::TooManyItems { max: 500 };
        assert_eq!(err.to_string(), "request cannot contain more than 500 items");
    }
}
