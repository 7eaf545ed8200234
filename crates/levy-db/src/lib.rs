//! # levy-db: Database Layer for Levy
//!
//! This crate provides database access for the Levy tax engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Levy Data Flow                                  │
//! │                                                                         │
//! │  TaxEngine (levy-engine)                                               │
//! │       │  via repository traits                                         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      levy-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │     Stores     │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/)  │   │  (embedded)  │  │   │
//! │  │   │               │    │                │   │              │  │   │
//! │  │   │ SqlitePool    │    │ Jurisdiction   │   │ 001_init.sql │  │   │
//! │  │   │ Connection    │◄───│ TaxRate        │   │ ...          │  │   │
//! │  │   │ Management    │    │ TaxExemption   │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (levy.db, WAL mode)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Store implementations (jurisdiction, rate, exemption)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use levy_db::{Database, DbConfig};
//! use levy_engine::TaxEngine;
//! use std::sync::Arc;
//!
//! let db = Database::new(DbConfig::new("path/to/levy.db")).await?;
//!
//! let engine = TaxEngine::new(
//!     Arc::new(db.jurisdictions()),
//!     Arc::new(db.rates()),
//!     Arc::new(db.exemptions()),
//! );
//!
//! let result = engine.calculate(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Store re-exports for convenience
pub use repository::exemption::{NewTaxExemption, TaxExemptionStore};
pub use repository::jurisdiction::{JurisdictionStore, NewJurisdiction};
pub use repository::rate::{NewTaxRate, TaxRateStore};

// =============================================================================
// Engine Integration Tests
// =============================================================================
