//! # Repository Layer
//!
//! SQLite-backed stores for tax configuration entities.
//!
//! ## Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Repository Pattern                                 │
//! │                                                                         │
//! │  levy-engine (traits)              levy-db (this module)               │
//! │  ────────────────────              ─────────────────────               │
//! │  JurisdictionRepository   ◄───────  JurisdictionStore                  │
//! │  TaxRateRepository        ◄───────  TaxRateStore                       │
//! │  TaxExemptionRepository   ◄───────  TaxExemptionStore                  │
//! │                                                                         │
//! │  Each store also carries the administrative surface the engine         │
//! │  never sees: create / update / set_active.                             │
//! │                                                                         │
//! │  Row structs (TEXT columns) ──TryFrom──► domain types (Decimal, enums) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decimal Storage
//! SQLite has no exact decimal type. Amounts and rates are stored as TEXT
//! and parsed into `rust_decimal::Decimal` at the row boundary; a value
//! that fails to parse surfaces as `DbError::Decode`, never as a silent
//! zero or a float round-trip.

pub mod exemption;
pub mod jurisdiction;
pub mod rate;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Decoding Helpers
// =============================================================================

/// SQLite stores booleans as INTEGER 0/1.
pub(crate) fn row_bool(value: i64) -> bool {
    value != 0
}

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::decode(column, value))
}

/// Parses an optional TEXT decimal column.
pub(crate) fn parse_opt_decimal(column: &str, value: Option<&str>) -> DbResult<Option<Decimal>> {
    value.map(|v| parse_decimal(column, v)).transpose()
}

/// Parses an RFC 3339 TEXT timestamp column into UTC.
pub(crate) fn parse_timestamp(column: &str, value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::decode(column, value))
}

/// Parses an optional RFC 3339 TEXT timestamp column.
pub(crate) fn parse_opt_timestamp(
    column: &str,
    value: Option<&str>,
) -> DbResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(column, v)).transpose()
}

// =============================================================================
// Unit Tests
// =============================================================================
