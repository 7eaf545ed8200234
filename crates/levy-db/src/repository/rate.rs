//! # Tax Rate Repository
//!
//! Database operations for tax rates.
//!
//! ## Key Operations
//! - Candidate rate lookup for a set of jurisdictions and a category
//! - Administrative CRUD with configuration invariants enforced on write
//!
//! ## Candidate Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  How Candidate Lookup Works                             │
//! │                                                                         │
//! │  Engine: find_applicable([jur-US, jur-US-CA], general, active_only)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE jurisdiction_id IN (?, ?)                                       │
//! │    AND category = 'general'                                            │
//! │    AND is_active = 1              (when active_only)                   │
//! │  ORDER BY priority, id                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Engine then re-filters by effective window and config invariants;     │
//! │  the store never evaluates dates so a cached query plan stays valid.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_decimal, parse_opt_decimal, parse_opt_timestamp, parse_timestamp, row_bool};
use levy_core::{RateKind, TaxCategory, TaxRate};
use levy_engine::{RepositoryError, RepositoryResult, TaxRateRepository};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw tax rate row as stored in SQLite. Decimals and timestamps are TEXT.
#[derive(Debug, sqlx::FromRow)]
struct TaxRateRow {
    id: String,
    jurisdiction_id: String,
    name: String,
    kind: String,
    rate: String,
    category: String,
    is_compound: i64,
    is_shipping_taxable: i64,
    min_threshold: Option<String>,
    max_threshold: Option<String>,
    priority: i64,
    is_active: i64,
    start_date: Option<String>,
    end_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaxRateRow> for TaxRate {
    type Error = DbError;

    fn try_from(row: TaxRateRow) -> DbResult<TaxRate> {
        let kind = RateKind::parse(&row.kind).ok_or_else(|| DbError::decode("kind", &row.kind))?;
        let category = TaxCategory::parse(&row.category)
            .ok_or_else(|| DbError::decode("category", &row.category))?;

        Ok(TaxRate {
            kind,
            category,
            rate: parse_decimal("rate", &row.rate)?,
            min_threshold: parse_opt_decimal("min_threshold", row.min_threshold.as_deref())?,
            max_threshold: parse_opt_decimal("max_threshold", row.max_threshold.as_deref())?,
            start_date: parse_opt_timestamp("start_date", row.start_date.as_deref())?,
            end_date: parse_opt_timestamp("end_date", row.end_date.as_deref())?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            id: row.id,
            jurisdiction_id: row.jurisdiction_id,
            name: row.name,
            is_compound: row_bool(row.is_compound),
            is_shipping_taxable: row_bool(row.is_shipping_taxable),
            priority: row.priority as i32,
            is_active: row_bool(row.is_active),
        })
    }
}

const RATE_COLUMNS: &str = "id, jurisdiction_id, name, kind, rate, category, is_compound, \
     is_shipping_taxable, min_threshold, max_threshold, priority, is_active, \
     start_date, end_date, created_at, updated_at";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for creating a tax rate. ID and timestamps are generated.
#[derive(Debug, Clone)]
pub struct NewTaxRate {
    pub jurisdiction_id: String,
    pub name: String,
    pub kind: RateKind,
    pub rate: Decimal,
    pub category: TaxCategory,
    pub is_compound: bool,
    pub is_shipping_taxable: bool,
    pub min_threshold: Option<Decimal>,
    pub max_threshold: Option<Decimal>,
    pub priority: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Rejects rate configuration that violates creation invariants.
fn check_config(
    rate: Decimal,
    min_threshold: Option<Decimal>,
    max_threshold: Option<Decimal>,
) -> DbResult<()> {
    if rate < Decimal::ZERO {
        return Err(DbError::invalid_config("rate must be non-negative"));
    }
    if let (Some(min), Some(max)) = (min_threshold, max_threshold) {
        if max < min {
            return Err(DbError::invalid_config(
                "max_threshold must be >= min_threshold",
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Store
// =============================================================================

/// Repository for tax rate database operations.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.rates();
///
/// let candidates = store
///     .find_applicable(&jurisdiction_ids, TaxCategory::General, true)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct TaxRateStore {
    pool: SqlitePool,
}

impl TaxRateStore {
    /// Creates a new TaxRateStore.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRateStore { pool }
    }

    /// Finds candidate rates for a set of jurisdictions and a category.
    ///
    /// ## How It Works
    /// 1. Empty jurisdiction set short-circuits to an empty result
    /// 2. IN-clause over the jurisdiction IDs, index on
    ///    (jurisdiction_id, category, is_active)
    /// 3. Ordered by (priority, id) so the stacking order the engine sees
    ///    is already deterministic
    ///
    /// Effective-window filtering stays in the engine: "now" is the
    /// engine's single per-calculation snapshot, not query time.
    pub async fn find_applicable(
        &self,
        jurisdiction_ids: &[String],
        category: TaxCategory,
        active_only: bool,
    ) -> DbResult<Vec<TaxRate>> {
        if jurisdiction_ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            jurisdictions = jurisdiction_ids.len(),
            category = %category,
            "Fetching candidate rates"
        );

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {RATE_COLUMNS} FROM tax_rates WHERE jurisdiction_id IN ("
        ));
        let mut ids = builder.separated(", ");
        for id in jurisdiction_ids {
            ids.push_bind(id);
        }
        builder.push(") AND category = ");
        builder.push_bind(category.as_str());
        if active_only {
            builder.push(" AND is_active = 1");
        }
        builder.push(" ORDER BY priority, id");

        let rows: Vec<TaxRateRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Candidate rates fetched");

        rows.into_iter().map(TaxRate::try_from).collect()
    }

    /// Gets a rate by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxRate>> {
        let sql = format!("SELECT {RATE_COLUMNS} FROM tax_rates WHERE id = ?1");

        let row: Option<TaxRateRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TaxRate::try_from).transpose()
    }

    /// Lists all rates belonging to a jurisdiction, active or not.
    ///
    /// Administrative listing; the engine never calls this.
    pub async fn list_for_jurisdiction(&self, jurisdiction_id: &str) -> DbResult<Vec<TaxRate>> {
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM tax_rates
             WHERE jurisdiction_id = ?1
             ORDER BY priority, id"
        );

        let rows: Vec<TaxRateRow> = sqlx::query_as(&sql)
            .bind(jurisdiction_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TaxRate::try_from).collect()
    }

    /// Creates a new tax rate.
    ///
    /// ## Errors
    /// * `DbError::InvalidConfig` - Negative rate or inverted thresholds
    /// * `DbError::ForeignKeyViolation` - Unknown jurisdiction
    pub async fn create(&self, new: NewTaxRate) -> DbResult<TaxRate> {
        check_config(new.rate, new.min_threshold, new.max_threshold)?;

        let now = Utc::now();
        let rate = TaxRate {
            id: Uuid::new_v4().to_string(),
            jurisdiction_id: new.jurisdiction_id,
            name: new.name,
            kind: new.kind,
            rate: new.rate,
            category: new.category,
            is_compound: new.is_compound,
            is_shipping_taxable: new.is_shipping_taxable,
            min_threshold: new.min_threshold,
            max_threshold: new.max_threshold,
            priority: new.priority,
            is_active: true,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tax_rates
                 (id, jurisdiction_id, name, kind, rate, category, is_compound,
                  is_shipping_taxable, min_threshold, max_threshold, priority,
                  is_active, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&rate.id)
        .bind(&rate.jurisdiction_id)
        .bind(&rate.name)
        .bind(rate.kind.as_str())
        .bind(rate.rate.to_string())
        .bind(rate.category.as_str())
        .bind(rate.is_compound)
        .bind(rate.is_shipping_taxable)
        .bind(rate.min_threshold.map(|d| d.to_string()))
        .bind(rate.max_threshold.map(|d| d.to_string()))
        .bind(rate.priority)
        .bind(rate.is_active)
        .bind(rate.start_date.map(|d| d.to_rfc3339()))
        .bind(rate.end_date.map(|d| d.to_rfc3339()))
        .bind(rate.created_at.to_rfc3339())
        .bind(rate.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %rate.id, name = %rate.name, "Tax rate created");
        Ok(rate)
    }

    /// Updates a rate's mutable fields.
    ///
    /// The ID, jurisdiction and created_at are immutable; updated_at is
    /// refreshed. Configuration invariants are re-checked.
    pub async fn update(&self, rate: &TaxRate) -> DbResult<()> {
        check_config(rate.rate, rate.min_threshold, rate.max_threshold)?;

        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE tax_rates
             SET name = ?1, kind = ?2, rate = ?3, category = ?4,
                 is_compound = ?5, is_shipping_taxable = ?6,
                 min_threshold = ?7, max_threshold = ?8, priority = ?9,
                 start_date = ?10, end_date = ?11, updated_at = ?12
             WHERE id = ?13",
        )
        .bind(&rate.name)
        .bind(rate.kind.as_str())
        .bind(rate.rate.to_string())
        .bind(rate.category.as_str())
        .bind(rate.is_compound)
        .bind(rate.is_shipping_taxable)
        .bind(rate.min_threshold.map(|d| d.to_string()))
        .bind(rate.max_threshold.map(|d| d.to_string()))
        .bind(rate.priority)
        .bind(rate.start_date.map(|d| d.to_rfc3339()))
        .bind(rate.end_date.map(|d| d.to_rfc3339()))
        .bind(updated_at.to_rfc3339())
        .bind(&rate.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tax rate", &rate.id));
        }
        Ok(())
    }

    /// Activates or deactivates a rate (soft delete).
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE tax_rates SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(active)
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tax rate", id));
        }

        debug!(id = %id, active = active, "Tax rate active flag updated");
        Ok(())
    }
}

// =============================================================================
// Engine Contract
// =============================================================================

#[async_trait]
impl TaxRateRepository for TaxRateStore {
    async fn find_applicable(
        &self,
        jurisdiction_ids: &[String],
        category: TaxCategory,
        active_only: bool,
    ) -> RepositoryResult<Vec<TaxRate>> {
        TaxRateStore::find_applicable(self, jurisdiction_ids, category, active_only)
            .await
            .map_err(|e| RepositoryError::new("find applicable rates", e))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
