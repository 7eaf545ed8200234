//! # Tax Exemption Repository
//!
//! Database operations for customer tax exemptions.
//!
//! ## Key Operations
//! - Active exemption lookup per customer (engine hot path)
//! - Administrative CRUD (grant, update, revoke)
//!
//! Exemption coverage against individual rates (jurisdiction/category
//! scope, effective window) is evaluated in levy-core; the store only
//! narrows to "active rows for this customer".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_opt_timestamp, parse_timestamp, row_bool};
use levy_core::{TaxCategory, TaxExemption};
use levy_engine::{RepositoryError, RepositoryResult, TaxExemptionRepository};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw exemption row as stored in SQLite.
#[derive(Debug, sqlx::FromRow)]
struct TaxExemptionRow {
    id: String,
    customer_id: String,
    jurisdiction_id: Option<String>,
    category: Option<String>,
    is_active: i64,
    start_date: Option<String>,
    end_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaxExemptionRow> for TaxExemption {
    type Error = DbError;

    fn try_from(row: TaxExemptionRow) -> DbResult<TaxExemption> {
        let category = row
            .category
            .as_deref()
            .map(|c| TaxCategory::parse(c).ok_or_else(|| DbError::decode("category", c)))
            .transpose()?;

        Ok(TaxExemption {
            category,
            start_date: parse_opt_timestamp("start_date", row.start_date.as_deref())?,
            end_date: parse_opt_timestamp("end_date", row.end_date.as_deref())?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            id: row.id,
            customer_id: row.customer_id,
            jurisdiction_id: row.jurisdiction_id,
            is_active: row_bool(row.is_active),
        })
    }
}

const EXEMPTION_COLUMNS: &str = "id, customer_id, jurisdiction_id, category, is_active, \
     start_date, end_date, created_at, updated_at";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for granting an exemption. ID and timestamps are generated.
#[derive(Debug, Clone)]
pub struct NewTaxExemption {
    pub customer_id: String,
    /// None = covers all jurisdictions.
    pub jurisdiction_id: Option<String>,
    /// None = covers all categories.
    pub category: Option<TaxCategory>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Store
// =============================================================================

/// Repository for tax exemption database operations.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.exemptions();
///
/// let exemptions = store.find_active_for_customer("cust-42").await?;
/// ```
#[derive(Debug, Clone)]
pub struct TaxExemptionStore {
    pool: SqlitePool,
}

impl TaxExemptionStore {
    /// Creates a new TaxExemptionStore.
    pub fn new(pool: SqlitePool) -> Self {
        TaxExemptionStore { pool }
    }

    /// Finds the active exemptions for a customer.
    ///
    /// Effective-window evaluation happens in the engine against its
    /// per-calculation snapshot; only the is_active flag is filtered here.
    pub async fn find_active_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<TaxExemption>> {
        debug!(customer_id = %customer_id, "Fetching active exemptions");

        let sql = format!(
            "SELECT {EXEMPTION_COLUMNS} FROM tax_exemptions
             WHERE customer_id = ?1 AND is_active = 1
             ORDER BY created_at, id"
        );

        let rows: Vec<TaxExemptionRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Exemptions fetched");

        rows.into_iter().map(TaxExemption::try_from).collect()
    }

    /// Gets an exemption by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxExemption>> {
        let sql = format!("SELECT {EXEMPTION_COLUMNS} FROM tax_exemptions WHERE id = ?1");

        let row: Option<TaxExemptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TaxExemption::try_from).transpose()
    }

    /// Grants a new exemption.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - Unknown jurisdiction scope
    pub async fn create(&self, new: NewTaxExemption) -> DbResult<TaxExemption> {
        let now = Utc::now();
        let exemption = TaxExemption {
            id: Uuid::new_v4().to_string(),
            customer_id: new.customer_id,
            jurisdiction_id: new.jurisdiction_id,
            category: new.category,
            is_active: true,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tax_exemptions
                 (id, customer_id, jurisdiction_id, category, is_active,
                  start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&exemption.id)
        .bind(&exemption.customer_id)
        .bind(&exemption.jurisdiction_id)
        .bind(exemption.category.map(|c| c.as_str()))
        .bind(exemption.is_active)
        .bind(exemption.start_date.map(|d| d.to_rfc3339()))
        .bind(exemption.end_date.map(|d| d.to_rfc3339()))
        .bind(exemption.created_at.to_rfc3339())
        .bind(exemption.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            id = %exemption.id,
            customer_id = %exemption.customer_id,
            "Exemption granted"
        );
        Ok(exemption)
    }

    /// Updates an exemption's scope and window.
    ///
    /// The ID, customer and created_at are immutable; updated_at is
    /// refreshed.
    pub async fn update(&self, exemption: &TaxExemption) -> DbResult<()> {
        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE tax_exemptions
             SET jurisdiction_id = ?1, category = ?2,
                 start_date = ?3, end_date = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&exemption.jurisdiction_id)
        .bind(exemption.category.map(|c| c.as_str()))
        .bind(exemption.start_date.map(|d| d.to_rfc3339()))
        .bind(exemption.end_date.map(|d| d.to_rfc3339()))
        .bind(updated_at.to_rfc3339())
        .bind(&exemption.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tax exemption", &exemption.id));
        }
        Ok(())
    }

    /// Activates or revokes an exemption (soft delete).
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE tax_exemptions SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(active)
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tax exemption", id));
        }

        debug!(id = %id, active = active, "Exemption active flag updated");
        Ok(())
    }
}

// =============================================================================
// Engine Contract
// =============================================================================

#[async_trait]
impl TaxExemptionRepository for TaxExemptionStore {
    async fn find_active_for_customer(
        &self,
        customer_id: &str,
    ) -> RepositoryResult<Vec<TaxExemption>> {
        TaxExemptionStore::find_active_for_customer(self, customer_id)
            .await
            .map_err(|e| RepositoryError::new("find active exemptions", e))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn grant(customer_id: &str) -> NewTaxExemption {
        NewTaxExemption {
            customer_id: customer_id.to_string(),
            jurisdiction_id: None,
            category: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn test_grant_and_fetch_for_customer() {
        let db = db().await;
        let store = db.exemptions();

        let created = store.create(grant("cust-1")).await.unwrap();
        assert!(created.is_active);

        let mut scoped = grant("cust-1");
        scoped.category = Some(TaxCategory::Food);
        store.create(scoped).await.unwrap();

        store.create(grant("cust-2")).await.unwrap();

        let exemptions = store.find_active_for_customer("cust-1").await.unwrap();
        assert_eq!(exemptions.len(), 2);
        assert!(exemptions.iter().all(|e| e.customer_id == "cust-1"));

        let fetched = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_revoked_exemption_excluded() {
        let db = db().await;
        let store = db.exemptions();

        let created = store.create(grant("cust-1")).await.unwrap();
        store.set_active(&created.id, false).await.unwrap();

        let exemptions = store.find_active_for_customer("cust-1").await.unwrap();
        assert!(exemptions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_customer_has_no_exemptions() {
        let db = db().await;

        let exemptions = db
            .exemptions()
            .find_active_for_customer("nobody")
            .await
            .unwrap();
        assert!(exemptions.is_empty());
    }

    #[tokio::test]
    async fn test_scope_update_round_trip() {
        let db = db().await;
        let store = db.exemptions();

        let mut created = store.create(grant("cust-1")).await.unwrap();
        created.category = Some(TaxCategory::Clothing);
        store.update(&created).await.unwrap();

        let fetched = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.category, Some(TaxCategory::Clothing));
    }
}
