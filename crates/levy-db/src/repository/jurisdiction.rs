//! # Jurisdiction Repository
//!
//! Database operations for jurisdictions.
//!
//! ## Key Operations
//! - Address-based jurisdiction resolution (the hot path)
//! - Administrative CRUD (create, update, activate/deactivate)
//!
//! ## Address Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               How Address Resolution Works                              │
//! │                                                                         │
//! │  Address: US / CA / Los Angeles / Long Beach / 90802                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE country = 'US' AND is_active = 1                                │
//! │    AND (region      IS NULL OR region      = 'CA')                     │
//! │    AND (county      IS NULL OR county      = 'Los Angeles')            │
//! │    AND (city        IS NULL OR city        = 'Long Beach')             │
//! │    AND (postal_code IS NULL OR postal_code = '90802')                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  US (federal) ✓   US-CA (state) ✓   US-NY ✗   US-CA-SF ✗              │
//! │                                                                         │
//! │  NULL filter columns act as wildcards - the same semantics as          │
//! │  Jurisdiction::matches, pushed into the index scan.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_timestamp, row_bool};
use levy_core::{Address, Jurisdiction, JurisdictionType};
use levy_engine::{JurisdictionRepository, RepositoryError, RepositoryResult};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw jurisdiction row as stored in SQLite.
#[derive(Debug, sqlx::FromRow)]
struct JurisdictionRow {
    id: String,
    code: String,
    name: String,
    jurisdiction_type: String,
    parent_id: Option<String>,
    country: String,
    region: Option<String>,
    county: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    is_active: i64,
    priority: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<JurisdictionRow> for Jurisdiction {
    type Error = DbError;

    fn try_from(row: JurisdictionRow) -> DbResult<Jurisdiction> {
        let jurisdiction_type = JurisdictionType::parse(&row.jurisdiction_type)
            .ok_or_else(|| DbError::decode("jurisdiction_type", &row.jurisdiction_type))?;

        Ok(Jurisdiction {
            jurisdiction_type,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            id: row.id,
            code: row.code,
            name: row.name,
            parent_id: row.parent_id,
            country: row.country,
            region: row.region,
            county: row.county,
            city: row.city,
            postal_code: row.postal_code,
            is_active: row_bool(row.is_active),
            priority: row.priority as i32,
        })
    }
}

const JURISDICTION_COLUMNS: &str = "id, code, name, jurisdiction_type, parent_id, country, \
     region, county, city, postal_code, is_active, priority, created_at, updated_at";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for creating a jurisdiction. ID and timestamps are generated.
#[derive(Debug, Clone)]
pub struct NewJurisdiction {
    pub code: String,
    pub name: String,
    pub jurisdiction_type: JurisdictionType,
    pub parent_id: Option<String>,
    pub country: String,
    pub region: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub priority: i32,
}

// =============================================================================
// Store
// =============================================================================

/// Repository for jurisdiction database operations.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.jurisdictions();
///
/// let matched = store
///     .find_by_address("US", Some("CA"), None, None, None)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct JurisdictionStore {
    pool: SqlitePool,
}

impl JurisdictionStore {
    /// Creates a new JurisdictionStore.
    pub fn new(pool: SqlitePool) -> Self {
        JurisdictionStore { pool }
    }

    /// Finds the active jurisdictions matching an address.
    ///
    /// ## How It Works
    /// 1. Index scan on (country, is_active)
    /// 2. NULL filter columns pass unconditionally (wildcards)
    /// 3. Specified filter columns must equal the address field; a
    ///    specified filter never matches a missing address field
    /// 4. Ordered by priority, then code, for deterministic output
    ///
    /// ## Arguments
    /// * `country` - ISO country code, always compared
    /// * `region` / `county` / `city` / `postal_code` - optional address
    ///   fields; `None` means the address does not carry that field
    pub async fn find_by_address(
        &self,
        country: &str,
        region: Option<&str>,
        county: Option<&str>,
        city: Option<&str>,
        postal_code: Option<&str>,
    ) -> DbResult<Vec<Jurisdiction>> {
        debug!(country = %country, "Resolving jurisdictions for address");

        // A NULL bind makes `column = ?` false, so a specified filter
        // column only survives when the address field equals it.
        let sql = format!(
            "SELECT {JURISDICTION_COLUMNS}
             FROM jurisdictions
             WHERE country = ?1
               AND is_active = 1
               AND (region IS NULL OR region = ?2)
               AND (county IS NULL OR county = ?3)
               AND (city IS NULL OR city = ?4)
               AND (postal_code IS NULL OR postal_code = ?5)
             ORDER BY priority, code"
        );

        let rows: Vec<JurisdictionRow> = sqlx::query_as(&sql)
            .bind(country)
            .bind(region)
            .bind(county)
            .bind(city)
            .bind(postal_code)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Address resolved to jurisdictions");

        rows.into_iter().map(Jurisdiction::try_from).collect()
    }

    /// Gets a jurisdiction by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Jurisdiction))` - Found
    /// * `Ok(None)` - No such jurisdiction
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Jurisdiction>> {
        let sql = format!("SELECT {JURISDICTION_COLUMNS} FROM jurisdictions WHERE id = ?1");

        let row: Option<JurisdictionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Jurisdiction::try_from).transpose()
    }

    /// Gets a jurisdiction by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Jurisdiction>> {
        let sql = format!("SELECT {JURISDICTION_COLUMNS} FROM jurisdictions WHERE code = ?1");

        let row: Option<JurisdictionRow> = sqlx::query_as(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Jurisdiction::try_from).transpose()
    }

    /// Creates a new jurisdiction.
    ///
    /// Generates the UUID and timestamps; new jurisdictions start active.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - Code already in use
    pub async fn create(&self, new: NewJurisdiction) -> DbResult<Jurisdiction> {
        let now = Utc::now();
        let jurisdiction = Jurisdiction {
            id: Uuid::new_v4().to_string(),
            code: new.code,
            name: new.name,
            jurisdiction_type: new.jurisdiction_type,
            parent_id: new.parent_id,
            country: new.country,
            region: new.region,
            county: new.county,
            city: new.city,
            postal_code: new.postal_code,
            is_active: true,
            priority: new.priority,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO jurisdictions
                 (id, code, name, jurisdiction_type, parent_id, country,
                  region, county, city, postal_code, is_active, priority,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&jurisdiction.id)
        .bind(&jurisdiction.code)
        .bind(&jurisdiction.name)
        .bind(jurisdiction.jurisdiction_type.as_str())
        .bind(&jurisdiction.parent_id)
        .bind(&jurisdiction.country)
        .bind(&jurisdiction.region)
        .bind(&jurisdiction.county)
        .bind(&jurisdiction.city)
        .bind(&jurisdiction.postal_code)
        .bind(jurisdiction.is_active)
        .bind(jurisdiction.priority)
        .bind(jurisdiction.created_at.to_rfc3339())
        .bind(jurisdiction.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %jurisdiction.id, code = %jurisdiction.code, "Jurisdiction created");
        Ok(jurisdiction)
    }

    /// Updates a jurisdiction's mutable fields.
    ///
    /// The ID, code and created_at are immutable; updated_at is refreshed.
    pub async fn update(&self, jurisdiction: &Jurisdiction) -> DbResult<()> {
        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE jurisdictions
             SET name = ?1, jurisdiction_type = ?2, parent_id = ?3,
                 country = ?4, region = ?5, county = ?6, city = ?7,
                 postal_code = ?8, priority = ?9, updated_at = ?10
             WHERE id = ?11",
        )
        .bind(&jurisdiction.name)
        .bind(jurisdiction.jurisdiction_type.as_str())
        .bind(&jurisdiction.parent_id)
        .bind(&jurisdiction.country)
        .bind(&jurisdiction.region)
        .bind(&jurisdiction.county)
        .bind(&jurisdiction.city)
        .bind(&jurisdiction.postal_code)
        .bind(jurisdiction.priority)
        .bind(updated_at.to_rfc3339())
        .bind(&jurisdiction.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("jurisdiction", &jurisdiction.id));
        }
        Ok(())
    }

    /// Activates or deactivates a jurisdiction (soft delete).
    ///
    /// Deactivated jurisdictions drop out of address resolution; existing
    /// calculation results referencing their codes are unaffected.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE jurisdictions SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(active)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("jurisdiction", id));
        }

        debug!(id = %id, active = active, "Jurisdiction active flag updated");
        Ok(())
    }
}

// =============================================================================
// Engine Contract
// =============================================================================

#[async_trait]
impl JurisdictionRepository for JurisdictionStore {
    async fn find_by_address(&self, address: &Address) -> RepositoryResult<Vec<Jurisdiction>> {
        JurisdictionStore::find_by_address(
            self,
            &address.country,
            address.state_province.as_deref(),
            address.county.as_deref(),
            address.city.as_deref(),
            address.postal_code.as_deref(),
        )
        .await
        .map_err(|e| RepositoryError::new("find jurisdictions by address", e))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
