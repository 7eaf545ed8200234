//! # Domain Types
//!
//! Core domain types for tax calculation.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Jurisdiction   │   │     TaxRate     │   │  TaxExemption   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  jurisdiction_id│   │  customer_id    │       │
//! │  │  country+filters│   │  kind + rate    │   │  scope filters  │       │
//! │  │  priority       │   │  category       │   │  active window  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Address      │   │    RateKind     │   │  TaxCategory    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  country        │   │  Percentage     │   │  General, Food  │       │
//! │  │  Option filters │   │  Flat           │   │  Clothing, ...  │       │
//! │  │  (wildcards)    │   │  Compound       │   │  Shipping       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Configuration entities have:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (jurisdiction `code`) - human-readable, used in results
//!
//! ## Snapshot Semantics
//! Jurisdictions, rates and exemptions are mutated only through
//! administrative commands, never by the calculation engine. During a
//! calculation they are immutable snapshots; the engine holds no
//! back-references into a mutable store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Address
// =============================================================================

/// A destination address, used only for jurisdiction matching.
///
/// Never mutated after construction. Every field except `country` is
/// optional; jurisdiction filters that are unset act as wildcards against
/// the corresponding field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// ISO country code (e.g., "US"). Required for matching.
    pub country: String,

    /// State or province (e.g., "CA").
    pub state_province: Option<String>,

    /// County (e.g., "Los Angeles").
    pub county: Option<String>,

    /// City (e.g., "San Francisco").
    pub city: Option<String>,

    /// Postal / ZIP code.
    pub postal_code: Option<String>,

    /// Free-text street lines. Ignored by jurisdiction matching.
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Address {
    /// Creates an address carrying only a country.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::Address;
    ///
    /// let address = Address::country_only("US");
    /// assert_eq!(address.country, "US");
    /// assert!(address.state_province.is_none());
    /// ```
    pub fn country_only(country: impl Into<String>) -> Self {
        Address {
            country: country.into(),
            state_province: None,
            county: None,
            city: None,
            postal_code: None,
            lines: Vec::new(),
        }
    }
}

// =============================================================================
// Jurisdiction Type
// =============================================================================

/// The level of a geographic tax authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionType {
    /// National-level authority (e.g., a federal VAT).
    Federal,
    /// State or province.
    State,
    /// County.
    County,
    /// City or municipality.
    City,
    /// Special-purpose district (transit, stadium, etc.).
    District,
}

impl JurisdictionType {
    /// Stable string form, used for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JurisdictionType::Federal => "federal",
            JurisdictionType::State => "state",
            JurisdictionType::County => "county",
            JurisdictionType::City => "city",
            JurisdictionType::District => "district",
        }
    }

    /// Parses the stable string form back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "federal" => Some(JurisdictionType::Federal),
            "state" => Some(JurisdictionType::State),
            "county" => Some(JurisdictionType::County),
            "city" => Some(JurisdictionType::City),
            "district" => Some(JurisdictionType::District),
            _ => None,
        }
    }
}

impl std::fmt::Display for JurisdictionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tax Category
// =============================================================================

/// Classification of a taxable item or charge.
///
/// Used to select applicable rates: a rate configured for `Food` never
/// applies to a `General` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    /// Default category for ordinary goods.
    General,
    /// Groceries / food items (often reduced or zero-rated).
    Food,
    /// Clothing (exempt in some states below a price threshold).
    Clothing,
    /// Digital goods and downloads.
    Digital,
    /// Shipping and handling charges.
    Shipping,
    /// Services.
    Service,
    /// Statutorily exempt goods. Typically carries no configured rates.
    Exempt,
}

impl TaxCategory {
    /// Stable string form, used for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::General => "general",
            TaxCategory::Food => "food",
            TaxCategory::Clothing => "clothing",
            TaxCategory::Digital => "digital",
            TaxCategory::Shipping => "shipping",
            TaxCategory::Service => "service",
            TaxCategory::Exempt => "exempt",
        }
    }

    /// Parses the stable string form back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(TaxCategory::General),
            "food" => Some(TaxCategory::Food),
            "clothing" => Some(TaxCategory::Clothing),
            "digital" => Some(TaxCategory::Digital),
            "shipping" => Some(TaxCategory::Shipping),
            "service" => Some(TaxCategory::Service),
            "exempt" => Some(TaxCategory::Exempt),
            _ => None,
        }
    }
}

impl Default for TaxCategory {
    fn default() -> Self {
        TaxCategory::General
    }
}

impl std::fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Rate Kind
// =============================================================================

/// How a rate's tax amount is computed.
///
/// ## Why a Closed Enum?
/// Rate-kind dispatch is a compile-time-checked exhaustive match, one pure
/// function per kind. Adding a new kind fails to compile until every match
/// site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    /// `taxable_base * rate`, where rate is a fraction (0.0825 = 8.25%).
    Percentage,
    /// `rate * quantity`; ignores the taxable base entirely.
    Flat,
    /// Percentage computed on `subtotal + previously accumulated tax`.
    Compound,
}

impl RateKind {
    /// Stable string form, used for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateKind::Percentage => "percentage",
            RateKind::Flat => "flat",
            RateKind::Compound => "compound",
        }
    }

    /// Parses the stable string form back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(RateKind::Percentage),
            "flat" => Some(RateKind::Flat),
            "compound" => Some(RateKind::Compound),
            _ => None,
        }
    }
}

// =============================================================================
// Jurisdiction
// =============================================================================

/// A geographic tax authority scope with matching rules against an address.
///
/// ## Matching Semantics
/// A jurisdiction matches an address when its country equals the address
/// country AND every *specified* (Some) location filter equals the
/// corresponding address field. Unset filters act as wildcards.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Address: US / CA / Los Angeles / Long Beach / 90802                   │
/// │                                                                         │
/// │  US        (country=US, all filters None)           → MATCH (federal)  │
/// │  US-CA     (country=US, region=CA)                  → MATCH (state)    │
/// │  US-CA-LA  (country=US, region=CA, county=LA)       → MATCH (county)   │
/// │  US-NY     (country=US, region=NY)                  → no match         │
/// │  US-CA-SF  (country=US, region=CA, city=SF)         → no match         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// No tree traversal is needed: matching is attribute-based, not
/// parent/child recursive. `parent_id` records the hierarchy for
/// administration only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Jurisdiction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique and human-readable (e.g., "US-CA").
    /// Appears in applied-tax records and breakdowns.
    pub code: String,

    /// Display name (e.g., "California").
    pub name: String,

    /// Authority level (federal, state, county, city, district).
    pub jurisdiction_type: JurisdictionType,

    /// Optional parent jurisdiction (hierarchy, not used for matching).
    pub parent_id: Option<String>,

    /// ISO country code this jurisdiction belongs to. Always compared.
    pub country: String,

    /// State/province filter; None acts as a wildcard.
    pub region: Option<String>,

    /// County filter; None acts as a wildcard.
    pub county: Option<String>,

    /// City filter; None acts as a wildcard.
    pub city: Option<String>,

    /// Postal-code filter; None acts as a wildcard.
    pub postal_code: Option<String>,

    /// Whether this jurisdiction participates in matching (soft delete).
    pub is_active: bool,

    /// Stacking order relative to other jurisdictions (informational;
    /// rate stacking order is driven by each rate's own priority).
    pub priority: i32,

    /// When the jurisdiction was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the jurisdiction was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Jurisdiction {
    /// Checks whether this jurisdiction applies to an address.
    ///
    /// Pure and deterministic: the same address always yields the same
    /// answer for the same jurisdiction snapshot.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::{Address, Jurisdiction};
    ///
    /// # let mut j = levy_core::test_support::jurisdiction("US", "United States");
    /// j.region = Some("CA".to_string());
    ///
    /// let mut address = Address::country_only("US");
    /// assert!(!j.matches(&address)); // region filter set, address has none
    ///
    /// address.state_province = Some("CA".to_string());
    /// assert!(j.matches(&address));
    /// ```
    pub fn matches(&self, address: &Address) -> bool {
        if self.country != address.country {
            return false;
        }

        filter_matches(&self.region, &address.state_province)
            && filter_matches(&self.county, &address.county)
            && filter_matches(&self.city, &address.city)
            && filter_matches(&self.postal_code, &address.postal_code)
    }
}

/// A specified filter must equal the address field; an unset filter
/// matches anything.
fn filter_matches(filter: &Option<String>, field: &Option<String>) -> bool {
    match filter {
        None => true,
        Some(expected) => field.as_deref() == Some(expected.as_str()),
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// A single tax rate belonging to exactly one jurisdiction.
///
/// ## Invariants
/// - `rate` must be non-negative
/// - If both thresholds are set, `max_threshold >= min_threshold`
///
/// Both are enforced at creation time by the administrative layer. The
/// engine additionally treats any rate violating them as non-applicable
/// rather than failing the calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate {
    /// Unique identifier (UUID v4). Also the deterministic tie-break key
    /// for rates sharing a priority.
    pub id: String,

    /// Owning jurisdiction (UUID).
    pub jurisdiction_id: String,

    /// Display name (e.g., "CA State Sales Tax").
    pub name: String,

    /// How the tax amount is computed.
    pub kind: RateKind,

    /// For percentage/compound kinds: a fraction (0.0825 = 8.25%).
    /// For flat kinds: a currency amount per unit.
    #[ts(as = "String")]
    pub rate: Decimal,

    /// Which item category this rate applies to.
    pub category: TaxCategory,

    /// Percentage rates explicitly flagged compound stack on accumulated
    /// tax even though their kind is `Percentage`.
    pub is_compound: bool,

    /// Whether this rate may be applied to shipping charges.
    pub is_shipping_taxable: bool,

    /// Minimum taxable amount; None = unconstrained.
    #[ts(as = "Option<String>")]
    pub min_threshold: Option<Decimal>,

    /// Maximum taxable amount; None = unconstrained.
    #[ts(as = "Option<String>")]
    pub max_threshold: Option<Decimal>,

    /// Application order within an item: lower priorities apply first.
    pub priority: i32,

    /// Whether this rate is currently enabled (soft delete).
    pub is_active: bool,

    /// Effective start; None = -∞.
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,

    /// Effective end; None = +∞.
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,

    /// When the rate was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the rate was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TaxRate {
    /// Whether this rate stacks on previously accumulated tax.
    ///
    /// True for the dedicated `Compound` kind and for any rate explicitly
    /// flagged compound.
    #[inline]
    pub fn compounds(&self) -> bool {
        matches!(self.kind, RateKind::Compound) || self.is_compound
    }

    /// Whether `now` falls within the rate's effective window.
    ///
    /// Open-ended bounds are treated as -∞ / +∞; bounds are inclusive.
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_date {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if now > end {
                return false;
            }
        }
        true
    }

    /// Whether the rate's configuration satisfies its own invariants.
    ///
    /// A rate with a negative value or inverted thresholds is treated as
    /// non-applicable: such configuration is rejected at creation time,
    /// but the engine must not crash if one slips through.
    pub fn has_valid_config(&self) -> bool {
        if self.rate < Decimal::ZERO {
            return false;
        }
        if let (Some(min), Some(max)) = (self.min_threshold, self.max_threshold) {
            if max < min {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Tax Exemption
// =============================================================================

/// A customer-scoped override that nullifies matching rates.
///
/// ## Coverage Semantics
/// An exemption covers a rate when:
/// - `jurisdiction_id` is unset OR equals the rate's jurisdiction, AND
/// - `category` is unset OR equals the rate's category, AND
/// - the exemption is active and within its effective window.
///
/// Exemptions are all-or-nothing per rate; they never partially reduce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxExemption {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer this exemption belongs to.
    pub customer_id: String,

    /// Optional narrowing to one jurisdiction; None = all jurisdictions.
    pub jurisdiction_id: Option<String>,

    /// Optional narrowing to one category; None = all categories.
    pub category: Option<TaxCategory>,

    /// Whether this exemption is currently enabled.
    pub is_active: bool,

    /// Effective start; None = -∞.
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,

    /// Effective end; None = +∞.
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,

    /// When the exemption was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the exemption was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TaxExemption {
    /// Whether `now` falls within the exemption's effective window.
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_date {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if now > end {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Test Support
// =============================================================================

/// Builders for configuration entities used across unit tests and doctests.
///
/// Not part of the stable API; exposed so levy-engine and levy-db tests
/// can build fixtures without repeating 15-field struct literals.
pub mod test_support {
    use super::*;

    /// A country-wide active jurisdiction with no location filters.
    pub fn jurisdiction(country: &str, name: &str) -> Jurisdiction {
        let now = Utc::now();
        Jurisdiction {
            id: format!("jur-{country}"),
            code: country.to_string(),
            name: name.to_string(),
            jurisdiction_type: JurisdictionType::Federal,
            parent_id: None,
            country: country.to_string(),
            region: None,
            county: None,
            city: None,
            postal_code: None,
            is_active: true,
            priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// An active percentage rate for a jurisdiction.
    pub fn percentage_rate(
        id: &str,
        jurisdiction_id: &str,
        rate: Decimal,
        category: TaxCategory,
        priority: i32,
    ) -> TaxRate {
        let now = Utc::now();
        TaxRate {
            id: id.to_string(),
            jurisdiction_id: jurisdiction_id.to_string(),
            name: format!("{id} rate"),
            kind: RateKind::Percentage,
            rate,
            category,
            is_compound: false,
            is_shipping_taxable: false,
            min_threshold: None,
            max_threshold: None,
            priority,
            is_active: true,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// An active exemption for a customer, unscoped by default.
    pub fn exemption(id: &str, customer_id: &str) -> TaxExemption {
        let now = Utc::now();
        TaxExemption {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            jurisdiction_id: None,
            category: None,
            is_active: true,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn address_us_ca() -> Address {
        Address {
            country: "US".to_string(),
            state_province: Some("CA".to_string()),
            county: Some("Los Angeles".to_string()),
            city: Some("Long Beach".to_string()),
            postal_code: Some("90802".to_string()),
            lines: vec![],
        }
    }

    #[test]
    fn test_jurisdiction_wildcard_matching() {
        let address = address_us_ca();

        // All filters unset: country-wide match
        let federal = test_support::jurisdiction("US", "United States");
        assert!(federal.matches(&address));

        // Region filter set and equal
        let mut state = test_support::jurisdiction("US", "California");
        state.region = Some("CA".to_string());
        assert!(state.matches(&address));

        // Region filter set and different
        let mut other_state = test_support::jurisdiction("US", "New York");
        other_state.region = Some("NY".to_string());
        assert!(!other_state.matches(&address));

        // Wrong country never matches, filters or not
        let foreign = test_support::jurisdiction("CA", "Canada");
        assert!(!foreign.matches(&address));
    }

    #[test]
    fn test_specified_filter_requires_address_field() {
        let mut j = test_support::jurisdiction("US", "Some City");
        j.city = Some("Long Beach".to_string());

        // Address without a city cannot satisfy a city filter
        let bare = Address::country_only("US");
        assert!(!j.matches(&bare));

        assert!(j.matches(&address_us_ca()));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let address = address_us_ca();
        let j = test_support::jurisdiction("US", "United States");
        assert_eq!(j.matches(&address), j.matches(&address));
    }

    #[test]
    fn test_rate_compounds() {
        let mut rate =
            test_support::percentage_rate("r1", "jur-US", dec!(0.05), TaxCategory::General, 1);
        assert!(!rate.compounds());

        rate.is_compound = true;
        assert!(rate.compounds());

        rate.is_compound = false;
        rate.kind = RateKind::Compound;
        assert!(rate.compounds());
    }

    #[test]
    fn test_rate_effective_window() {
        let now = Utc::now();
        let mut rate =
            test_support::percentage_rate("r1", "jur-US", dec!(0.05), TaxCategory::General, 1);

        // Open-ended window: always effective
        assert!(rate.is_effective_at(now));

        rate.start_date = Some(now + Duration::days(1));
        assert!(!rate.is_effective_at(now));

        rate.start_date = Some(now - Duration::days(1));
        rate.end_date = Some(now + Duration::days(1));
        assert!(rate.is_effective_at(now));

        rate.end_date = Some(now - Duration::hours(1));
        assert!(!rate.is_effective_at(now));
    }

    #[test]
    fn test_rate_config_invariants() {
        let mut rate =
            test_support::percentage_rate("r1", "jur-US", dec!(0.05), TaxCategory::General, 1);
        assert!(rate.has_valid_config());

        rate.rate = dec!(-0.01);
        assert!(!rate.has_valid_config());

        rate.rate = dec!(0.05);
        rate.min_threshold = Some(dec!(100));
        rate.max_threshold = Some(dec!(50));
        assert!(!rate.has_valid_config());

        rate.max_threshold = Some(dec!(100));
        assert!(rate.has_valid_config());
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            TaxCategory::General,
            TaxCategory::Food,
            TaxCategory::Clothing,
            TaxCategory::Digital,
            TaxCategory::Shipping,
            TaxCategory::Service,
            TaxCategory::Exempt,
        ] {
            assert_eq!(TaxCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(TaxCategory::parse("luxury"), None);
    }

    #[test]
    fn test_kind_and_type_round_trip() {
        for kind in [RateKind::Percentage, RateKind::Flat, RateKind::Compound] {
            assert_eq!(RateKind::parse(kind.as_str()), Some(kind));
        }
        for jt in [
            JurisdictionType::Federal,
            JurisdictionType::State,
            JurisdictionType::County,
            JurisdictionType::City,
            JurisdictionType::District,
        ] {
            assert_eq!(JurisdictionType::parse(jt.as_str()), Some(jt));
        }
    }
}
