//! # Tax Engine
//!
//! Top-level orchestration of a tax calculation.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Calculate Flow                                   │
//! │                                                                         │
//! │  TaxCalculationRequest                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. validate_request()        ← fail fast, BEFORE any I/O              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. resolve jurisdictions     ← empty set → NoApplicableJurisdictions  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. load customer exemptions  ← empty list when no customer id         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. per item: fetch rates by category → prepare → accumulate           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. shipping > 0? fetch SHIPPING rates → shipping accumulation         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  6. record jurisdictions used → finalize result                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//! The engine is a pure, synchronous computation over data fetched from
//! the repositories; there is no internal concurrency, locking, or shared
//! mutable state during a single calculation. Repository calls are the
//! only suspension points. Independent calculations may run concurrently
//! provided the repositories support concurrent reads. The engine imposes
//! no timeouts of its own; callers own the deadline on repository calls.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use levy_core::accumulator::{tax_item, tax_shipping, AccumulationContext, JurisdictionIndex};
use levy_core::rates::prepare_rates;
use levy_core::validation::{validate_address, validate_request};
use levy_core::{
    Address, RateKind, ResultAggregator, TaxCalculationRequest, TaxCalculationResult, TaxCategory,
    TaxExemption,
};

use crate::error::{TaxError, TaxResult};
use crate::repository::{JurisdictionRepository, TaxExemptionRepository, TaxRateRepository};

// =============================================================================
// Tax Engine
// =============================================================================

/// The tax calculation engine.
///
/// Holds shared handles to the three read-only repositories and exposes
/// the three public operations. Cloning is cheap; the engine itself is
/// stateless between calls.
#[derive(Clone)]
pub struct TaxEngine {
    jurisdictions: Arc<dyn JurisdictionRepository>,
    rates: Arc<dyn TaxRateRepository>,
    exemptions: Arc<dyn TaxExemptionRepository>,
}

impl TaxEngine {
    /// Creates an engine over the given repositories.
    pub fn new(
        jurisdictions: Arc<dyn JurisdictionRepository>,
        rates: Arc<dyn TaxRateRepository>,
        exemptions: Arc<dyn TaxExemptionRepository>,
    ) -> Self {
        TaxEngine {
            jurisdictions,
            rates,
            exemptions,
        }
    }

    /// Calculates taxes for a complete request.
    ///
    /// Either fully succeeds or fails as a whole; partial results are
    /// never returned. Identical requests over identical configuration
    /// snapshots yield identical results (only `calculated_at` differs
    /// across invocations).
    pub async fn calculate(
        &self,
        request: &TaxCalculationRequest,
    ) -> TaxResult<TaxCalculationResult> {
        // 1. Fail fast, before any repository access.
        validate_request(request)?;

        // One time snapshot drives every effective-window check in this
        // calculation, including `calculated_at`.
        let now = Utc::now();

        // 2. Resolve jurisdictions for the shipping address.
        let jurisdictions = self.resolve(&request.shipping_address).await?;
        if jurisdictions.is_empty() {
            return Err(TaxError::NoApplicableJurisdictions {
                country: request.shipping_address.country.clone(),
            });
        }

        let jurisdiction_ids: Vec<String> =
            jurisdictions.iter().map(|j| j.id.clone()).collect();
        let jurisdiction_codes: Vec<String> =
            jurisdictions.iter().map(|j| j.code.clone()).collect();
        debug!(
            codes = ?jurisdiction_codes,
            "resolved jurisdictions for shipping address"
        );

        // 3. Load exemptions when a customer is identified.
        let exemptions: Vec<TaxExemption> = match &request.customer_id {
            Some(customer_id) => {
                self.exemptions
                    .find_active_for_customer(customer_id)
                    .await?
            }
            None => Vec::new(),
        };

        let index = JurisdictionIndex::new(&jurisdictions);
        let ctx = AccumulationContext {
            exemptions: &exemptions,
            index: &index,
            now,
        };

        let mut aggregator = ResultAggregator::new(request.order_id.clone());

        // 4. Accumulate per item, preserving request order.
        for item in &request.items {
            let candidates = self
                .rates
                .find_applicable(&jurisdiction_ids, item.tax_category, true)
                .await?;
            let rates = prepare_rates(candidates, now);

            let taxed = tax_item(item, &rates, &ctx);
            debug!(
                item_id = %taxed.item_id,
                tax = %taxed.tax_amount,
                applied = taxed.taxes.len(),
                "accumulated item tax"
            );
            aggregator.add_item(taxed);
        }

        // 5. Shipping is taxed only when a charge exists.
        if request.shipping_amount > Decimal::ZERO {
            let candidates = self
                .rates
                .find_applicable(&jurisdiction_ids, TaxCategory::Shipping, true)
                .await?;
            let rates = prepare_rates(candidates, now);

            let (shipping_tax, shipping_taxes) =
                tax_shipping(request.shipping_amount, &rates, &ctx);
            debug!(tax = %shipping_tax, "accumulated shipping tax");
            aggregator.set_shipping(request.shipping_amount, shipping_tax, shipping_taxes);
        }

        // 6. Record the resolved set and finalize once.
        aggregator.set_jurisdictions_used(jurisdiction_codes);
        let result = aggregator.finalize(&jurisdictions, now);
        debug!(
            total_tax = %result.total_tax,
            effective_rate = %result.effective_tax_rate,
            "calculation finalized"
        );

        Ok(result)
    }

    /// Fast, non-authoritative tax preview.
    ///
    /// Only the GENERAL category is considered; rates are summed without
    /// compounding or exemption handling. Returns zero when the address
    /// resolves to no jurisdiction instead of failing.
    pub async fn estimate_tax(&self, address: &Address, subtotal: Decimal) -> TaxResult<Decimal> {
        let jurisdictions = self.resolve(address).await?;
        if jurisdictions.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let jurisdiction_ids: Vec<String> =
            jurisdictions.iter().map(|j| j.id.clone()).collect();
        let now = Utc::now();

        let candidates = self
            .rates
            .find_applicable(&jurisdiction_ids, TaxCategory::General, true)
            .await?;

        let estimate = prepare_rates(candidates, now)
            .iter()
            .map(|rate| match rate.kind {
                RateKind::Percentage | RateKind::Compound => subtotal * rate.rate,
                RateKind::Flat => rate.rate,
            })
            .sum();

        debug!(%subtotal, %estimate, "estimated tax");
        Ok(estimate)
    }

    /// Whether at least one active jurisdiction resolves for the address.
    pub async fn validate_address(&self, address: &Address) -> TaxResult<bool> {
        if validate_address(address).is_err() {
            return Ok(false);
        }

        let jurisdictions = self.resolve(address).await?;
        Ok(!jurisdictions.is_empty())
    }

    /// Resolves the active jurisdictions matching an address.
    ///
    /// The repository does the location filtering at the source; the
    /// result is re-checked here so that the engine's matching semantics
    /// hold regardless of the storage implementation.
    async fn resolve(&self, address: &Address) -> TaxResult<Vec<levy_core::Jurisdiction>> {
        let mut jurisdictions = self.jurisdictions.find_by_address(address).await?;
        jurisdictions.retain(|j| j.is_active && j.matches(address));
        Ok(jurisdictions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::repository::{RepositoryError, RepositoryResult};
    use levy_core::{test_support, Jurisdiction, TaxRate, TaxableItem};

    /// In-memory configuration snapshot implementing all three
    /// repository contracts.
    #[derive(Default)]
    struct FakeRepos {
        jurisdictions: Vec<Jurisdiction>,
        rates: Vec<TaxRate>,
        exemptions: Vec<TaxExemption>,
        fail_rates: bool,
    }

    #[async_trait]
    impl JurisdictionRepository for FakeRepos {
        async fn find_by_address(
            &self,
            address: &Address,
        ) -> RepositoryResult<Vec<Jurisdiction>> {
            Ok(self
                .jurisdictions
                .iter()
                .filter(|j| j.is_active && j.matches(address))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl TaxRateRepository for FakeRepos {
        async fn find_applicable(
            &self,
            jurisdiction_ids: &[String],
            category: TaxCategory,
            active_only: bool,
        ) -> RepositoryResult<Vec<TaxRate>> {
            if self.fail_rates {
                let inner = std::io::Error::new(std::io::ErrorKind::Other, "storage offline");
                return Err(RepositoryError::new("find applicable rates", inner));
            }
            Ok(self
                .rates
                .iter()
                .filter(|r| {
                    jurisdiction_ids.contains(&r.jurisdiction_id)
                        && r.category == category
                        && (!active_only || r.is_active)
                })
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl TaxExemptionRepository for FakeRepos {
        async fn find_active_for_customer(
            &self,
            customer_id: &str,
        ) -> RepositoryResult<Vec<TaxExemption>> {
            Ok(self
                .exemptions
                .iter()
                .filter(|e| e.customer_id == customer_id && e.is_active)
                .cloned()
                .collect())
        }
    }

    fn engine(repos: FakeRepos) -> TaxEngine {
        let shared = Arc::new(repos);
        TaxEngine::new(shared.clone(), shared.clone(), shared)
    }

    fn us_ca_fixture() -> FakeRepos {
        let federal = test_support::jurisdiction("US", "United States");
        let mut state = test_support::jurisdiction("US-CA", "California");
        state.country = "US".to_string();
        state.region = Some("CA".to_string());

        FakeRepos {
            jurisdictions: vec![federal, state],
            ..Default::default()
        }
    }

    fn address_us_ca() -> Address {
        let mut address = Address::country_only("US");
        address.state_province = Some("CA".to_string());
        address
    }

    fn item(id: &str, subtotal: Decimal, category: TaxCategory) -> TaxableItem {
        TaxableItem {
            item_id: id.to_string(),
            sku: format!("SKU-{id}"),
            quantity: 1,
            unit_price: subtotal,
            subtotal,
            tax_category: category,
            is_exempt: false,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_shipping() {
        // US/CA, one $100 GENERAL item, 8.25% non-compound rate, $10
        // shipping with a shipping-taxable copy of the same rate.
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "general",
            "jur-US-CA",
            dec!(0.0825),
            TaxCategory::General,
            1,
        ));
        let mut shipping_rate = test_support::percentage_rate(
            "shipping",
            "jur-US-CA",
            dec!(0.0825),
            TaxCategory::Shipping,
            1,
        );
        shipping_rate.is_shipping_taxable = true;
        repos.rates.push(shipping_rate);

        let mut request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![item("a", dec!(100), TaxCategory::General)],
        );
        request.shipping_amount = dec!(10);

        let result = engine(repos).calculate(&request).await.unwrap();

        assert_eq!(result.items[0].tax_amount, dec!(8.25));
        assert_eq!(result.shipping_tax, dec!(0.825));
        assert_eq!(result.total_tax, dec!(9.075));
        assert_eq!(result.subtotal, dec!(100));
        assert_eq!(result.total_amount, dec!(119.075));
        assert_eq!(result.jurisdictions_used, vec!["US", "US-CA"]);

        // Aggregation identity
        let breakdown_sum: Decimal = result
            .breakdowns
            .iter()
            .map(|b| b.total_tax_amount)
            .sum();
        assert_eq!(breakdown_sum, result.total_tax);
    }

    #[tokio::test]
    async fn test_unconfigured_country_fails_calculate_but_estimates_zero() {
        let repos = us_ca_fixture();
        let engine = engine(repos);

        let request = TaxCalculationRequest::new(
            Address::country_only("ZZ"),
            vec![item("a", dec!(100), TaxCategory::General)],
        );
        let err = engine.calculate(&request).await.unwrap_err();
        assert!(matches!(err, TaxError::NoApplicableJurisdictions { .. }));
        assert!(err.is_client_error());

        let estimate = engine
            .estimate_tax(&Address::country_only("ZZ"), dec!(100))
            .await
            .unwrap();
        assert_eq!(estimate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_validation_runs_before_repositories() {
        // The rate repository is rigged to fail, but an invalid request
        // must error out before it is ever called.
        let mut repos = us_ca_fixture();
        repos.fail_rates = true;
        let engine = engine(repos);

        let request = TaxCalculationRequest::new(address_us_ca(), vec![]);
        let err = engine.calculate(&request).await.unwrap_err();
        assert!(matches!(err, TaxError::Validation(_)));
    }

    #[tokio::test]
    async fn test_repository_failure_aborts_whole_calculation() {
        let mut repos = us_ca_fixture();
        repos.fail_rates = true;
        let engine = engine(repos);

        let request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![item("a", dec!(100), TaxCategory::General)],
        );
        let err = engine.calculate(&request).await.unwrap_err();
        assert!(matches!(err, TaxError::Repository(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_customer_exemption_suppresses_scoped_rate() {
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "fed",
            "jur-US",
            dec!(0.05),
            TaxCategory::General,
            1,
        ));
        repos.rates.push(test_support::percentage_rate(
            "ca",
            "jur-US-CA",
            dec!(0.0725),
            TaxCategory::General,
            2,
        ));

        let mut exemption = test_support::exemption("e1", "cust-1");
        exemption.jurisdiction_id = Some("jur-US-CA".to_string());
        exemption.category = Some(TaxCategory::General);
        repos.exemptions.push(exemption);

        let mut request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![item("a", dec!(100), TaxCategory::General)],
        );
        request.customer_id = Some("cust-1".to_string());

        let result = engine(repos).calculate(&request).await.unwrap();

        // Only the federal rate contributed; the suppressed rate left no
        // applied-tax record behind.
        assert_eq!(result.items[0].tax_amount, dec!(5.00));
        assert_eq!(result.items[0].taxes.len(), 1);
        assert_eq!(result.items[0].taxes[0].jurisdiction_code, "US");
        // Both jurisdictions were still resolved and recorded.
        assert_eq!(result.jurisdictions_used, vec!["US", "US-CA"]);
    }

    #[tokio::test]
    async fn test_exemptions_ignored_without_customer_id() {
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "fed",
            "jur-US",
            dec!(0.05),
            TaxCategory::General,
            1,
        ));
        repos
            .exemptions
            .push(test_support::exemption("e1", "cust-1"));

        let request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![item("a", dec!(100), TaxCategory::General)],
        );

        let result = engine(repos).calculate(&request).await.unwrap();
        assert_eq!(result.items[0].tax_amount, dec!(5.00));
    }

    #[tokio::test]
    async fn test_exempt_item_zero_regardless_of_rates() {
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "fed",
            "jur-US",
            dec!(0.05),
            TaxCategory::General,
            1,
        ));

        let mut exempt = item("a", dec!(100), TaxCategory::General);
        exempt.is_exempt = true;
        let request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![exempt, item("b", dec!(50), TaxCategory::General)],
        );

        let result = engine(repos).calculate(&request).await.unwrap();
        assert_eq!(result.items[0].tax_amount, Decimal::ZERO);
        assert!(result.items[0].taxes.is_empty());
        assert_eq!(result.items[1].tax_amount, dec!(2.50));
        assert_eq!(result.total_tax, dec!(2.50));
    }

    #[tokio::test]
    async fn test_zero_shipping_skips_shipping_rates() {
        let mut repos = us_ca_fixture();
        let mut shipping_rate = test_support::percentage_rate(
            "shipping",
            "jur-US",
            dec!(0.10),
            TaxCategory::Shipping,
            1,
        );
        shipping_rate.is_shipping_taxable = true;
        repos.rates.push(shipping_rate);

        let request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![item("a", dec!(100), TaxCategory::General)],
        );

        let result = engine(repos).calculate(&request).await.unwrap();
        assert_eq!(result.shipping_tax, Decimal::ZERO);
        assert_eq!(result.total_tax, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_idempotence_across_runs() {
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "fed",
            "jur-US",
            dec!(0.05),
            TaxCategory::General,
            1,
        ));
        let engine = engine(repos);

        let request = TaxCalculationRequest::new(
            address_us_ca(),
            vec![
                item("a", dec!(100), TaxCategory::General),
                item("b", dec!(25), TaxCategory::General),
            ],
        );

        let mut first = engine.calculate(&request).await.unwrap();
        let second = engine.calculate(&request).await.unwrap();

        // Only the wall-clock timestamp may differ between runs.
        first.calculated_at = second.calculated_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_estimate_sums_general_rates_without_compounding() {
        let mut repos = us_ca_fixture();
        repos.rates.push(test_support::percentage_rate(
            "fed",
            "jur-US",
            dec!(0.05),
            TaxCategory::General,
            1,
        ));
        let mut compound = test_support::percentage_rate(
            "ca",
            "jur-US-CA",
            dec!(0.02),
            TaxCategory::General,
            2,
        );
        compound.is_compound = true;
        repos.rates.push(compound);
        // Food rate must not leak into a GENERAL-only estimate
        repos.rates.push(test_support::percentage_rate(
            "food",
            "jur-US",
            dec!(0.01),
            TaxCategory::Food,
            1,
        ));

        let estimate = engine(repos)
            .estimate_tax(&address_us_ca(), dec!(100))
            .await
            .unwrap();

        // 5% + 2%, both on the raw subtotal: no compounding in estimates
        assert_eq!(estimate, dec!(7.00));
    }

    #[tokio::test]
    async fn test_validate_address() {
        let engine = engine(us_ca_fixture());

        assert!(engine
            .validate_address(&Address::country_only("US"))
            .await
            .unwrap());
        assert!(!engine
            .validate_address(&Address::country_only("ZZ"))
            .await
            .unwrap());
        assert!(!engine
            .validate_address(&Address::country_only(""))
            .await
            .unwrap());
    }
}
