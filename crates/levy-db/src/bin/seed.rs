//! # Seed Data Generator
//!
//! Populates the database with a realistic jurisdiction hierarchy and
//! rate configuration for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p levy-db --bin seed
//!
//! # Specify database path
//! cargo run -p levy-db --bin seed -- --db ./data/levy.db
//! ```
//!
//! ## Seeded Configuration
//! - US federal jurisdiction (no federal sales tax rate)
//! - California state jurisdiction with:
//!   - 7.25% general sales tax (shipping-taxable)
//!   - 0% food rate (groceries untaxed)
//! - Los Angeles county jurisdiction with:
//!   - 2.25% district add-on
//!   - 0.5% compound transit surcharge (applies on base + accumulated tax)
//! - Long Beach city jurisdiction with:
//!   - 1.00% city tax
//!   - $1.50/unit flat disposal fee on general goods above $50
//! - One fully unscoped exemption for customer `cust-nonprofit`

use rust_decimal_macros::dec;
use std::env;

use levy_core::{JurisdictionType, RateKind, TaxCategory};
use levy_db::{Database, DbConfig, NewJurisdiction, NewTaxExemption, NewTaxRate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug surfaces the store-level query logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./levy_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Levy Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./levy_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Levy Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Re-running against a seeded database would trip the unique code
    // constraint; bail out early instead.
    if db.jurisdictions().get_by_code("US").await?.is_some() {
        println!("⚠ Database already seeded (jurisdiction 'US' exists)");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding jurisdictions...");

    let jurisdictions = db.jurisdictions();
    let rates = db.rates();

    let us = jurisdictions
        .create(NewJurisdiction {
            code: "US".to_string(),
            name: "United States".to_string(),
            jurisdiction_type: JurisdictionType::Federal,
            parent_id: None,
            country: "US".to_string(),
            region: None,
            county: None,
            city: None,
            postal_code: None,
            priority: 0,
        })
        .await?;

    let california = jurisdictions
        .create(NewJurisdiction {
            code: "US-CA".to_string(),
            name: "California".to_string(),
            jurisdiction_type: JurisdictionType::State,
            parent_id: Some(us.id.clone()),
            country: "US".to_string(),
            region: Some("CA".to_string()),
            county: None,
            city: None,
            postal_code: None,
            priority: 1,
        })
        .await?;

    let la_county = jurisdictions
        .create(NewJurisdiction {
            code: "US-CA-LA".to_string(),
            name: "Los Angeles County".to_string(),
            jurisdiction_type: JurisdictionType::County,
            parent_id: Some(california.id.clone()),
            country: "US".to_string(),
            region: Some("CA".to_string()),
            county: Some("Los Angeles".to_string()),
            city: None,
            postal_code: None,
            priority: 2,
        })
        .await?;

    let long_beach = jurisdictions
        .create(NewJurisdiction {
            code: "US-CA-LA-LB".to_string(),
            name: "Long Beach".to_string(),
            jurisdiction_type: JurisdictionType::City,
            parent_id: Some(la_county.id.clone()),
            country: "US".to_string(),
            region: Some("CA".to_string()),
            county: Some("Los Angeles".to_string()),
            city: Some("Long Beach".to_string()),
            postal_code: None,
            priority: 3,
        })
        .await?;

    println!("✓ 4 jurisdictions created (US → CA → LA County → Long Beach)");
    println!();
    println!("Seeding rates...");

    // CA state sales tax, also applied to shipping charges
    for (category, shipping_taxable) in [(TaxCategory::General, false), (TaxCategory::Shipping, true)]
    {
        rates
            .create(NewTaxRate {
                jurisdiction_id: california.id.clone(),
                name: "CA State Sales Tax".to_string(),
                kind: RateKind::Percentage,
                rate: dec!(0.0725),
                category,
                is_compound: false,
                is_shipping_taxable: shipping_taxable,
                min_threshold: None,
                max_threshold: None,
                priority: 1,
                start_date: None,
                end_date: None,
            })
            .await?;
    }

    // Groceries are zero-rated in CA
    rates
        .create(NewTaxRate {
            jurisdiction_id: california.id.clone(),
            name: "CA Food Exclusion".to_string(),
            kind: RateKind::Percentage,
            rate: dec!(0),
            category: TaxCategory::Food,
            is_compound: false,
            is_shipping_taxable: false,
            min_threshold: None,
            max_threshold: None,
            priority: 1,
            start_date: None,
            end_date: None,
        })
        .await?;

    rates
        .create(NewTaxRate {
            jurisdiction_id: la_county.id.clone(),
            name: "LA County District Tax".to_string(),
            kind: RateKind::Percentage,
            rate: dec!(0.0225),
            category: TaxCategory::General,
            is_compound: false,
            is_shipping_taxable: false,
            min_threshold: None,
            max_threshold: None,
            priority: 2,
            start_date: None,
            end_date: None,
        })
        .await?;

    rates
        .create(NewTaxRate {
            jurisdiction_id: long_beach.id.clone(),
            name: "Long Beach City Tax".to_string(),
            kind: RateKind::Percentage,
            rate: dec!(0.01),
            category: TaxCategory::General,
            is_compound: false,
            is_shipping_taxable: false,
            min_threshold: None,
            max_threshold: None,
            priority: 3,
            start_date: None,
            end_date: None,
        })
        .await?;

    // Flat per-unit fee, only on line subtotals above $50
    rates
        .create(NewTaxRate {
            jurisdiction_id: long_beach.id.clone(),
            name: "Long Beach Disposal Fee".to_string(),
            kind: RateKind::Flat,
            rate: dec!(1.50),
            category: TaxCategory::General,
            is_compound: false,
            is_shipping_taxable: false,
            min_threshold: Some(dec!(50)),
            max_threshold: None,
            priority: 4,
            start_date: None,
            end_date: None,
        })
        .await?;

    // Compound surcharge: applies after all the above, on base + tax
    rates
        .create(NewTaxRate {
            jurisdiction_id: la_county.id.clone(),
            name: "LA County Transit Surcharge".to_string(),
            kind: RateKind::Compound,
            rate: dec!(0.005),
            category: TaxCategory::General,
            is_compound: true,
            is_shipping_taxable: false,
            min_threshold: None,
            max_threshold: None,
            priority: 5,
            start_date: None,
            end_date: None,
        })
        .await?;

    println!("✓ 7 rates created");
    println!();
    println!("Seeding exemptions...");

    db.exemptions()
        .create(NewTaxExemption {
            customer_id: "cust-nonprofit".to_string(),
            jurisdiction_id: None,
            category: None,
            start_date: None,
            end_date: None,
        })
        .await?;

    println!("✓ 1 exemption granted (cust-nonprofit, all jurisdictions)");
    println!();
    println!("Done. Try a calculation against an address in Long Beach, CA.");

    db.close().await;
    Ok(())
}
