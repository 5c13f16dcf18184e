//! # Seed Data Generator
//!
//! Populates the database with a small fashion shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (atelier.toml / ATELIER_DB_PATH)
//! cargo run -p atelier-db --bin seed
//!
//! # Specify database path
//! cargo run -p atelier-db --bin seed -- --db ./data/atelier.db
//!
//! # Use a specific config file
//! cargo run -p atelier-db --bin seed -- --config ./atelier.toml
//! ```
//!
//! ## Generated Data
//! - Tiers: Member 0%, Silver 5% @ 5,000,000, Gold 10% @ 20,000,000,
//!   Diamond 15% @ 50,000,000
//! - Two staff accounts
//! - A handful of customers, all starting as Member
//! - SKUs: every product × size × color, e.g. `TEE-BLK-M`
//! - Promotions: one percentage, one flat, one already expired

use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use atelier_core::{Customer, CustomerType, Pricing, Promotion, RequiredBill, Staff};
use atelier_db::repository::generate_id;
use atelier_db::{AtelierConfig, Database};

/// (code, name, base price)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("TEE", "Cotton Tee", 250_000),
    ("OXF", "Oxford Shirt", 450_000),
    ("JNS", "Slim Jeans", 690_000),
    ("CHN", "Chino Pants", 590_000),
    ("DRS", "Linen Dress", 890_000),
    ("KNT", "Wool Knit", 750_000),
    ("BLZ", "Tailored Blazer", 1_890_000),
    ("COT", "Trench Coat", 2_490_000),
];

/// (code, label, price addon)
const SIZES: &[(&str, &str, i64)] = &[
    ("S", "S", 0),
    ("M", "M", 0),
    ("L", "L", 20_000),
    ("XL", "XL", 40_000),
];

const COLORS: &[(&str, &str)] = &[("BLK", "Black"), ("WHT", "White"), ("NVY", "Navy")];

/// (name, discount bps, required spend)
const TIERS: &[(&str, u32, i64)] = &[
    ("Member", 0, 0),
    ("Silver", 500, 5_000_000),
    ("Gold", 1_000, 20_000_000),
    ("Diamond", 1_500, 50_000_000),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("KH0001", "Nguyen Thi Mai", "0901000001"),
    ("KH0002", "Tran Van Long", "0901000002"),
    ("KH0003", "Le Hoang Anh", "0901000003"),
    ("KH0004", "Pham Minh Chau", "0901000004"),
    ("KH0005", "Vo Thanh Tam", "0901000005"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atelier Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (overrides config)");
                println!("  -c, --config <PATH>    Config file path (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    // An explicit --config must load; the platform default file is optional.
    let mut config = match config_path {
        Some(path) => AtelierConfig::load(Some(path))?,
        None => AtelierConfig::load_or_default(None),
    };
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Atelier Back Office Seed Data Generator");
    println!("==========================================");
    println!("Database: {}", config.database.path.display());
    println!();

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.pricings().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} SKUs", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Tiers and thresholds
    let mut member: Option<CustomerType> = None;
    for (name, bps, spend) in TIERS {
        let tier = CustomerType {
            id: generate_id(),
            name: name.to_string(),
            discount_bps: *bps,
        };
        db.tiers().insert_tier(&tier).await?;
        db.tiers()
            .insert_threshold(&RequiredBill {
                id: generate_id(),
                customer_type_id: tier.id.clone(),
                required_spend: *spend,
            })
            .await?;
        if *spend == 0 {
            member = Some(tier);
        }
    }
    let member = member.ok_or("tier ladder has no entry tier")?;
    println!("✓ {} tiers", TIERS.len());

    // Staff
    for (username, display_name) in [("linh", "Linh (Manager)"), ("quan", "Quan (Sales)")] {
        db.staff()
            .insert(&Staff {
                id: generate_id(),
                username: username.to_string(),
                display_name: display_name.to_string(),
                is_active: true,
            })
            .await?;
    }
    println!("✓ 2 staff accounts");

    // Customers
    let now = Utc::now();
    for (code, name, phone) in CUSTOMERS {
        db.customers()
            .insert(&Customer {
                id: generate_id(),
                code: code.to_string(),
                full_name: name.to_string(),
                phone: Some(phone.to_string()),
                accumulated_points: 0,
                customer_type_id: member.id.clone(),
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("✓ {} customers", CUSTOMERS.len());

    // SKUs
    let mut generated = 0;
    for (seed, ((product, name, price), (size, size_label, addon), (color, color_label))) in
        PRODUCTS
            .iter()
            .flat_map(|p| SIZES.iter().map(move |s| (p, s)))
            .flat_map(|(p, s)| COLORS.iter().map(move |c| (*p, *s, *c)))
            .enumerate()
    {
        let sku = Pricing {
            id: generate_id(),
            code: format!("{product}-{color}-{size}"),
            product_name: name.to_string(),
            size: Some(size_label.to_string()),
            color: Some(color_label.to_string()),
            price: price + addon,
            quantity: (seed % 25) as i64,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.pricings().insert(&sku).await {
            eprintln!("Failed to insert {}: {}", sku.code, e);
            continue;
        }
        generated += 1;
    }
    println!("✓ {} SKUs", generated);

    // Promotions
    let today = now.date_naive();
    let promotions = [
        ("SUMMER10", "Summer 10% off", 0.1, 100, Some(today + Duration::days(90))),
        ("WELCOME50K", "Welcome 50,000 off", 50_000.0, 500, None),
        ("TET2025", "Lunar New Year", 0.2, 10, Some(today - Duration::days(30))),
    ];
    for (code, name, discount, quantity, end_day) in promotions {
        db.promotions()
            .insert(&Promotion {
                id: generate_id(),
                code: code.to_string(),
                name: name.to_string(),
                discount,
                start_day: None,
                end_day,
                quantity,
                enabled: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("✓ {} promotions", promotions.len());

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}
