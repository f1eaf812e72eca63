//! # Seed Data Generator
//!
//! Populates a fresh database with default settings, the walk-in
//! customer, a counter user and sample catalog products.
//!
//! ## Usage
//! ```bash
//! # Seed ./dukaan_dev.db with 60 products (default)
//! cargo run -p dukaan-store --bin seed
//!
//! # Custom amount and path
//! cargo run -p dukaan-store --bin seed -- --count 200 --db ./data/dukaan.db
//! ```
//!
//! ## Generated Products
//! - Code: `{FABRIC}-{INDEX}`, e.g. `SLK-004`
//! - Name: `{fabric} {style} Saree`
//! - MRP ₹450 - ₹4,950, retail at MRP or 10% below
//! - Opening stock 0 - 24, recorded as an `opening` movement

use serde_json::{json, Value};
use std::env;

use dukaan_core::{Customer, Money, MovementType, Product, StockMovement, TaxRate, WALK_IN_MOBILE};
use dukaan_store::{Collection, Database, DbConfig};

/// Fabric families as `(code, name, hsn)`.
const FABRICS: &[(&str, &str, &str)] = &[
    ("CTN", "Cotton", "5208"),
    ("SLK", "Silk", "5007"),
    ("GEO", "Georgette", "5407"),
    ("CHF", "Chiffon", "5407"),
    ("LIN", "Linen", "5309"),
    ("CRP", "Crepe", "5407"),
];

const STYLES: &[&str] = &[
    "Banarasi",
    "Chanderi",
    "Maheshwari",
    "Bandhani",
    "Kanjivaram",
    "Printed",
    "Embroidered",
    "Zari Border",
    "Plain",
    "Party Wear",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./dukaan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dukaan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./dukaan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Dukaan Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::sqlite(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let created = db.settings().seed_defaults().await?;
    println!("✓ {} default settings created", created);

    if db.customers().find_by_mobile(WALK_IN_MOBILE).await?.is_none() {
        db.customers().create(&walk_in_customer()).await?;
        println!("✓ Walk-in customer created");
    }

    let admin = db
        .store()
        .first(Collection::Users, dukaan_store::Filter::eq("email", "counter@dukaan.local"), "")
        .await?;
    if admin.is_none() {
        let user = json!({"email": "counter@dukaan.local", "name": "Counter", "role": "admin"});
        if let Value::Object(data) = user {
            db.store().create(Collection::Users, data).await?;
            println!("✓ Counter user created");
        }
    }

    let existing = db.products().search("", 1, 1).await?.total_items;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping product seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");
    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (fabric_idx, fabric) in FABRICS.iter().enumerate() {
        for (style_idx, style) in STYLES.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }
            let seed = fabric_idx * STYLES.len() + style_idx;
            let product = generate_product(fabric, style, seed);

            let saved = match db.products().create(&product).await {
                Ok(saved) => saved,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", product.product_code, e);
                    continue;
                }
            };
            if saved.current_stock > 0 {
                db.stock()
                    .record(&StockMovement {
                        id: String::new(),
                        product: saved.id.clone(),
                        movement_type: MovementType::Opening,
                        quantity: saved.current_stock,
                        balance_after: Some(saved.current_stock),
                        reference_type: None,
                        reference_id: None,
                        notes: Some("Seed".to_string()),
                    })
                    .await?;
            }
            generated += 1;
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let hits = db.products().search("silk", 1, 10).await?;
    println!("  Search 'silk': {} results", hits.total_items);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn walk_in_customer() -> Customer {
    Customer {
        id: String::new(),
        name: "Walk-in Customer".to_string(),
        mobile: WALK_IN_MOBILE.to_string(),
        email: None,
        address: None,
        city: None,
        state: Some(dukaan_core::DEFAULT_CUSTOMER_STATE.to_string()),
        gstin: None,
        notes: None,
    }
}

/// Builds one product with deterministic pseudo-random values.
fn generate_product(fabric: &(&str, &str, &str), style: &str, seed: usize) -> Product {
    let (code, name, hsn) = *fabric;

    // ₹450 - ₹4,950 in ₹50 steps
    let mrp = Money::from_rupees(450 + ((seed * 37) % 91) as i64 * 50);
    let retail = if seed % 3 == 0 {
        mrp.mul_ratio(90, 100)
    } else {
        mrp
    };

    Product {
        id: String::new(),
        product_code: format!("{}-{:03}", code, seed + 1),
        name: format!("{} {} Saree", name, style),
        description: None,
        hsn_code: Some(hsn.to_string()),
        purchase_price: Some(mrp.mul_ratio(60, 100)),
        retail_price: retail,
        mrp,
        wholesale_price: Some(mrp.mul_ratio(80, 100)),
        cgst_pct: Some(TaxRate::DEFAULT_COMPONENT),
        sgst_pct: Some(TaxRate::DEFAULT_COMPONENT),
        unit: Some("PCS".to_string()),
        barcode: Some(format!("890{:010}", seed)),
        min_stock: 5,
        current_stock: (seed % 25) as i64,
        active: true,
    }
}
