//! # Seed Data Generator
//!
//! Populates a database with an agricultural catalog and a few customers
//! for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./agrimart_dev.db
//! cargo run -p agrimart-db --bin seed
//!
//! # Specify database path and starting stock
//! cargo run -p agrimart-db --bin seed -- --db ./data/agrimart.db --stock 250
//! ```
//!
//! ## Generated Data
//! - Fertilizers, seeds, pesticides, tools and feed, each with a
//!   `{CATEGORY}-{CODE}` SKU, a whole-rupee price and its GST rate
//! - Cost price at 80% of the selling price
//! - A handful of farmer and dealer customers with empty accounts

use agrimart_core::{Customer, Money, Percent, Product};
use agrimart_db::{Database, DbConfig};
use std::env;

/// (category, [(code, name, unit, price, tax %)])
const CATALOG: &[(&str, &[(&str, &str, &str, i64, i64)])] = &[
    (
        "FERT",
        &[
            ("UREA50", "Urea 46% N", "bag 50kg", 267, 5),
            ("DAP50", "DAP 18-46-0", "bag 50kg", 1350, 5),
            ("MOP50", "Muriate of Potash", "bag 50kg", 1700, 5),
            ("SSP50", "Single Super Phosphate", "bag 50kg", 450, 5),
            ("NPK50", "NPK 10-26-26", "bag 50kg", 1470, 5),
            ("ZNSO4", "Zinc Sulphate 21%", "bag 10kg", 520, 12),
        ],
    ),
    (
        "SEED",
        &[
            ("WHT-HD", "Wheat HD-2967", "bag 40kg", 1900, 0),
            ("PAD-1509", "Paddy Pusa Basmati 1509", "bag 10kg", 950, 0),
            ("MZE-HYB", "Hybrid Maize", "pack 4kg", 1250, 0),
            ("COT-BT", "Bt Cotton", "pack 450g", 864, 0),
            ("MUS-RH", "Mustard RH-749", "pack 2kg", 480, 0),
        ],
    ),
    (
        "PEST",
        &[
            ("CHLOR", "Chlorpyrifos 20% EC", "bottle 1L", 420, 18),
            ("IMID", "Imidacloprid 17.8% SL", "bottle 250ml", 390, 18),
            ("MANC", "Mancozeb 75% WP", "pack 1kg", 460, 18),
            ("GLYPH", "Glyphosate 41% SL", "bottle 1L", 540, 18),
        ],
    ),
    (
        "TOOL",
        &[
            ("SPRY16", "Knapsack Sprayer", "piece 16L", 1850, 12),
            ("SICKLE", "Serrated Sickle", "piece", 120, 12),
            ("HOSE25", "Garden Hose", "roll 25m", 1100, 18),
            ("SPADE", "Steel Spade", "piece", 380, 12),
        ],
    ),
    (
        "FEED",
        &[
            ("CATL50", "Cattle Feed Pellets", "bag 50kg", 1450, 0),
            ("POUL25", "Poultry Layer Mash", "bag 25kg", 980, 0),
            ("MINMIX", "Mineral Mixture", "pack 1kg", 140, 5),
        ],
    ),
];

/// (name, phone, address)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Ramesh Patil", "9822012345", "Shirur, Pune"),
    ("Sunita Devi", "9415098765", "Barabanki, Uttar Pradesh"),
    ("Gurpreet Singh", "9814023456", "Khanna, Ludhiana"),
    ("Krishi Seva Kendra", "0241234567", "Ahmednagar"),
    ("Lakshmi Narayanan", "9443056789", "Thanjavur"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut stock: i64 = 100;
    let mut db_path = String::from("./agrimart_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(100);
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
                println!("AgriMart Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stock <N>    Opening stock per product (default: 100)");
                println!("  -d, --db <PATH>    Database file path (default: ./agrimart_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 AgriMart Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Opening stock: {}", stock);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut products = 0;
    for (category, items) in CATALOG {
        for (code, name, unit, price, tax) in items.iter() {
            let product = catalog_product(category, code, name, unit, *price, *tax, stock)?;
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.sku, e);
                continue;
            }
            products += 1;
        }
    }
    println!("✓ Generated {} products", products);

    let mut customers = 0;
    for (name, phone, address) in CUSTOMERS {
        let customer = Customer::new(*name)
            .with_phone(*phone)
            .with_address(*address);
        if let Err(e) = db.customers().insert(&customer).await {
            eprintln!("Failed to insert customer {}: {}", name, e);
            continue;
        }
        customers += 1;
    }
    println!("✓ Generated {} customers", customers);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds a catalog product with cost at 80% of price.
fn catalog_product(
    category: &str,
    code: &str,
    name: &str,
    unit: &str,
    price: i64,
    tax: i64,
    stock: i64,
) -> Result<Product, agrimart_core::ValidationError> {
    let price = Money::from_major(price);
    Ok(Product::new(
        format!("{}-{}", category, code),
        name,
        unit,
        price,
        Percent::from_whole(tax)?,
    )
    .with_category(category)
    .with_cost_price(price.percent(Percent::from_whole(80)?))
    .with_stock(stock))
}
