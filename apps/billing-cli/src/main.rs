//! # AgriMart Operator CLI
//!
//! Read-only reports over the billing database.
//!
//! ## Usage
//! ```bash
//! agrimart summary 2024-03          # monthly sales figures
//! agrimart low-stock 5              # products at or below 5 units
//! agrimart statement <customer-id>  # invoices and ledger for one customer
//! agrimart overdue                  # issued invoices past their due date
//!
//! # Options (before or after the command)
//! agrimart --json --config ./billing.toml summary
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (`RUST_LOG`, default `info,agrimart=debug,sqlx=warn`)
//! 2. Load `BillingConfig` (file → `AGRIMART_*` env → validate)
//! 3. Connect to the database & run migrations
//! 4. Run the report and print it

use std::path::PathBuf;

use agrimart_billing::BillingConfig;
use agrimart_core::{BillingPeriod, Invoice, Money, Product};
use agrimart_db::{CustomerStatement, Database, SalesSummary};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// AgriMart billing reports.
#[derive(Debug, Parser)]
#[command(name = "agrimart", version, arg_required_else_help = true)]
struct Cli {
    /// Print JSON instead of a table
    #[arg(short, long, global = true)]
    json: bool,

    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sales summary for a month (default: current month)
    Summary {
        /// Billing period as YYYY-MM
        period: Option<BillingPeriod>,
    },
    /// Products at or below THRESHOLD units
    LowStock {
        /// Defaults to `billing.low_stock_threshold`
        threshold: Option<i64>,
    },
    /// Customer invoices and outstanding balance
    Statement { customer_id: String },
    /// Issued invoices past their due date
    Overdue,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = BillingConfig::load(cli.config.clone())?;
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    info!(path = ?config.database.path, "Database ready");

    let result = run(&db, &config, &cli).await;
    db.close().await;
    result
}

async fn run(db: &Database, config: &BillingConfig, cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Command::Summary { period } => {
            let period = period.unwrap_or_else(|| BillingPeriod::from_datetime(Utc::now()));
            let summary = db.reports().monthly_summary(period).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&config.store.name, &summary);
            }
        }
        Command::LowStock { threshold } => {
            let threshold = threshold.unwrap_or(config.billing.low_stock_threshold);
            let products = db.reports().low_stock(threshold).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&products)?);
            } else {
                print_low_stock(threshold, &products);
            }
        }
        Command::Statement { customer_id } => {
            let statement = db.reports().customer_statement(customer_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                print_statement(&statement);
            }
        }
        Command::Overdue => {
            let today = Utc::now().date_naive();
            let invoices = db.invoices().list_overdue(today).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&invoices)?);
            } else {
                print_overdue(&invoices);
            }
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so that `--json` output stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agrimart=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Table Output
// =============================================================================

fn print_summary(store: &str, summary: &SalesSummary) {
    println!("{} - sales for {}", store, summary.period);
    println!("==============================");
    println!("Invoices issued:  {:>12}", summary.invoice_count);
    println!("Drafts:           {:>12}", summary.draft_count);
    println!("Cancelled:        {:>12}", summary.cancelled_count);
    println!("Gross total:      {:>12}", summary.gross_total.to_string());
    println!("Tax:              {:>12}", summary.tax_total.to_string());
    println!("Collected:        {:>12}", summary.collected.to_string());
    println!("Outstanding:      {:>12}", summary.outstanding.to_string());
}

fn print_low_stock(threshold: i64, products: &[Product]) {
    if products.is_empty() {
        println!("No active product at or below {} units", threshold);
        return;
    }

    println!("{:<16} {:<32} {:>6}", "SKU", "NAME", "STOCK");
    for product in products {
        println!("{:<16} {:<32} {:>6}", product.sku, product.name, product.stock);
    }
}

fn print_statement(statement: &CustomerStatement) {
    let customer = &statement.customer;
    println!("Statement for {} ({})", customer.name, customer.id);
    println!(
        "{:<16} {:<15} {:<10} {:>12} {:>12} {:>12}",
        "INVOICE", "STATUS", "DUE", "TOTAL", "PAID", "BALANCE"
    );
    for line in &statement.lines {
        println!(
            "{:<16} {:<15} {:<10} {:>12} {:>12} {:>12}",
            line.invoice_number,
            line.status.as_str(),
            line.due_date.to_string(),
            line.total.to_string(),
            line.amount_paid.to_string(),
            line.balance.to_string(),
        );
    }
    println!();
    println!("Ledger outstanding:   {}", customer.outstanding_balance);
    println!("Invoiced outstanding: {}", statement.invoiced_outstanding);
    if !statement.is_reconciled() {
        println!("⚠ Ledger and invoices disagree");
    }
}

fn print_overdue(invoices: &[Invoice]) {
    if invoices.is_empty() {
        println!("No overdue invoices");
        return;
    }

    println!("{:<16} {:<10} {:>12}", "INVOICE", "DUE", "BALANCE");
    let mut total = Money::ZERO;
    for invoice in invoices {
        println!(
            "{:<16} {:<10} {:>12}",
            invoice.invoice_number,
            invoice.due_date.to_string(),
            invoice.balance.to_string()
        );
        total += invoice.balance;
    }
    println!();
    println!("{} overdue, {} outstanding", invoices.len(), total);
}
