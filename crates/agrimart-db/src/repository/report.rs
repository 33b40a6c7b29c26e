//! # Report Repository
//!
//! Read-only views over invoices, products and customers.
//!
//! Amounts are summed in Rust from the stored decimals, never with SQL
//! `SUM`, which would coerce the TEXT columns to floating point.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::{period_bounds, INVOICE_COLUMNS};
use crate::repository::product::PRODUCT_COLUMNS;
use crate::repository::customer::CustomerRepository;
use agrimart_core::{BillingPeriod, Customer, Invoice, InvoiceStatus, Money, Product};

/// Monthly sales figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub period: String,
    /// Issued invoices (unpaid, partially paid, paid)
    pub invoice_count: u32,
    pub draft_count: u32,
    pub cancelled_count: u32,
    /// Sum of issued invoice totals
    pub gross_total: Money,
    pub tax_total: Money,
    pub collected: Money,
    pub outstanding: Money,
}

impl SalesSummary {
    /// Folds invoices into a summary. Drafts and cancellations are counted
    /// but contribute no money.
    pub fn from_invoices<'a>(
        period: BillingPeriod,
        invoices: impl IntoIterator<Item = &'a Invoice>,
    ) -> Self {
        let mut summary = SalesSummary {
            period: period.to_string(),
            ..Default::default()
        };

        for invoice in invoices {
            match invoice.status {
                InvoiceStatus::Draft => summary.draft_count += 1,
                InvoiceStatus::Cancelled => summary.cancelled_count += 1,
                InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid => {
                    summary.invoice_count += 1;
                    summary.gross_total += invoice.total;
                    summary.tax_total += invoice.tax_amount;
                    summary.collected += invoice.amount_paid;
                    summary.outstanding += invoice.balance;
                }
            }
        }

        summary
    }
}

/// One invoice on a customer statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub due_date: chrono::NaiveDate,
    pub total: Money,
    pub amount_paid: Money,
    pub balance: Money,
}

/// A customer's invoices together with their ledger balance.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerStatement {
    pub customer: Customer,
    pub lines: Vec<StatementLine>,
    /// Sum of the open balances on the listed invoices
    pub invoiced_outstanding: Money,
}

impl CustomerStatement {
    /// True when the ledger agrees with the invoices.
    pub fn is_reconciled(&self) -> bool {
        self.customer.outstanding_balance == self.invoiced_outstanding
    }
}

/// Repository for reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales figures for invoices created in `period`.
    pub async fn monthly_summary(&self, period: BillingPeriod) -> DbResult<SalesSummary> {
        let (start, end) = period_bounds(period);
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE created_at >= ?1 AND created_at < ?2"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(SalesSummary::from_invoices(period, &invoices))
    }

    /// Active products at or below `threshold` units, emptiest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 AND stock <= ?1 \
             ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Every invoice of a customer, oldest first.
    pub async fn customer_statement(&self, customer_id: &str) -> DbResult<CustomerStatement> {
        let mut conn = self.pool.acquire().await?;
        let customer = CustomerRepository::fetch(&mut conn, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE customer_id = ?1 \
             ORDER BY created_at, invoice_number"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        let invoiced_outstanding = invoices.iter().map(Invoice::outstanding).sum();
        let lines = invoices
            .into_iter()
            .map(|invoice| StatementLine {
                invoice_number: invoice.invoice_number,
                status: invoice.status,
                created_at: invoice.created_at,
                due_date: invoice.due_date,
                total: invoice.total,
                amount_paid: invoice.amount_paid,
                balance: invoice.balance,
            })
            .collect();

        Ok(CustomerStatement {
            customer,
            lines,
            invoiced_outstanding,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
