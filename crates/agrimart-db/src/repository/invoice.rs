//! # Invoice Repository
//!
//! Persistence of the invoice aggregate (header, line items, payments).
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_in         header + all items (+ payments) in the caller's tx  │
//! │  update_header_in  WHERE id = ? AND version = ?  → version + 1         │
//! │                    0 rows → VersionConflict (someone else got there)   │
//! │  add_payment_in    append-only                                         │
//! │  delete_in         header; items and payments cascade                  │
//! │                                                                         │
//! │  Line items are never updated.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! List queries return headers only (`items` and `payments` empty); use
//! [`InvoiceRepository::get_by_id`] for the full aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use agrimart_core::{BillingPeriod, Invoice, InvoiceLineItem, InvoiceStatus, Payment};

pub(crate) const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, status, subtotal, \
     discount_amount, tax_amount, shipping_amount, round_off, total, amount_paid, balance, \
     notes, due_date, created_at, updated_at, issued_at, cancelled_at, version";

const ITEM_COLUMNS: &str = "id, invoice_id, line_no, product_id, product_name, quantity, \
     unit_price, discount_percent, tax_rate, line_subtotal, line_tax, line_total";

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, method, reference, recorded_by, paid_at";

/// Repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets a full invoice (items and payments included) by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Gets a full invoice by its number.
    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM invoices WHERE invoice_number = ?1")
                .bind(invoice_number.trim())
                .fetch_optional(&mut *conn)
                .await?;

        match id {
            Some(id) => Self::fetch(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Lists a customer's invoices, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE customer_id = ?1 \
             ORDER BY created_at DESC, invoice_number DESC"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    /// Lists invoices in a status, newest first.
    pub async fn list_by_status(&self, status: InvoiceStatus, limit: u32) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    /// Lists invoices created within a billing period, in number order.
    pub async fn list_by_period(&self, period: BillingPeriod) -> DbResult<Vec<Invoice>> {
        let (start, end) = period_bounds(period);
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE created_at >= ?1 AND created_at < ?2 \
             ORDER BY invoice_number"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    /// Issued invoices with an unpaid balance whose due date is before `today`.
    pub async fn list_overdue(&self, today: NaiveDate) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE status IN ('unpaid', 'partially_paid') AND due_date < ?1 \
             ORDER BY due_date, invoice_number"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices
            .into_iter()
            .filter(|invoice| invoice.is_overdue(today))
            .collect())
    }

    /// Counts all invoices.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Loads a full invoice on an open connection or transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(mut invoice) = invoice else {
            return Ok(None);
        };

        let sql = format!("SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY line_no");
        invoice.items = sqlx::query_as::<_, InvoiceLineItem>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM invoice_payments WHERE invoice_id = ?1 \
             ORDER BY paid_at, rowid"
        );
        invoice.payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(Some(invoice))
    }

    /// Like [`fetch`](Self::fetch) but missing invoices are an error.
    pub async fn fetch_required(conn: &mut SqliteConnection, id: &str) -> DbResult<Invoice> {
        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Inserts the header, every line item and any payments.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the invoice number is taken
    /// - `ForeignKeyViolation` for an unknown customer or product
    pub async fn insert_in(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            items = invoice.items.len(),
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, customer_id, status,
                subtotal, discount_amount, tax_amount, shipping_amount,
                round_off, total, amount_paid, balance,
                notes, due_date, created_at, updated_at,
                issued_at, cancelled_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_id)
        .bind(invoice.status)
        .bind(invoice.subtotal)
        .bind(invoice.discount_amount)
        .bind(invoice.tax_amount)
        .bind(invoice.shipping_amount)
        .bind(invoice.round_off)
        .bind(invoice.total)
        .bind(invoice.amount_paid)
        .bind(invoice.balance)
        .bind(&invoice.notes)
        .bind(invoice.due_date)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .bind(invoice.issued_at)
        .bind(invoice.cancelled_at)
        .bind(invoice.version)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: invoice.invoice_number.clone(),
            },
            other => other,
        })?;

        for item in &invoice.items {
            Self::insert_item_in(conn, item).await?;
        }
        for payment in &invoice.payments {
            Self::add_payment_in(conn, payment).await?;
        }

        Ok(())
    }

    async fn insert_item_in(conn: &mut SqliteConnection, item: &InvoiceLineItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, line_no, product_id, product_name, quantity,
                unit_price, discount_percent, tax_rate,
                line_subtotal, line_tax, line_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.invoice_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount_percent)
        .bind(item.tax_rate)
        .bind(item.line_subtotal)
        .bind(item.line_tax)
        .bind(item.line_total)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Appends a payment row.
    pub async fn add_payment_in(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            invoice_id = %payment.invoice_id,
            amount = %payment.amount,
            method = %payment.method,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO invoice_payments (
                id, invoice_id, amount, method, reference, recorded_by, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(&payment.recorded_by)
        .bind(payment.paid_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Writes the mutable header fields, guarded by the version the caller
    /// loaded.
    ///
    /// ## Returns
    /// The new version, also stored into `invoice.version`.
    pub async fn update_header_in(
        conn: &mut SqliteConnection,
        invoice: &mut Invoice,
    ) -> DbResult<i64> {
        let expected = invoice.version;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = ?3,
                amount_paid = ?4,
                balance = ?5,
                notes = ?6,
                due_date = ?7,
                updated_at = ?8,
                issued_at = ?9,
                cancelled_at = ?10,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&invoice.id)
        .bind(expected)
        .bind(invoice.status)
        .bind(invoice.amount_paid)
        .bind(invoice.balance)
        .bind(&invoice.notes)
        .bind(invoice.due_date)
        .bind(invoice.updated_at)
        .bind(invoice.issued_at)
        .bind(invoice.cancelled_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VersionConflict {
                entity: "Invoice".to_string(),
                id: invoice.id.clone(),
                expected,
            });
        }

        invoice.version = expected + 1;
        debug!(
            id = %invoice.id,
            status = %invoice.status,
            version = invoice.version,
            "Invoice header updated"
        );
        Ok(invoice.version)
    }

    /// Deletes an invoice; items and payments cascade.
    pub async fn delete_in(conn: &mut SqliteConnection, id: &str, version: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND version = ?2")
            .bind(id)
            .bind(version)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VersionConflict {
                entity: "Invoice".to_string(),
                id: id.to_string(),
                expected: version,
            });
        }

        debug!(id = %id, "Invoice deleted");
        Ok(())
    }
}

/// `[first instant of the month, first instant of the next month)` in UTC.
pub(crate) fn period_bounds(period: BillingPeriod) -> (DateTime<Utc>, DateTime<Utc>) {
    let (start, end) = period.date_range();
    (
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        end.and_time(chrono::NaiveTime::MIN).and_utc(),
    )
}
