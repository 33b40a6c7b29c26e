//! # Stock Reservations
//!
//! Per-invoice stock holds: what an invoice took from the shelf, and
//! whether it has been given back.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(invoice, [(A, 2), (B, 1), (A, 3)])                            │
//! │     │  sum duplicates        → {A: 5, B: 1}                            │
//! │     │  conditional debit A   → stock(A) -= 5  or InsufficientStock     │
//! │     │  conditional debit B   → stock(B) -= 1  or InsufficientStock     │
//! │     └─ rows (invoice, A, 5), (invoice, B, 1), released_at = NULL       │
//! │                                                                         │
//! │  release(invoice)                                                      │
//! │     │  stamp released_at on every open row (RETURNING what was open)   │
//! │     └─ credit stock by exactly those rows                              │
//! │                                                                         │
//! │  release(invoice) again → no open rows → no-op                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;

/// A stock hold taken by an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StockReservation {
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub reserved_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl StockReservation {
    pub fn is_open(&self) -> bool {
        self.released_at.is_none()
    }
}

/// Sums quantities per product, keeping a stable (sorted) order.
///
/// Sorted order also means concurrent reservations touch products in the
/// same sequence.
pub fn consolidate<'a, I>(lines: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        *totals.entry(product_id.to_string()).or_insert(0) += quantity;
    }
    totals
}

/// Repository for stock reservations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Lists every reservation of an invoice, released or not.
    pub async fn reservations_for(&self, invoice_id: &str) -> DbResult<Vec<StockReservation>> {
        let rows = sqlx::query_as::<_, StockReservation>(
            r#"
            SELECT invoice_id, product_id, quantity, reserved_at, released_at
            FROM stock_reservations
            WHERE invoice_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Releases an invoice's stock in its own transaction.
    ///
    /// ## Returns
    /// Units returned to stock by this call (0 if already released).
    pub async fn release(&self, invoice_id: &str) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        let released = Self::release_in(&mut *tx, invoice_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(released.iter().map(|(_, quantity)| quantity).sum())
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Debits stock for every line of an invoice and records the holds.
    ///
    /// ## Errors
    /// - `InsufficientStock` for the first product that cannot be covered
    /// - `NotFound` if a product does not exist
    ///
    /// Nothing is rolled back here: the caller drops its transaction.
    pub async fn reserve_in(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        lines: &[(&str, i64)],
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        for (product_id, requested) in consolidate(lines.iter().copied()) {
            if !ProductRepository::try_debit(conn, &product_id, requested, at).await? {
                let available = ProductRepository::stock_level(conn, &product_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Product", &product_id))?;

                debug!(
                    invoice_id = %invoice_id,
                    product_id = %product_id,
                    available,
                    requested,
                    "Stock reservation refused"
                );
                return Err(DbError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                });
            }

            sqlx::query(
                r#"
                INSERT INTO stock_reservations (invoice_id, product_id, quantity, reserved_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(invoice_id)
            .bind(&product_id)
            .bind(requested)
            .bind(at)
            .execute(&mut *conn)
            .await?;

            debug!(invoice_id = %invoice_id, product_id = %product_id, requested, "Stock reserved");
        }

        Ok(())
    }

    /// Gives back every open hold of an invoice.
    ///
    /// ## Returns
    /// `(product_id, quantity)` for each hold released by this call.
    pub async fn release_in(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<Vec<(String, i64)>> {
        let released: Vec<(String, i64)> = sqlx::query_as(
            r#"
            UPDATE stock_reservations
            SET released_at = ?2
            WHERE invoice_id = ?1 AND released_at IS NULL
            RETURNING product_id, quantity
            "#,
        )
        .bind(invoice_id)
        .bind(at)
        .fetch_all(&mut *conn)
        .await?;

        for (product_id, quantity) in &released {
            ProductRepository::credit(conn, product_id, *quantity, at).await?;
        }

        debug!(invoice_id = %invoice_id, holds = released.len(), "Stock released");
        Ok(released)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
