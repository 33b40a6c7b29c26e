//! # Invoice Number Counters
//!
//! Allocates `INV-YYYYMM-NNNN` numbers from a per-period counter row.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO invoice_counters (period, last_sequence)                  │
//! │  VALUES (:period, MAX(existing sequence for period) + 1)               │
//! │  ON CONFLICT (period) DO UPDATE                                        │
//! │      SET last_sequence = last_sequence + 1                             │
//! │  RETURNING last_sequence                                               │
//! │                                                                         │
//! │  First use in a month: seeded from invoices already numbered for it    │
//! │  (0 if none), so numbering continues after a counter reset.            │
//! │  Later uses: plain atomic increment, no read-then-write gap.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The statement runs inside the invoice-creation transaction: a rolled
//! back creation also rolls back its number.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use agrimart_core::{BillingPeriod, InvoiceNumber};

/// Allocates the next invoice number for `period`.
pub async fn next_invoice_number(
    conn: &mut SqliteConnection,
    period: BillingPeriod,
) -> DbResult<InvoiceNumber> {
    let prefix = period.number_prefix();
    let sequence_start = prefix.chars().count() as i64 + 1;

    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (period, last_sequence)
        VALUES (
            ?1,
            (
                SELECT COALESCE(MAX(CAST(substr(invoice_number, ?2) AS INTEGER)), 0) + 1
                FROM invoices
                WHERE substr(invoice_number, 1, ?3) = ?4
            )
        )
        ON CONFLICT (period) DO UPDATE
            SET last_sequence = invoice_counters.last_sequence + 1
        RETURNING last_sequence
        "#,
    )
    .bind(period.key())
    .bind(sequence_start)
    .bind(sequence_start - 1)
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await?;

    let sequence = u32::try_from(sequence).map_err(|_| DbError::Corrupt {
        field: "invoice_counters.last_sequence".to_string(),
        reason: format!("sequence {} out of range", sequence),
    })?;
    let number = InvoiceNumber::new(period, sequence)?;

    debug!(period = %period, number = %number, "Allocated invoice number");
    Ok(number)
}

/// Last sequence issued for `period`, 0 if none.
pub async fn current_sequence(pool: &SqlitePool, period: BillingPeriod) -> DbResult<i64> {
    let sequence: Option<i64> =
        sqlx::query_scalar("SELECT last_sequence FROM invoice_counters WHERE period = ?1")
            .bind(period.key())
            .fetch_optional(pool)
            .await?;
    Ok(sequence.unwrap_or(0))
}
