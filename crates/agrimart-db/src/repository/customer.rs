//! # Customer Repository
//!
//! Customer records and the customer ledger.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_charge(amount)    outstanding += amount                         │
//! │                          total_purchases += amount                     │
//! │                          last_purchase_at = at                         │
//! │                                                                         │
//! │  apply_payment(amount)   outstanding = max(0, outstanding - amount)    │
//! │  reverse_charge(amount)  outstanding = max(0, outstanding - amount)    │
//! │                                                                         │
//! │  A negative outstanding balance is never written.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balances are exact decimals stored as TEXT, so each adjustment is a
//! read-modify-write. It must run inside the caller's write transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use agrimart_core::validation::{validate_customer_name, validate_email, validate_phone};
use agrimart_core::{Customer, Money};

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, address, outstanding_balance, \
     total_purchases, last_purchase_at, created_at, updated_at";

/// New contact details for a customer. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Repository for customers and their running balances.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        validate_contact(
            Some(&customer.name),
            customer.phone.as_deref(),
            customer.email.as_deref(),
        )?;

        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, address,
                outstanding_balance, total_purchases, last_purchase_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.name.trim())
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.outstanding_balance.clamp_non_negative())
        .bind(customer.total_purchases)
        .bind(customer.last_purchase_at)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Lists customers by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name LIMIT ?1");
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Finds customers whose name contains `fragment` (case-insensitive).
    pub async fn find_by_name(&self, fragment: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name LIKE ?1 ORDER BY name LIMIT ?2"
        );
        let pattern = format!("%{}%", fragment.trim());
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Updates contact details. Balances are never changed here.
    pub async fn update_contact(&self, id: &str, update: &ContactUpdate) -> DbResult<Customer> {
        validate_contact(
            update.name.as_deref(),
            update.phone.as_deref(),
            update.email.as_deref(),
        )?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?2, name),
                phone = COALESCE(?3, phone),
                email = COALESCE(?4, email),
                address = COALESCE(?5, address),
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.phone)
        .bind(&update.email)
        .bind(&update.address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Ledger (transaction-scoped)
    // =========================================================================

    /// Loads a customer on an open connection or transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(customer)
    }

    async fn fetch_required(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    async fn write_balances(
        conn: &mut SqliteConnection,
        customer: &Customer,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE customers SET
                outstanding_balance = ?2,
                total_purchases = ?3,
                last_purchase_at = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(customer.outstanding_balance)
        .bind(customer.total_purchases)
        .bind(customer.last_purchase_at)
        .bind(at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Charges an issued invoice to the customer.
    ///
    /// ## Returns
    /// The new outstanding balance.
    pub async fn apply_charge(
        conn: &mut SqliteConnection,
        customer_id: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> DbResult<Money> {
        let mut customer = Self::fetch_required(conn, customer_id).await?;
        let amount = amount.clamp_non_negative();

        customer.outstanding_balance += amount;
        customer.total_purchases += amount;
        customer.last_purchase_at = Some(at);
        Self::write_balances(conn, &customer, at).await?;

        debug!(
            customer_id = %customer_id,
            amount = %amount,
            outstanding = %customer.outstanding_balance,
            "Ledger charge applied"
        );
        Ok(customer.outstanding_balance)
    }

    /// Credits a payment against the outstanding balance, clamped at zero.
    pub async fn apply_payment(
        conn: &mut SqliteConnection,
        customer_id: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> DbResult<Money> {
        Self::reduce_outstanding(conn, customer_id, amount, at, "payment").await
    }

    /// Removes an invoice's unpaid amount from the balance, clamped at zero.
    pub async fn reverse_charge(
        conn: &mut SqliteConnection,
        customer_id: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> DbResult<Money> {
        Self::reduce_outstanding(conn, customer_id, amount, at, "reversal").await
    }

    async fn reduce_outstanding(
        conn: &mut SqliteConnection,
        customer_id: &str,
        amount: Money,
        at: DateTime<Utc>,
        kind: &'static str,
    ) -> DbResult<Money> {
        let mut customer = Self::fetch_required(conn, customer_id).await?;
        let amount = amount.clamp_non_negative();
        let raw = customer.outstanding_balance - amount;

        if raw.is_negative() {
            warn!(
                customer_id = %customer_id,
                kind,
                amount = %amount,
                outstanding = %customer.outstanding_balance,
                "Ledger credit exceeds outstanding balance, clamping at zero"
            );
        }

        customer.outstanding_balance = raw.clamp_non_negative();
        Self::write_balances(conn, &customer, at).await?;

        debug!(
            customer_id = %customer_id,
            kind,
            amount = %amount,
            outstanding = %customer.outstanding_balance,
            "Ledger credit applied"
        );
        Ok(customer.outstanding_balance)
    }
}

fn validate_contact(
    name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
) -> DbResult<()> {
    if let Some(name) = name {
        validate_customer_name(name)?;
    }
    if let Some(phone) = phone {
        validate_phone(phone)?;
    }
    if let Some(email) = email {
        validate_email(email)?;
    }
    Ok(())
}
