//! # Domain Types
//!
//! Core domain types used throughout AgriMart billing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  name           │   │  invoice_number │       │
//! │  │  price, tax     │   │  outstanding    │   │  items[]        │       │
//! │  │  stock >= 0     │   │  total_purchases│   │  payments[]     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │  InvoiceStatus  │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  0 ..= 100      │   │  Draft          │   │  Cash, Card     │       │
//! │  │  2.5 = 2.5%     │   │  Unpaid         │   │  Upi            │       │
//! │  └─────────────────┘   │  PartiallyPaid  │   │  BankTransfer   │       │
//! │                        │  Paid           │   │  Cheque         │       │
//! │                        │  Cancelled      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage between 0 and 100 inclusive, used for tax rates and
/// line discounts.
///
/// Fractional rates are exact (`2.5` means 2.5%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    /// 0%.
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    /// 100%.
    pub const HUNDRED: Percent = Percent(Decimal::ONE_HUNDRED);

    /// Creates a percentage, rejecting values outside 0..=100.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValidationError::OutOfRange {
                field: "percent".to_string(),
                min: "0".to_string(),
                max: "100".to_string(),
            });
        }
        Ok(Percent(value))
    }

    /// Creates a whole-number percentage.
    pub fn from_whole(value: i64) -> Result<Self, ValidationError> {
        Percent::new(Decimal::from(value))
    }

    #[inline]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product (seed, fertilizer, pesticide, tool, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Display name, copied onto invoice lines.
    pub name: String,

    /// Free-form category ("Fertilizer", "Seeds", ...).
    pub category: Option<String>,

    /// Selling unit ("bag", "kg", "litre").
    pub unit: String,

    /// Default selling price per unit.
    pub price: Money,

    /// Purchase cost per unit.
    pub cost_price: Money,

    /// Tax rate charged on invoice lines.
    pub tax_rate: Percent,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Inactive products cannot be invoiced (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with zero stock.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        price: Money,
        tax_rate: Percent,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            category: None,
            unit: unit.into(),
            price,
            cost_price: Money::ZERO,
            tax_rate,
            stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_cost_price(mut self, cost_price: Money) -> Self {
        self.cost_price = cost_price;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Checks whether `quantity` units are on hand.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running account.
///
/// `outstanding_balance` is what the customer owes across all issued
/// invoices; it is clamped at zero and never persisted negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub outstanding_balance: Money,
    /// Cumulative charged amount. Never decreases.
    pub total_purchases: Money,
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with an empty account.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Customer {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            outstanding_balance: Money::ZERO,
            total_purchases: Money::ZERO,
            last_purchase_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle state of an invoice.
///
/// ```text
///   Draft ──issue──► Unpaid ──pay──► PartiallyPaid ──pay──► Paid
///     │                │                  │
///     └──── cancel ────┴───── cancel ─────┴──► Cancelled
/// ```
/// `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Saved but not yet issued; stock is held, the ledger is untouched.
    Draft,
    /// Issued, nothing paid.
    Unpaid,
    /// Issued, some payments recorded.
    PartiallyPaid,
    /// Fully settled.
    Paid,
    /// Voided; stock and ledger effects reversed.
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Unpaid,
        InvoiceStatus::PartiallyPaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// No further transition is possible.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// The invoice has been charged to the customer's ledger.
    #[inline]
    pub fn is_issued(&self) -> bool {
        !matches!(self, InvoiceStatus::Draft)
    }

    /// Payments may be recorded in this state.
    #[inline]
    pub fn accepts_payment(&self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown invoice status '{}'", s),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the common spellings cashiers type ("bank transfer", "check").
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "bank_transfer" | "bank transfer" | "bank" | "neft" => Ok(PaymentMethod::BankTransfer),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            other => Err(ValidationError::InvalidFormat {
                field: "method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Invoice Line Item
// =============================================================================

/// A line on an invoice.
/// Uses the snapshot pattern: name, price and rates are frozen at creation
/// and the line is never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLineItem {
    pub id: String,
    pub invoice_id: String,
    /// Position on the invoice, starting at 1.
    pub line_no: i64,
    pub product_id: String,
    /// Product name at time of invoicing (frozen).
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_percent: Percent,
    pub tax_rate: Percent,
    /// `quantity × unit_price × (1 - discount/100)`.
    pub line_subtotal: Money,
    /// `line_subtotal × tax_rate/100`.
    pub line_tax: Money,
    pub line_total: Money,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards an invoice. Payment history is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    /// External reference (UPI transaction id, cheque number, ...).
    pub reference: Option<String>,
    /// Who took the payment.
    pub recorded_by: Option<String>,
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// The invoice aggregate: header, line items and payment history.
///
/// ## Money Fields
/// ```text
/// subtotal         Σ line_subtotal
/// discount_amount  invoice-level discount
/// tax_amount       Σ line_tax
/// shipping_amount  delivery charge
/// round_off        total - unrounded total (may be negative)
/// total            rounded to whole units
/// amount_paid      Σ payments
/// balance          total - amount_paid
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    /// `INV-YYYYMM-NNNN`, unique.
    pub invoice_number: String,
    pub customer_id: String,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub round_off: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub notes: Option<String>,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the invoice was charged to the ledger; `None` for drafts.
    pub issued_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped on every header update.
    pub version: i64,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<InvoiceLineItem>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub payments: Vec<Payment>,
}

impl Invoice {
    /// Issued, not settled, and past its due date on `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.accepts_payment() && self.balance.is_positive() && self.due_date < today
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::new(dec!(0)).is_ok());
        assert!(Percent::new(dec!(100)).is_ok());
        assert!(Percent::new(dec!(2.5)).is_ok());
        assert!(Percent::new(dec!(-0.01)).is_err());
        assert!(Percent::new(dec!(100.01)).is_err());
    }

    #[test]
    fn test_percent_deserialize_validates() {
        let ok: Percent = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.as_decimal(), dec!(12.5));
        assert!(serde_json::from_str::<Percent>("\"120\"").is_err());
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert_eq!(
            "Partially-Paid".parse::<InvoiceStatus>().unwrap(),
            InvoiceStatus::PartiallyPaid
        );
        assert!("refunded".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_status_predicates() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
        assert!(!InvoiceStatus::Draft.is_issued());
        assert!(InvoiceStatus::PartiallyPaid.accepts_payment());
        assert!(!InvoiceStatus::Draft.accepts_payment());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!("check".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cheque);
        assert_eq!(
            "bank transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!("barter".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_product_can_supply() {
        let product = Product::new("UREA-50", "Urea 50kg", "bag", Money::from_major(300), Percent::ZERO)
            .with_stock(5);
        assert!(product.can_supply(5));
        assert!(!product.can_supply(6));
    }
}
