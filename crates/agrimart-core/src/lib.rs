//! # agrimart-core: Pure Billing Logic for AgriMart
//!
//! This crate holds the invoice rules of the AgriMart agricultural store as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      AgriMart Billing Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Request layer / billing-cli                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed commands                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              agrimart-billing (BillingEngine)                   │   │
//! │  │    create, record payment, set status, cancel, delete           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agrimart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ numbering │  │   │
//! │  │   │  Product  │  │   Money   │  │ LineAmts  │  │ INV-YYYY  │  │   │
//! │  │   │  Invoice  │  │  Percent  │  │ round-off │  │  MM-NNNN  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │  invoice  │  │validation │                                 │   │
//! │  │   │  states   │  │   rules   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  agrimart-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Invoice, Payment, etc.)
//! - [`money`] - Decimal money type (exact, no floating point)
//! - [`totals`] - Line and invoice total computation with round-off
//! - [`invoice`] - Invoice drafts and the status state machine
//! - [`numbering`] - Billing periods and `INV-YYYYMM-NNNN` numbers
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, the clock is passed in
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: exact base-10 amounts, rounding only at the total
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use agrimart_core::money::Money;
//! use agrimart_core::totals::{InvoiceTotals, LineAmounts, LineInput};
//! use agrimart_core::types::Percent;
//!
//! let line = LineAmounts::compute(&LineInput {
//!     quantity: 2,
//!     unit_price: Money::from_major(500),
//!     discount: Percent::ZERO,
//!     tax_rate: Percent::from_whole(5).unwrap(),
//! })
//! .unwrap();
//!
//! let totals = InvoiceTotals::compute(&[line], Money::ZERO, Money::ZERO).unwrap();
//! assert_eq!(totals.total, Money::from_major(1050));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod numbering;
pub mod totals;
pub mod types;
pub mod validation;

#[cfg(feature = "sqlx")]
mod sql;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceAction, InvoiceDraft, LineDraft};
pub use money::Money;
pub use numbering::{BillingPeriod, InvoiceNumber};
pub use totals::{InvoiceTotals, LineAmounts, LineInput};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every invoice number.
pub const INVOICE_PREFIX: &str = "INV";

/// Maximum line items on a single invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Bulk fertilizer orders run into thousands of bags, but a six-digit
/// quantity is almost always a typing slip.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Highest accepted unit price, in whole currency units.
pub const MAX_UNIT_PRICE: i64 = 10_000_000;

/// Highest accepted invoice-level discount or shipping charge, in whole
/// currency units.
pub const MAX_INVOICE_ADJUSTMENT: i64 = 100_000_000;

/// Days between invoice creation and its due date when none is given.
pub const DEFAULT_DUE_DAYS: u32 = 30;
