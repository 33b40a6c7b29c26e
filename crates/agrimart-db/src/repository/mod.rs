//! # Repository Module
//!
//! Database repository implementations for AgriMart billing.
//!
//! ## Two Kinds of Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pool methods (&self)                                                  │
//! │     db.products().get_by_sku("UREA-50KG")                              │
//! │     one statement or a self-contained transaction                      │
//! │                                                                         │
//! │  Transaction-scoped functions (conn: &mut SqliteConnection)            │
//! │     StockRepository::reserve_in(&mut *tx, ...)                         │
//! │     CustomerRepository::apply_charge(&mut *tx, ...)                    │
//! │     InvoiceRepository::insert_in(&mut *tx, ...)                        │
//! │     compose into one all-or-nothing billing operation                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD, restock, conditional stock debit
//! - [`CustomerRepository`] - Customers and the outstanding-balance ledger
//! - [`InvoiceRepository`] - Invoice aggregate persistence
//! - [`StockRepository`] - Per-invoice stock reservations
//! - [`ReportRepository`] - Monthly summary, low stock, statements
//! - [`counter`] - Invoice number allocation

pub mod counter;
pub mod customer;
pub mod invoice;
pub mod product;
pub mod report;
pub mod stock;

pub use customer::{ContactUpdate, CustomerRepository};
pub use invoice::InvoiceRepository;
pub use product::ProductRepository;
pub use report::{CustomerStatement, ReportRepository, SalesSummary, StatementLine};
pub use stock::{StockRepository, StockReservation};
