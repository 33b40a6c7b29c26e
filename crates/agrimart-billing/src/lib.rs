//! # agrimart-billing: Billing Engine for AgriMart
//!
//! Orchestrates the invoice lifecycle on top of `agrimart-core` (rules)
//! and `agrimart-db` (storage).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Request layer (HTTP handlers, CLI)                                    │
//! │       │  CreateInvoiceCommand / RecordPaymentCommand / ...             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 agrimart-billing (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   BillingEngine ──► one transaction per operation               │   │
//! │  │        │                                                        │   │
//! │  │        ├── Clock                  (system / fixed)              │   │
//! │  │        ├── NotificationDispatcher (log / noop / custom)         │   │
//! │  │        └── BillingConfig          (defaults, TOML, env)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  agrimart-core                       agrimart-db                        │
//! │  totals, state machine               products, customers, invoices,    │
//! │  numbering, validation               stock reservations, counters      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agrimart_billing::{BillingConfig, BillingEngine, CreateInvoiceCommand, InvoiceLineCommand};
//!
//! let config = BillingConfig::load(None)?;
//! let db = agrimart_db::Database::new(config.db_config()).await?;
//! let engine = BillingEngine::from_config(db, &config);
//!
//! let invoice = engine
//!     .create_invoice(CreateInvoiceCommand::new(customer_id, vec![InvoiceLineCommand::new(dap_id, 2)]))
//!     .await?
//!     .into_value();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{
    CreateInvoiceCommand, InvoiceLineCommand, RecordPaymentCommand, StatusContext,
    UpdateInvoiceCommand,
};
pub use config::{BillingConfig, ConfigError};
pub use engine::{BillingEngine, BillingWarning, Committed};
pub use error::{BillingError, BillingResult, ErrorBody, ErrorCode};
pub use notify::{BillingEvent, LogDispatcher, NoopDispatcher, NotificationDispatcher, NotifyError};
