//! # Notifications
//!
//! Post-commit events for the outside world (SMS, email, dashboards).
//!
//! ## Delivery Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine op ──► tx.commit() ──► dispatcher.dispatch(event)              │
//! │                                     │                                   │
//! │                                     ├─ Ok   → done                      │
//! │                                     └─ Err  → warn! + BillingWarning   │
//! │                                                                         │
//! │  Events are only sent for committed work. A failed dispatch never      │
//! │  turns a committed operation into an error.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use agrimart_core::{InvoiceStatus, Money, PaymentMethod};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Something that happened to an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingEvent {
    InvoiceCreated {
        invoice_id: String,
        invoice_number: String,
        customer_id: String,
        status: InvoiceStatus,
        total: Money,
    },
    PaymentRecorded {
        invoice_id: String,
        invoice_number: String,
        customer_id: String,
        amount: Money,
        method: PaymentMethod,
        balance: Money,
        status: InvoiceStatus,
    },
    InvoiceCancelled {
        invoice_id: String,
        invoice_number: String,
        customer_id: String,
        reversed: Money,
    },
}

impl BillingEvent {
    /// Short event name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::InvoiceCreated { .. } => "invoice_created",
            BillingEvent::PaymentRecorded { .. } => "payment_recorded",
            BillingEvent::InvoiceCancelled { .. } => "invoice_cancelled",
        }
    }

    pub fn invoice_number(&self) -> &str {
        match self {
            BillingEvent::InvoiceCreated { invoice_number, .. }
            | BillingEvent::PaymentRecorded { invoice_number, .. }
            | BillingEvent::InvoiceCancelled { invoice_number, .. } => invoice_number,
        }
    }
}

/// A dispatcher could not deliver an event.
#[derive(Debug, Clone, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers billing events. Implementations must not block for long; the
/// engine awaits them after commit.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &BillingEvent) -> Result<(), NotifyError>;
}

/// Writes events to the log.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher {
    store_name: Option<String>,
}

impl LogDispatcher {
    pub fn new(store_name: impl Into<String>) -> Self {
        LogDispatcher {
            store_name: Some(store_name.into()),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &BillingEvent) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(event).map_err(|e| NotifyError(e.to_string()))?;
        info!(
            store = self.store_name.as_deref().unwrap_or("-"),
            event = event.kind(),
            invoice_number = %event.invoice_number(),
            %payload,
            "Billing event"
        );
        Ok(())
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn dispatch(&self, _event: &BillingEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
