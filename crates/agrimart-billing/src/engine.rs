//! # Billing Engine
//!
//! Runs every invoice operation as one all-or-nothing unit of work across
//! invoices, stock and the customer ledger.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_invoice(command)                                               │
//! │                                                                         │
//! │  write_gate.lock()          one writer per database at a time          │
//! │  BEGIN                                                                  │
//! │    load customer            NotFound                                   │
//! │    load products            NotFound / inactive → Validation           │
//! │    price lines + totals     Validation (negative total, bad qty...)    │
//! │    next invoice number      counter upsert (Conflict on collision)     │
//! │    insert invoice + items                                              │
//! │    reserve stock            conditional debit → InsufficientStock      │
//! │    charge ledger            skipped for drafts                         │
//! │  COMMIT                                                                 │
//! │  release write_gate                                                    │
//! │  notify(InvoiceCreated)     failure → warning, never an error          │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Changes
//! ```text
//!            issue                 payment              payment
//!   draft ─────────► unpaid ───────────────► partially ─────────► paid
//!     │                │                       _paid                ▲
//!     │                │ mark paid (settlement payment)             │
//!     │                └────────────────────────────────────────────┘
//!     │ cancel           │ cancel                │ cancel
//!     ▼                  ▼                       ▼
//!                       cancelled (stock released, unpaid balance reversed)
//! ```

use chrono::{DateTime, Days, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use agrimart_core::invoice::PaymentDetails;
use agrimart_core::{
    BillingPeriod, Invoice, InvoiceAction, InvoiceDraft, InvoiceStatus, LineDraft, Money,
    DEFAULT_DUE_DAYS,
};
use agrimart_db::repository::counter;
use agrimart_db::{
    CustomerRepository, Database, DbError, DbTransaction, InvoiceRepository, ProductRepository,
    StockRepository,
};

use crate::clock::{Clock, SystemClock};
use crate::commands::{
    CreateInvoiceCommand, RecordPaymentCommand, StatusContext, UpdateInvoiceCommand,
};
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::notify::{BillingEvent, LogDispatcher, NoopDispatcher, NotificationDispatcher};

type Tx = DbTransaction;

// =============================================================================
// Results
// =============================================================================

/// Something that went wrong after the operation committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingWarning {
    NotificationFailed { event: String, reason: String },
}

/// A committed operation's result plus any post-commit warnings.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub warnings: Vec<BillingWarning>,
}

impl<T> Committed<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The billing engine. Cheap to clone: clones share the database pool and
/// the write gate.
///
/// ## Usage
/// ```rust,ignore
/// let engine = BillingEngine::new(db).with_dispatcher(Arc::new(LogDispatcher::default()));
///
/// let created = engine
///     .create_invoice(CreateInvoiceCommand::new(customer_id, vec![
///         InvoiceLineCommand::new(urea_id, 5),
///     ]))
///     .await?;
/// println!("{}", created.value.invoice_number); // INV-202403-0001
/// ```
#[derive(Clone)]
pub struct BillingEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    default_due_days: u32,
    write_gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for BillingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingEngine")
            .field("db", &self.db)
            .field("default_due_days", &self.default_due_days)
            .finish_non_exhaustive()
    }
}

impl BillingEngine {
    /// Creates an engine with the system clock and no notifications.
    pub fn new(db: Database) -> Self {
        BillingEngine {
            db,
            clock: Arc::new(SystemClock),
            dispatcher: Arc::new(NoopDispatcher),
            default_due_days: DEFAULT_DUE_DAYS,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Creates an engine from loaded configuration.
    pub fn from_config(db: Database, config: &BillingConfig) -> Self {
        let engine = BillingEngine::new(db).with_due_days(config.billing.default_due_days);
        if config.billing.notifications_enabled {
            engine.with_dispatcher(Arc::new(LogDispatcher::new(config.store.name.clone())))
        } else {
            engine
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_due_days(mut self, days: u32) -> Self {
        self.default_due_days = days;
        self
    }

    /// The underlying database, for read-only queries.
    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Creates an invoice, issued or as a draft.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown customer or product
    /// - `Validation` for bad lines, an inactive product or a negative total
    /// - `InsufficientStock` if any product cannot cover its (summed) lines
    /// - `Conflict` if another writer got in the way
    pub async fn create_invoice(
        &self,
        command: CreateInvoiceCommand,
    ) -> BillingResult<Committed<Invoice>> {
        command.validate_ids()?;

        let invoice = {
            let _gate = self.write_gate.lock().await;
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            let invoice = self.create_in(&mut tx, command, now).await?;
            commit(tx).await?;
            invoice
        };

        info!(
            invoice_number = %invoice.invoice_number,
            customer_id = %invoice.customer_id,
            status = %invoice.status,
            total = %invoice.total,
            lines = invoice.items.len(),
            "Invoice created"
        );

        let warnings = self
            .notify(BillingEvent::InvoiceCreated {
                invoice_id: invoice.id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                customer_id: invoice.customer_id.clone(),
                status: invoice.status,
                total: invoice.total,
            })
            .await;

        Ok(Committed {
            value: invoice,
            warnings,
        })
    }

    /// Records a payment against an issued invoice.
    ///
    /// ## Errors
    /// - `InvalidTransition` unless the invoice is unpaid or partially paid
    /// - `Validation` for a non-positive amount
    /// - `PaymentExceedsBalance` when the amount is above the balance
    pub async fn record_payment(
        &self,
        command: RecordPaymentCommand,
    ) -> BillingResult<Committed<Invoice>> {
        let (invoice, payment) = {
            let _gate = self.write_gate.lock().await;
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;

            let mut invoice = load(&mut tx, &command.invoice_id).await?;
            let payment = invoice
                .apply_payment(
                    PaymentDetails {
                        amount: command.amount,
                        method: command.method,
                        reference: command.reference,
                        recorded_by: command.recorded_by,
                    },
                    now,
                )?
                .clone();

            InvoiceRepository::update_header_in(&mut tx, &mut invoice).await?;
            InvoiceRepository::add_payment_in(&mut tx, &payment).await?;
            CustomerRepository::apply_payment(&mut tx, &invoice.customer_id, payment.amount, now)
                .await?;

            commit(tx).await?;
            (invoice, payment)
        };

        info!(
            invoice_number = %invoice.invoice_number,
            amount = %payment.amount,
            method = %payment.method,
            balance = %invoice.balance,
            status = %invoice.status,
            "Payment recorded"
        );

        let warnings = self.notify(payment_event(&invoice, &payment)).await;
        Ok(Committed {
            value: invoice,
            warnings,
        })
    }

    /// Moves an invoice to `target`.
    ///
    /// ## Targets
    /// - `Unpaid`: issues a draft and charges the ledger
    /// - `Paid`: settles the remaining balance (issuing a draft first);
    ///   a paid invoice is returned unchanged
    /// - `Cancelled`: same as [`cancel_invoice`](Self::cancel_invoice)
    /// - `Draft`, `PartiallyPaid`: never set directly → `InvalidTransition`
    pub async fn set_status(
        &self,
        invoice_id: &str,
        target: InvoiceStatus,
        context: StatusContext,
    ) -> BillingResult<Committed<Invoice>> {
        let (invoice, event) = {
            let _gate = self.write_gate.lock().await;
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            let mut invoice = load(&mut tx, invoice_id).await?;
            let from = invoice.status;

            let event = match target {
                InvoiceStatus::Unpaid => {
                    let charge = invoice.issue(now)?;
                    InvoiceRepository::update_header_in(&mut tx, &mut invoice).await?;
                    CustomerRepository::apply_charge(&mut tx, &invoice.customer_id, charge, now)
                        .await?;
                    None
                }
                InvoiceStatus::Paid => {
                    let settlement = invoice.settle_in_full(
                        context.method,
                        context.reference,
                        context.recorded_by,
                        now,
                    )?;

                    // Already paid: nothing to write
                    if settlement.charged.is_some() || settlement.payment.is_some() {
                        InvoiceRepository::update_header_in(&mut tx, &mut invoice).await?;
                    }

                    if let Some(charge) = settlement.charged {
                        CustomerRepository::apply_charge(
                            &mut tx,
                            &invoice.customer_id,
                            charge,
                            now,
                        )
                        .await?;
                    }
                    match settlement.payment {
                        Some(payment) => {
                            InvoiceRepository::add_payment_in(&mut tx, &payment).await?;
                            CustomerRepository::apply_payment(
                                &mut tx,
                                &invoice.customer_id,
                                payment.amount,
                                now,
                            )
                            .await?;
                            Some(payment_event(&invoice, &payment))
                        }
                        None => None,
                    }
                }
                InvoiceStatus::Cancelled => {
                    let reversed = cancel_in(&mut tx, &mut invoice, now).await?;
                    Some(cancel_event(&invoice, reversed))
                }
                InvoiceStatus::Draft | InvoiceStatus::PartiallyPaid => {
                    return Err(BillingError::InvalidTransition {
                        invoice_number: invoice.invoice_number,
                        status: invoice.status,
                        action: InvoiceAction::for_target(target),
                    });
                }
            };

            commit(tx).await?;
            info!(
                invoice_number = %invoice.invoice_number,
                from = %from,
                to = %invoice.status,
                "Invoice status changed"
            );
            (invoice, event)
        };

        let warnings = match event {
            Some(event) => self.notify(event).await,
            None => Vec::new(),
        };
        Ok(Committed {
            value: invoice,
            warnings,
        })
    }

    /// Cancels an invoice: stock goes back on the shelf and the unpaid
    /// balance comes off the customer's account.
    ///
    /// ## Errors
    /// - `InvalidTransition` for paid or already cancelled invoices
    pub async fn cancel_invoice(&self, invoice_id: &str) -> BillingResult<Committed<()>> {
        let (invoice, reversed) = {
            let _gate = self.write_gate.lock().await;
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            let mut invoice = load(&mut tx, invoice_id).await?;
            let reversed = cancel_in(&mut tx, &mut invoice, now).await?;
            commit(tx).await?;
            (invoice, reversed)
        };

        info!(
            invoice_number = %invoice.invoice_number,
            reversed = %reversed,
            "Invoice cancelled"
        );

        let warnings = self.notify(cancel_event(&invoice, reversed)).await;
        Ok(Committed {
            value: (),
            warnings,
        })
    }

    /// Deletes an invoice that has no payments, undoing its stock and
    /// ledger effects first.
    ///
    /// ## Errors
    /// - `InvalidTransition` if any amount has been paid
    pub async fn delete_invoice(&self, invoice_id: &str) -> BillingResult<Committed<()>> {
        let invoice = {
            let _gate = self.write_gate.lock().await;
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            let invoice = load(&mut tx, invoice_id).await?;

            let reversal = invoice.ensure_deletable()?;
            StockRepository::release_in(&mut tx, &invoice.id, now).await?;
            if reversal.is_positive() {
                CustomerRepository::reverse_charge(&mut tx, &invoice.customer_id, reversal, now)
                    .await?;
            }
            InvoiceRepository::delete_in(&mut tx, &invoice.id, invoice.version).await?;

            commit(tx).await?;
            invoice
        };

        info!(
            invoice_number = %invoice.invoice_number,
            status = %invoice.status,
            "Invoice deleted"
        );
        Ok(Committed {
            value: (),
            warnings: Vec::new(),
        })
    }

    /// Changes the due date and/or notes of an invoice.
    ///
    /// ## Errors
    /// - `Validation` if the command changes nothing or the notes are too long
    /// - `InvalidTransition` for cancelled invoices
    pub async fn update_details(&self, command: UpdateInvoiceCommand) -> BillingResult<Invoice> {
        if command.is_empty() {
            return Err(BillingError::Validation(
                "Update must change the due date or the notes".to_string(),
            ));
        }

        let _gate = self.write_gate.lock().await;
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        let mut invoice = load(&mut tx, &command.invoice_id).await?;

        invoice.update_details(command.due_date, command.notes, now)?;
        InvoiceRepository::update_header_in(&mut tx, &mut invoice).await?;
        commit(tx).await?;

        debug!(invoice_number = %invoice.invoice_number, "Invoice details updated");
        Ok(invoice)
    }

    /// Loads a full invoice.
    pub async fn get_invoice(&self, invoice_id: &str) -> BillingResult<Invoice> {
        self.db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice", invoice_id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn create_in(
        &self,
        tx: &mut Tx,
        command: CreateInvoiceCommand,
        now: DateTime<Utc>,
    ) -> BillingResult<Invoice> {
        let customer = CustomerRepository::fetch(tx, &command.customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", &command.customer_id))?;

        let mut lines = Vec::with_capacity(command.lines.len());
        for line in command.lines {
            let product = ProductRepository::fetch(tx, &line.product_id)
                .await?
                .ok_or_else(|| BillingError::not_found("Product", &line.product_id))?;

            if !product.is_active {
                return Err(BillingError::Validation(format!(
                    "Product {} is no longer sold",
                    product.sku
                )));
            }

            lines.push(LineDraft {
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: line.unit_price.unwrap_or(product.price),
                discount: line.discount,
                tax_rate: product.tax_rate,
            });
        }

        let due_date = match command.due_date {
            Some(date) => date,
            None => now
                .date_naive()
                .checked_add_days(Days::new(u64::from(self.default_due_days)))
                .ok_or_else(|| BillingError::Validation("Due date out of range".to_string()))?,
        };

        let draft = InvoiceDraft {
            customer_id: customer.id,
            lines,
            discount: command.discount,
            shipping: command.shipping,
            due_date,
            notes: command.notes,
            issue: !command.draft,
        };
        // Reject bad input before a number is allocated
        draft.validate()?;
        draft.totals()?;

        let number = counter::next_invoice_number(tx, BillingPeriod::from_datetime(now)).await?;
        let invoice = draft.into_invoice(number, now)?;

        InvoiceRepository::insert_in(tx, &invoice).await?;

        let holds: Vec<(&str, i64)> = invoice
            .items
            .iter()
            .map(|item| (item.product_id.as_str(), item.quantity))
            .collect();
        StockRepository::reserve_in(tx, &invoice.id, &holds, now).await?;

        if invoice.status.is_issued() {
            CustomerRepository::apply_charge(tx, &invoice.customer_id, invoice.total, now).await?;
        }

        Ok(invoice)
    }

    /// Sends an event, turning a failure into a warning.
    async fn notify(&self, event: BillingEvent) -> Vec<BillingWarning> {
        match self.dispatcher.dispatch(&event).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!(
                    event = event.kind(),
                    invoice_number = %event.invoice_number(),
                    error = %e,
                    "Notification failed after commit"
                );
                vec![BillingWarning::NotificationFailed {
                    event: event.kind().to_string(),
                    reason: e.to_string(),
                }]
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn load(tx: &mut Tx, invoice_id: &str) -> BillingResult<Invoice> {
    InvoiceRepository::fetch(tx, invoice_id)
        .await?
        .ok_or_else(|| BillingError::not_found("Invoice", invoice_id))
}

async fn commit(tx: Tx) -> BillingResult<()> {
    tx.commit().await.map_err(DbError::from)?;
    Ok(())
}

/// Cancels inside an open transaction.
///
/// ## Returns
/// The amount taken off the customer's outstanding balance.
async fn cancel_in(tx: &mut Tx, invoice: &mut Invoice, now: DateTime<Utc>) -> BillingResult<Money> {
    let reversal = invoice.cancel(now)?;

    InvoiceRepository::update_header_in(tx, invoice).await?;
    let released = StockRepository::release_in(tx, &invoice.id, now).await?;
    if reversal.is_positive() {
        CustomerRepository::reverse_charge(tx, &invoice.customer_id, reversal, now).await?;
    }

    debug!(
        invoice_number = %invoice.invoice_number,
        holds = released.len(),
        reversal = %reversal,
        "Cancellation effects applied"
    );
    Ok(reversal)
}

fn payment_event(invoice: &Invoice, payment: &agrimart_core::Payment) -> BillingEvent {
    BillingEvent::PaymentRecorded {
        invoice_id: invoice.id.clone(),
        invoice_number: invoice.invoice_number.clone(),
        customer_id: invoice.customer_id.clone(),
        amount: payment.amount,
        method: payment.method,
        balance: invoice.balance,
        status: invoice.status,
    }
}

fn cancel_event(invoice: &Invoice, reversed: Money) -> BillingEvent {
    BillingEvent::InvoiceCancelled {
        invoice_id: invoice.id.clone(),
        invoice_number: invoice.invoice_number.clone(),
        customer_id: invoice.customer_id.clone(),
        reversed,
    }
}
