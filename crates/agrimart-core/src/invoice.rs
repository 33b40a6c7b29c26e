//! # Invoice Lifecycle
//!
//! Building invoices from drafts and moving them through their states.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Draft ──issue──► Unpaid ──payment──► PartiallyPaid ──payment──► Paid │
//! │     │                │  └────────── payment (full) ─────────────► Paid │
//! │     │                │                     │                            │
//! │     └─────cancel─────┴───────cancel────────┴──────────────► Cancelled  │
//! │                                                                         │
//! │   mark paid: Draft | Unpaid | PartiallyPaid ──► Paid                   │
//! │   delete:    any state while amount_paid == 0                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each transition mutates the in-memory [`Invoice`] and reports the ledger
//! effect it implies. Applying stock and ledger effects is the billing
//! engine's job, inside one database transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::numbering::InvoiceNumber;
use crate::totals::{InvoiceTotals, LineAmounts, LineInput};
use crate::types::{Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentMethod, Percent};
use crate::validation::{
    validate_adjustment, validate_line_count, validate_notes, validate_quantity,
    validate_unit_price,
};

// =============================================================================
// Invoice Action
// =============================================================================

/// An operation attempted on an invoice, used in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceAction {
    Issue,
    RecordPayment,
    MarkPaid,
    Cancel,
    Delete,
    UpdateDetails,
    /// Direct status change to a state only reachable as a side effect.
    SetStatus(InvoiceStatus),
}

impl InvoiceAction {
    /// Action a direct status change to `target` performs.
    pub fn for_target(target: InvoiceStatus) -> InvoiceAction {
        match target {
            InvoiceStatus::Unpaid => InvoiceAction::Issue,
            InvoiceStatus::Paid => InvoiceAction::MarkPaid,
            InvoiceStatus::Cancelled => InvoiceAction::Cancel,
            other => InvoiceAction::SetStatus(other),
        }
    }
}

impl fmt::Display for InvoiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceAction::Issue => f.write_str("issue"),
            InvoiceAction::RecordPayment => f.write_str("record payment"),
            InvoiceAction::MarkPaid => f.write_str("mark paid"),
            InvoiceAction::Cancel => f.write_str("cancel"),
            InvoiceAction::Delete => f.write_str("delete"),
            InvoiceAction::UpdateDetails => f.write_str("update details"),
            InvoiceAction::SetStatus(status) => write!(f, "set status to {}", status),
        }
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// A priced line, resolved against the catalog but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Percent,
    pub tax_rate: Percent,
}

impl LineDraft {
    fn input(&self) -> LineInput {
        LineInput {
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            tax_rate: self.tax_rate,
        }
    }
}

/// Everything needed to build an invoice except its number.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub customer_id: String,
    pub lines: Vec<LineDraft>,
    /// Invoice-level discount, absolute amount.
    pub discount: Money,
    pub shipping: Money,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    /// `false` saves the invoice as a draft.
    pub issue: bool,
}

impl InvoiceDraft {
    /// Checks the draft's own fields. Stock and catalog checks need the
    /// database and happen in the engine.
    pub fn validate(&self) -> CoreResult<()> {
        if self.customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }

        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_unit_price(line.unit_price)?;
        }
        validate_adjustment("discount", self.discount)?;
        validate_adjustment("shipping", self.shipping)?;

        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }

        Ok(())
    }

    /// Computes line amounts and invoice totals.
    pub fn totals(&self) -> CoreResult<(Vec<LineAmounts>, InvoiceTotals)> {
        let amounts: Vec<LineAmounts> = self
            .lines
            .iter()
            .map(|line| LineAmounts::compute(&line.input()))
            .collect::<CoreResult<_>>()?;
        let totals = InvoiceTotals::compute(&amounts, self.discount, self.shipping)?;
        Ok((amounts, totals))
    }

    /// Builds the invoice aggregate.
    ///
    /// ## Returns
    /// - `Draft` when `issue` is false
    /// - `Paid` for an issued invoice whose total is zero
    /// - `Unpaid` otherwise
    pub fn into_invoice(self, number: InvoiceNumber, now: DateTime<Utc>) -> CoreResult<Invoice> {
        self.validate()?;
        let (amounts, totals) = self.totals()?;

        let invoice_id = uuid::Uuid::new_v4().to_string();

        let items = self
            .lines
            .into_iter()
            .zip(amounts)
            .enumerate()
            .map(|(index, (line, amounts))| InvoiceLineItem {
                id: uuid::Uuid::new_v4().to_string(),
                invoice_id: invoice_id.clone(),
                line_no: index as i64 + 1,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percent: line.discount,
                tax_rate: line.tax_rate,
                line_subtotal: amounts.subtotal,
                line_tax: amounts.tax,
                line_total: amounts.total,
            })
            .collect();

        let status = match (self.issue, totals.total.is_zero()) {
            (false, _) => InvoiceStatus::Draft,
            (true, true) => InvoiceStatus::Paid,
            (true, false) => InvoiceStatus::Unpaid,
        };

        Ok(Invoice {
            id: invoice_id,
            invoice_number: number.to_string(),
            customer_id: self.customer_id,
            status,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            shipping_amount: totals.shipping_amount,
            round_off: totals.round_off,
            total: totals.total,
            amount_paid: Money::ZERO,
            balance: totals.total,
            notes: self.notes,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
            issued_at: self.issue.then_some(now),
            cancelled_at: None,
            version: 1,
            items,
            payments: Vec::new(),
        })
    }
}

// =============================================================================
// Transition Effects
// =============================================================================

/// Ledger effect of settling an invoice in full.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Amount newly charged because a draft was issued on the way.
    pub charged: Option<Money>,
    /// Settlement payment appended for the remaining balance.
    pub payment: Option<Payment>,
}

/// Details for a payment about to be recorded.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub recorded_by: Option<String>,
}

// =============================================================================
// Transitions
// =============================================================================

impl Invoice {
    fn reject(&self, action: InvoiceAction) -> CoreError {
        CoreError::InvalidTransition {
            invoice_number: self.invoice_number.clone(),
            status: self.status,
            action,
        }
    }

    /// Unpaid amount still owed on the customer's ledger.
    pub fn outstanding(&self) -> Money {
        if self.status.is_issued() && self.status != InvoiceStatus::Cancelled {
            self.balance.clamp_non_negative()
        } else {
            Money::ZERO
        }
    }

    fn refresh_payment_status(&mut self) {
        self.balance = self.total - self.amount_paid;
        self.status = if !self.balance.is_positive() {
            InvoiceStatus::Paid
        } else if self.amount_paid.is_positive() {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Unpaid
        };
    }

    /// Issues a draft.
    ///
    /// ## Returns
    /// The amount to charge to the customer's ledger (the invoice total).
    pub fn issue(&mut self, now: DateTime<Utc>) -> CoreResult<Money> {
        if self.status != InvoiceStatus::Draft {
            return Err(self.reject(InvoiceAction::Issue));
        }

        self.issued_at = Some(now);
        self.updated_at = now;
        self.refresh_payment_status();
        Ok(self.total)
    }

    /// Appends a payment.
    ///
    /// ## Rules
    /// - only `Unpaid` and `PartiallyPaid` invoices accept payments
    /// - `0 < amount <= balance`
    ///
    /// ## Returns
    /// The appended payment. Its amount is what the ledger is credited.
    pub fn apply_payment(
        &mut self,
        details: PaymentDetails,
        now: DateTime<Utc>,
    ) -> CoreResult<&Payment> {
        if !self.status.accepts_payment() {
            return Err(self.reject(InvoiceAction::RecordPayment));
        }

        if !details.amount.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("{} is not a positive amount", details.amount),
            });
        }
        if details.amount > self.balance {
            return Err(CoreError::PaymentExceedsBalance {
                amount: details.amount,
                balance: self.balance,
            });
        }

        self.payments.push(Payment {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id: self.id.clone(),
            amount: details.amount,
            method: details.method,
            reference: details.reference,
            recorded_by: details.recorded_by,
            paid_at: now,
        });
        self.amount_paid += details.amount;
        self.updated_at = now;
        self.refresh_payment_status();

        let last = self.payments.len() - 1;
        Ok(&self.payments[last])
    }

    /// Marks the invoice paid in full.
    ///
    /// A draft is issued first. The remaining balance is recorded as a
    /// settlement payment so that `amount_paid` always equals the sum of
    /// payments. An already paid invoice is left untouched.
    pub fn settle_in_full(
        &mut self,
        method: PaymentMethod,
        reference: Option<String>,
        recorded_by: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Settlement> {
        match self.status {
            InvoiceStatus::Cancelled => return Err(self.reject(InvoiceAction::MarkPaid)),
            InvoiceStatus::Paid => {
                return Ok(Settlement {
                    charged: None,
                    payment: None,
                })
            }
            _ => {}
        }

        let charged = if self.status == InvoiceStatus::Draft {
            Some(self.issue(now)?)
        } else {
            None
        };

        let payment = if self.balance.is_positive() {
            let details = PaymentDetails {
                amount: self.balance,
                method,
                reference,
                recorded_by,
            };
            Some(self.apply_payment(details, now)?.clone())
        } else {
            self.refresh_payment_status();
            None
        };

        Ok(Settlement { charged, payment })
    }

    /// Cancels the invoice.
    ///
    /// ## Returns
    /// The unpaid amount to reverse on the customer's ledger (zero for
    /// drafts, which were never charged).
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<Money> {
        if self.status.is_terminal() {
            return Err(self.reject(InvoiceAction::Cancel));
        }

        let reversal = self.outstanding();
        self.status = InvoiceStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(reversal)
    }

    /// Checks that the invoice may be deleted.
    ///
    /// ## Returns
    /// The unpaid amount to reverse on the customer's ledger: zero for
    /// drafts and cancelled invoices.
    pub fn ensure_deletable(&self) -> CoreResult<Money> {
        if self.amount_paid.is_positive() || !self.payments.is_empty() {
            return Err(self.reject(InvoiceAction::Delete));
        }
        Ok(self.outstanding())
    }

    /// Changes the due date and/or notes.
    ///
    /// `notes: Some(None)` clears the notes.
    pub fn update_details(
        &mut self,
        due_date: Option<NaiveDate>,
        notes: Option<Option<String>>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(self.reject(InvoiceAction::UpdateDetails));
        }

        if let Some(Some(text)) = &notes {
            validate_notes(text)?;
        }

        if let Some(due_date) = due_date {
            self.due_date = due_date;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::BillingPeriod;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
    }

    fn number() -> InvoiceNumber {
        InvoiceNumber::new(BillingPeriod::new(2026, 10).unwrap(), 1).unwrap()
    }

    fn draft(unit_price: Money, issue: bool) -> InvoiceDraft {
        InvoiceDraft {
            customer_id: "cust-1".to_string(),
            lines: vec![LineDraft {
                product_id: "prod-1".to_string(),
                product_name: "Urea 50kg".to_string(),
                quantity: 1,
                unit_price,
                discount: Percent::ZERO,
                tax_rate: Percent::ZERO,
            }],
            discount: Money::ZERO,
            shipping: Money::ZERO,
            due_date: NaiveDate::from_ymd_opt(2026, 11, 18).unwrap(),
            notes: None,
            issue,
        }
    }

    fn unpaid(total: i64) -> Invoice {
        draft(Money::from_major(total), true)
            .into_invoice(number(), now())
            .unwrap()
    }

    fn cash(amount: i64) -> PaymentDetails {
        PaymentDetails {
            amount: Money::from_major(amount),
            method: PaymentMethod::Cash,
            reference: None,
            recorded_by: None,
        }
    }

    #[test]
    fn test_into_invoice_rounds_and_sets_balance() {
        let invoice = draft(Money::new(dec!(999.995)), true)
            .into_invoice(number(), now())
            .unwrap();

        assert_eq!(invoice.invoice_number, "INV-202610-0001");
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.total, Money::from_major(1000));
        assert_eq!(invoice.round_off.amount(), dec!(0.005));
        assert_eq!(invoice.balance, Money::from_major(1000));
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].invoice_id, invoice.id);
        assert_eq!(invoice.issued_at, Some(now()));
    }

    #[test]
    fn test_zero_total_issued_invoice_is_paid() {
        let invoice = draft(Money::ZERO, true).into_invoice(number(), now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.balance.is_zero());
    }

    #[test]
    fn test_draft_is_not_issued() {
        let invoice = draft(Money::from_major(10), false)
            .into_invoice(number(), now())
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!(invoice.issued_at.is_none());
        assert!(invoice.outstanding().is_zero());
    }

    #[test]
    fn test_empty_draft_rejected() {
        let mut empty = draft(Money::from_major(10), true);
        empty.lines.clear();
        assert!(matches!(
            empty.into_invoice(number(), now()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_amounts_rejected() {
        let pricey = draft(Money::from_major(crate::MAX_UNIT_PRICE + 1), true);
        assert!(matches!(
            pricey.into_invoice(number(), now()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut shipped = draft(Money::from_major(10), true);
        shipped.shipping = Money::from_major(crate::MAX_INVOICE_ADJUSTMENT + 1);
        assert!(matches!(
            shipped.into_invoice(number(), now()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut invoice = unpaid(1000);

        invoice.apply_payment(cash(400), now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(invoice.balance, Money::from_major(600));

        invoice.apply_payment(cash(600), now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.balance.is_zero());
        assert_eq!(invoice.payments.len(), 2);
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut invoice = unpaid(1000);
        let result = invoice.apply_payment(cash(1001), now());
        assert!(matches!(result, Err(CoreError::PaymentExceedsBalance { .. })));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.payments.is_empty());
    }

    #[test]
    fn test_zero_payment_rejected() {
        let mut invoice = unpaid(1000);
        assert!(invoice.apply_payment(cash(0), now()).is_err());
        assert!(invoice.apply_payment(cash(-5), now()).is_err());
    }

    #[test]
    fn test_payment_on_draft_rejected() {
        let mut invoice = draft(Money::from_major(10), false)
            .into_invoice(number(), now())
            .unwrap();
        assert!(matches!(
            invoice.apply_payment(cash(5), now()),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_issue_draft_returns_charge() {
        let mut invoice = draft(Money::from_major(250), false)
            .into_invoice(number(), now())
            .unwrap();
        assert_eq!(invoice.issue(now()).unwrap(), Money::from_major(250));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.issue(now()).is_err());
    }

    #[test]
    fn test_settle_in_full_from_partial() {
        let mut invoice = unpaid(1000);
        invoice.apply_payment(cash(300), now()).unwrap();

        let settlement = invoice
            .settle_in_full(PaymentMethod::Upi, None, None, now())
            .unwrap();

        assert!(settlement.charged.is_none());
        assert_eq!(settlement.payment.unwrap().amount, Money::from_major(700));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.amount_paid, invoice.total);
    }

    #[test]
    fn test_settle_in_full_issues_draft() {
        let mut invoice = draft(Money::from_major(80), false)
            .into_invoice(number(), now())
            .unwrap();

        let settlement = invoice
            .settle_in_full(PaymentMethod::Cash, None, None, now())
            .unwrap();

        assert_eq!(settlement.charged, Some(Money::from_major(80)));
        assert_eq!(settlement.payment.unwrap().amount, Money::from_major(80));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_cancel_returns_unpaid_balance() {
        let mut invoice = unpaid(1000);
        invoice.apply_payment(cash(250), now()).unwrap();

        let reversal = invoice.cancel(now()).unwrap();
        assert_eq!(reversal, Money::from_major(750));
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
        assert!(invoice.cancelled_at.is_some());
    }

    #[test]
    fn test_cancel_twice_rejected() {
        let mut invoice = unpaid(100);
        invoice.cancel(now()).unwrap();
        let err = invoice.cancel(now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn test_cancel_paid_rejected() {
        let mut invoice = unpaid(100);
        invoice.apply_payment(cash(100), now()).unwrap();
        assert!(invoice.cancel(now()).is_err());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_delete_requires_no_payments() {
        let mut invoice = unpaid(100);
        assert_eq!(invoice.ensure_deletable().unwrap(), Money::from_major(100));

        invoice.apply_payment(cash(10), now()).unwrap();
        assert!(matches!(
            invoice.ensure_deletable(),
            Err(CoreError::InvalidTransition {
                action: InvoiceAction::Delete,
                ..
            })
        ));
    }

    #[test]
    fn test_update_details() {
        let mut invoice = unpaid(100);
        let due = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        invoice
            .update_details(Some(due), Some(Some("deliver to farm gate".to_string())), now())
            .unwrap();
        assert_eq!(invoice.due_date, due);
        assert_eq!(invoice.notes.as_deref(), Some("deliver to farm gate"));

        invoice.update_details(None, Some(None), now()).unwrap();
        assert!(invoice.notes.is_none());

        invoice.cancel(now()).unwrap();
        assert!(invoice.update_details(Some(due), None, now()).is_err());
    }

    #[test]
    fn test_action_for_target() {
        assert_eq!(InvoiceAction::for_target(InvoiceStatus::Paid), InvoiceAction::MarkPaid);
        assert_eq!(
            InvoiceAction::for_target(InvoiceStatus::PartiallyPaid).to_string(),
            "set status to partially_paid"
        );
    }
}
