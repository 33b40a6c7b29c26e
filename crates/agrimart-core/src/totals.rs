//! # Invoice Totals
//!
//! Line and invoice arithmetic. Totals are computed once, when the invoice
//! is created, and stored with it.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per line                                                               │
//! │    line_subtotal = qty × unit_price × (1 - discount/100)               │
//! │    line_tax      = line_subtotal × tax_rate/100                        │
//! │    line_total    = line_subtotal + line_tax                            │
//! │                                                                         │
//! │  Per invoice                                                            │
//! │    subtotal  = Σ line_subtotal                                         │
//! │    tax       = Σ line_tax                                              │
//! │    raw       = subtotal - discount + tax + shipping                    │
//! │    total     = round(raw)   (whole units, halves away from zero)       │
//! │    round_off = total - raw                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is rounded before the total, so `999.995` becomes `1000` with a
//! round-off of `0.005`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Percent;
use crate::validation::validate_adjustment;

// =============================================================================
// Line Amounts
// =============================================================================

/// Inputs of one priced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Percent,
    pub tax_rate: Percent,
}

/// Derived amounts of one line, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl LineAmounts {
    /// Computes a line's subtotal, tax and total.
    ///
    /// ## Errors
    /// `OutOfRange` on `line_total` when an intermediate amount overflows.
    ///
    /// ## Example
    /// ```rust
    /// use agrimart_core::money::Money;
    /// use agrimart_core::totals::{LineAmounts, LineInput};
    /// use agrimart_core::types::Percent;
    ///
    /// let amounts = LineAmounts::compute(&LineInput {
    ///     quantity: 4,
    ///     unit_price: Money::from_major(250),
    ///     discount: Percent::from_whole(10).unwrap(),
    ///     tax_rate: Percent::from_whole(5).unwrap(),
    /// })
    /// .unwrap();
    /// assert_eq!(amounts.subtotal, Money::from_major(900));
    /// assert_eq!(amounts.tax, Money::from_major(45));
    /// assert_eq!(amounts.total, Money::from_major(945));
    /// ```
    pub fn compute(input: &LineInput) -> CoreResult<Self> {
        let amounts = input
            .unit_price
            .checked_mul_quantity(input.quantity)
            .and_then(|gross| {
                let discount = gross.checked_percent(input.discount)?;
                gross.checked_sub(discount)
            })
            .and_then(|subtotal| {
                let tax = subtotal.checked_percent(input.tax_rate)?;
                let total = subtotal.checked_add(tax)?;
                Some(LineAmounts {
                    subtotal,
                    tax,
                    total,
                })
            });

        amounts.ok_or_else(|| overflow("line_total"))
    }
}

fn overflow(field: &str) -> CoreError {
    CoreError::Validation(ValidationError::OutOfRange {
        field: field.to_string(),
        min: Money::ZERO.to_string(),
        max: Money::new(rust_decimal::Decimal::MAX).to_string(),
    })
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Aggregate amounts of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    /// `total - raw_total`; positive when rounded up.
    pub round_off: Money,
    /// Rounded to whole currency units.
    pub total: Money,
}

impl InvoiceTotals {
    /// Aggregates line amounts with the invoice-level discount and shipping.
    ///
    /// ## Errors
    /// - `discount` or `shipping` negative or above the adjustment ceiling
    /// - an amount overflows while summing
    /// - resulting total below zero (discount larger than the goods)
    pub fn compute(lines: &[LineAmounts], discount: Money, shipping: Money) -> CoreResult<Self> {
        validate_adjustment("discount", discount)?;
        validate_adjustment("shipping", shipping)?;

        let subtotal = lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.subtotal))
            .ok_or_else(|| overflow("subtotal"))?;
        let tax_amount = lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.tax))
            .ok_or_else(|| overflow("tax_amount"))?;
        let raw_total = subtotal
            .checked_sub(discount)
            .and_then(|net| net.checked_add(tax_amount))
            .and_then(|gross| gross.checked_add(shipping))
            .ok_or_else(|| overflow("total"))?;

        if raw_total.is_negative() {
            return Err(CoreError::Validation(ValidationError::invalid(
                "total",
                format!("discount {} exceeds invoice value, total would be {}", discount, raw_total),
            )));
        }

        let total = raw_total.round_to_whole();

        Ok(InvoiceTotals {
            subtotal,
            discount_amount: discount,
            tax_amount,
            shipping_amount: shipping,
            round_off: total - raw_total,
            total,
        })
    }

    /// Total before rounding.
    pub fn raw_total(&self) -> Money {
        self.total - self.round_off
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
