//! # Engine Commands
//!
//! One typed input per engine operation. Fields a command does not carry
//! cannot be changed by it.

use chrono::NaiveDate;
use serde::Deserialize;

use agrimart_core::validation::validate_uuid;
use agrimart_core::{Money, PaymentMethod, Percent, ValidationError};

/// One requested line: which product, how many, and optional overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLineCommand {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's catalog price.
    #[serde(default)]
    pub unit_price: Option<Money>,
    /// Line discount in percent.
    #[serde(default)]
    pub discount: Percent,
}

impl InvoiceLineCommand {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        InvoiceLineCommand {
            product_id: product_id.into(),
            quantity,
            unit_price: None,
            discount: Percent::ZERO,
        }
    }

    pub fn with_unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_discount(mut self, discount: Percent) -> Self {
        self.discount = discount;
        self
    }
}

/// Create an invoice for a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceCommand {
    pub customer_id: String,
    pub lines: Vec<InvoiceLineCommand>,
    /// Invoice-level discount, absolute amount.
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub shipping: Money,
    /// Defaults to creation date plus the configured due days.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Save as a draft instead of issuing.
    #[serde(default)]
    pub draft: bool,
}

impl CreateInvoiceCommand {
    pub fn new(customer_id: impl Into<String>, lines: Vec<InvoiceLineCommand>) -> Self {
        CreateInvoiceCommand {
            customer_id: customer_id.into(),
            lines,
            discount: Money::ZERO,
            shipping: Money::ZERO,
            due_date: None,
            notes: None,
            draft: false,
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_shipping(mut self, shipping: Money) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.draft = true;
        self
    }

    /// Checks identifiers before the engine touches the database.
    pub(crate) fn validate_ids(&self) -> Result<(), ValidationError> {
        validate_uuid(&self.customer_id)?;
        for line in &self.lines {
            validate_uuid(&line.product_id)?;
        }
        Ok(())
    }
}

/// Record a (partial) payment.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentCommand {
    pub invoice_id: String,
    pub amount: Money,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

impl RecordPaymentCommand {
    pub fn new(invoice_id: impl Into<String>, amount: Money, method: PaymentMethod) -> Self {
        RecordPaymentCommand {
            invoice_id: invoice_id.into(),
            amount,
            method,
            reference: None,
            recorded_by: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn recorded_by(mut self, user: impl Into<String>) -> Self {
        self.recorded_by = Some(user.into());
        self
    }
}

/// Change an invoice's due date and/or notes. Nothing else is editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoiceCommand {
    pub invoice_id: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// `Some(None)` clears the notes.
    #[serde(default, with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateInvoiceCommand {
    pub fn new(invoice_id: impl Into<String>) -> Self {
        UpdateInvoiceCommand {
            invoice_id: invoice_id.into(),
            ..Default::default()
        }
    }

    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    pub fn clear_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.due_date.is_none() && self.notes.is_none()
    }
}

/// Extra details for a status change. Only used when the change settles
/// the invoice (target `paid`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusContext {
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

/// Distinguishes a missing field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
