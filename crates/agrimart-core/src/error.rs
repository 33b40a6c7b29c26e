//! # Error Types
//!
//! Domain-specific error types for agrimart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agrimart-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  agrimart-db errors                                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  agrimart-billing errors                                               │
//! │  └── BillingError     - What the request layer sees                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BillingError ← DbError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (invoice number, product ID, amounts)
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::invoice::InvoiceAction;
use crate::money::Money;
use crate::types::InvoiceStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock to cover an invoice line.
    ///
    /// ## User Workflow
    /// ```text
    /// Create invoice (5 × UREA-50KG)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The invoice's status does not allow the requested operation.
    ///
    /// ## When This Occurs
    /// - Paying a cancelled or draft invoice
    /// - Cancelling a paid invoice (refunds are handled outside billing)
    /// - Deleting an invoice that already has payments
    #[error("Invoice {invoice_number} is {status}, cannot {action}")]
    InvalidTransition {
        invoice_number: String,
        status: InvoiceStatus,
        action: InvoiceAction,
    },

    /// A payment larger than the outstanding balance.
    #[error("Payment of {amount} exceeds outstanding balance {balance}")]
    PaymentExceedsBalance { amount: Money, balance: Money },

    /// Payment amount is invalid (zero or negative).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any side effect takes place.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed invoice number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is well-formed but not acceptable in context.
    #[error("{field} is invalid: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Collection has too few or too many entries.
    #[error("{field} must contain between {min} and {max} entries")]
    BadCount {
        field: String,
        min: usize,
        max: usize,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 0, requested 1"
        );

        let err = CoreError::InvalidTransition {
            invoice_number: "INV-202610-0001".to_string(),
            status: InvoiceStatus::Paid,
            action: InvoiceAction::Cancel,
        };
        assert_eq!(
            err.to_string(),
            "Invoice INV-202610-0001 is paid, cannot cancel"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
