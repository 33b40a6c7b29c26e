//! # Billing Error Types
//!
//! One error type for every engine operation, with a stable machine-readable
//! code for the request layer.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                              BillingError        Code   HTTP   │
//! │  ──────                              ────────────        ────   ────   │
//! │  ValidationError, non-positive pay   Validation          400           │
//! │  CoreError::PaymentExceedsBalance    PaymentExceeds...   400           │
//! │  DbError::NotFound                   NotFound            404           │
//! │  InsufficientStock (core or db)      InsufficientStock   409           │
//! │  CoreError::InvalidTransition        InvalidTransition   400           │
//! │  Unique / version / busy / pool      Conflict            409 (retry)   │
//! │  anything else from the database     Database            500           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use agrimart_core::{CoreError, InvoiceAction, InvoiceStatus, Money, ValidationError};
use agrimart_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for engine operations.
pub type BillingResult<T> = Result<T, BillingError>;

/// Errors returned by the billing engine.
///
/// Any error aborts the operation's transaction: nothing it wrote survives.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Input rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced customer, product or invoice does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A line asks for more than is on the shelf.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The invoice's status does not allow the operation.
    #[error("Invoice {invoice_number} is {status}, cannot {action}")]
    InvalidTransition {
        invoice_number: String,
        status: InvoiceStatus,
        action: InvoiceAction,
    },

    /// Payment larger than what the invoice still owes. Shares the
    /// `InvalidTransition` code: the invoice's state refuses the amount.
    #[error("Payment of {amount} exceeds outstanding balance {balance}")]
    PaymentExceedsBalance { amount: Money, balance: Money },

    /// Lost a race with another writer. Safe to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Error codes for the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Not enough stock (409)
    InsufficientStock,

    /// Operation not allowed in the invoice's status (400)
    InvalidTransition,

    /// Concurrent modification, retry (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,
}

/// Serializable error body: `{ "code": "NOT_FOUND", "message": "..." }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl BillingError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Validation(_) => ErrorCode::ValidationError,
            BillingError::NotFound { .. } => ErrorCode::NotFound,
            BillingError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            BillingError::InvalidTransition { .. } | BillingError::PaymentExceedsBalance { .. } => {
                ErrorCode::InvalidTransition
            }
            BillingError::Conflict(_) => ErrorCode::Conflict,
            BillingError::Database(_) => ErrorCode::DatabaseError,
        }
    }

    /// HTTP-style status for the request layer.
    pub fn http_status(&self) -> u16 {
        match self.code() {
            ErrorCode::ValidationError | ErrorCode::InvalidTransition => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => 409,
            ErrorCode::DatabaseError => 500,
        }
    }

    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Conflict(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<CoreError> for BillingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => BillingError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::InvalidTransition {
                invoice_number,
                status,
                action,
            } => BillingError::InvalidTransition {
                invoice_number,
                status,
                action,
            },
            CoreError::PaymentExceedsBalance { amount, balance } => {
                BillingError::PaymentExceedsBalance { amount, balance }
            }
            CoreError::InvalidPaymentAmount { .. } => BillingError::Validation(err.to_string()),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BillingError::NotFound { entity, id },
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => BillingError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            DbError::Invalid(e) => e.into(),
            DbError::ForeignKeyViolation { message } => {
                BillingError::Validation(format!("Invalid reference: {}", message))
            }
            DbError::CheckViolation { message } => BillingError::Validation(message),
            err if err.is_conflict() => BillingError::Conflict(err.to_string()),
            other => {
                tracing::error!(error = %other, "Database operation failed");
                BillingError::Database(other.to_string())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_are_retryable() {
        let busy: BillingError = DbError::Busy("database is locked".into()).into();
        assert_eq!(busy.code(), ErrorCode::Conflict);
        assert_eq!(busy.http_status(), 409);
        assert!(busy.is_retryable());

        let duplicate: BillingError = DbError::duplicate("invoice_number", "INV-202403-0001").into();
        assert!(duplicate.is_retryable());

        let version: BillingError = DbError::VersionConflict {
            entity: "Invoice".into(),
            id: "abc".into(),
            expected: 3,
        }
        .into();
        assert!(version.is_retryable());
    }

    #[test]
    fn test_transition_maps_to_bad_request() {
        let core = CoreError::InvalidTransition {
            invoice_number: "INV-202403-0001".into(),
            status: InvoiceStatus::Paid,
            action: InvoiceAction::Cancel,
        };
        let err: BillingError = core.into();
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        assert_eq!(err.http_status(), 400);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Invoice INV-202403-0001 is paid, cannot cancel");
    }

    #[test]
    fn test_overpayment_keeps_amounts() {
        let core = CoreError::PaymentExceedsBalance {
            amount: Money::from_major(501),
            balance: Money::from_major(500),
        };
        let err: BillingError = core.into();
        assert!(matches!(
            err,
            BillingError::PaymentExceedsBalance { amount, balance }
                if amount == Money::from_major(501) && balance == Money::from_major(500)
        ));
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        assert_eq!(err.http_status(), 400);
        assert!(!err.is_retryable());

        let json = serde_json::to_string(&err.to_body()).unwrap();
        assert!(json.contains("\"code\":\"INVALID_TRANSITION\""));
    }

    #[test]
    fn test_error_body_serialization() {
        let err = BillingError::not_found("Customer", "c-1");
        let json = serde_json::to_string(&err.to_body()).unwrap();
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
        assert!(json.contains("Customer not found: c-1"));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_stock_errors_keep_details() {
        let err: BillingError = DbError::InsufficientStock {
            product_id: "p-1".into(),
            available: 0,
            requested: 1,
        }
        .into();
        match err {
            BillingError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
