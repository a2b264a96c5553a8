//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  depot-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - Core | Db, surface of every ledger op          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (warehouse, product, shortfall)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// These errors represent hard stops a caller must handle before
/// proceeding (e.g., do not confirm a booking whose reservation failed).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reservation requested more than `on_hand - reserved`.
    ///
    /// ## When This Occurs
    /// - Two bookings racing for the last units (the loser gets this)
    /// - An expansion requesting more than the warehouse holds
    ///
    /// Recoverable: the caller can reduce quantity or pick another
    /// warehouse. Never retried automatically.
    #[error(
        "Insufficient available stock for product {product_id} at warehouse {warehouse_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientAvailableStock {
        warehouse_id: String,
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Fulfillment requested more than the open lots hold.
    ///
    /// ## When This Occurs
    /// A reservation existed, so the aggregate counter promised the stock,
    /// but the lot rows cannot cover it. That is drift between the
    /// reserved counter and lot totals - a consistency fault, surfaced to
    /// the caller and never silently retried.
    #[error(
        "Insufficient lot stock for product {product_id} at warehouse {warehouse_id}: \
         requested {requested}, short by {unfulfilled}"
    )]
    InsufficientLotStock {
        warehouse_id: String,
        product_id: String,
        requested: i64,
        unfulfilled: i64,
    },

    /// Every product in a multi-product operation failed.
    ///
    /// Raised by the orchestrator only when `success_count == 0` and at
    /// least one item was attempted; the caller must abort the enclosing
    /// business transaction.
    #[error("All {attempted} stock items failed for booking {booking_id}")]
    AllItemsFailed { booking_id: String, attempted: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before ledger logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., non-finite quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_insufficient_available_stock_message() {
        let err = CoreError::InsufficientAvailableStock {
            warehouse_id: "wh-east".to_string(),
            product_id: "prod-17".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient available stock for product prod-17 at warehouse wh-east: \
             available 3, requested 5"
        );
    }

    #[test]
    fn test_insufficient_lot_stock_message() {
        let err = CoreError::InsufficientLotStock {
            warehouse_id: "wh-east".to_string(),
            product_id: "prod-17".to_string(),
            requested: 10,
            unfulfilled: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient lot stock for product prod-17 at warehouse wh-east: \
             requested 10, short by 4"
        );
    }

    #[test]
    fn test_all_items_failed_message() {
        let err = CoreError::AllItemsFailed {
            booking_id: "bkg-9".to_string(),
            attempted: 3,
        };
        assert_eq!(err.to_string(), "All 3 stock items failed for booking bkg-9");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
