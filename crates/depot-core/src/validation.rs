//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (booking workflow, expansion)                         │
//! │  └── Supplies directory-backed ids and expanded quantities             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any SQL runs)                            │
//! │  └── Non-empty keys, positive bounded quantities                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── CHECK constraints (on_hand >= 0, reserved <= on_hand)             │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different failure class        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ID_LENGTH, MAX_REQUEST_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LENGTH,
        });
    }

    Ok(())
}

/// Validates a warehouse identifier.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most [`MAX_ID_LENGTH`] characters
pub fn validate_warehouse_id(id: &str) -> ValidationResult<()> {
    validate_id("warehouse_id", id)
}

/// Validates a product identifier.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    validate_id("product_id", id)
}

/// Validates a business reference identifier (e.g. a booking id).
pub fn validate_ref_id(id: &str) -> ValidationResult<()> {
    validate_id("ref_id", id)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity for a ledger operation.
///
/// ## Rules
/// - Must be positive (> 0); zero-quantity operations are a caller bug
/// - Must not exceed [`MAX_REQUEST_QUANTITY`]
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_REQUEST_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_REQUEST_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit cost in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (returns carry no cost basis)
pub fn validate_unit_cost_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_cost_cents".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ids() {
        assert!(validate_warehouse_id("wh-east").is_ok());
        assert!(validate_product_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_ref_id("bkg-42").is_ok());

        assert!(validate_warehouse_id("").is_err());
        assert!(validate_product_id("   ").is_err());
        assert!(validate_ref_id(&"x".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_REQUEST_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_REQUEST_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_unit_cost_cents() {
        assert!(validate_unit_cost_cents(0).is_ok());
        assert!(validate_unit_cost_cents(1250).is_ok());
        assert!(validate_unit_cost_cents(-1).is_err());
    }
}
