//! # Quantity Module
//!
//! Whole-unit quantity policy for the stock ledger.
//!
//! ## Why Whole Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FRACTIONAL QUANTITY PROBLEM                                        │
//! │                                                                         │
//! │  Line-item expansions arrive as decimals:                               │
//! │    "service X consumes 0.5 units of product P per seat"                 │
//! │                                                                         │
//! │  But the ledger moves PHYSICAL units:                                   │
//! │    you cannot reserve half a filter cartridge                           │
//! │                                                                         │
//! │  OUR POLICY: round UP at the orchestrator boundary                      │
//! │    whole_units(0.5)  = 1   (the half-unit occupies a whole one)         │
//! │    whole_units(2.0)  = 2                                                │
//! │    whole_units(2.01) = 3                                                │
//! │                                                                         │
//! │  Rounding down would under-reserve and let two bookings promise the     │
//! │  same physical unit. Over-reservation self-corrects on release.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inside the ledger everything is `i64` whole units; this module is the
//! only place a floating-point quantity is ever touched.

use crate::error::ValidationError;
use crate::MAX_REQUEST_QUANTITY;

/// Converts a decimal quantity from a line-item expansion into whole units.
///
/// ## Rules
/// - Must be finite (NaN/infinity rejected)
/// - Must be non-negative (zero is allowed and means "nothing to move")
/// - Rounded **up** to the next whole unit
/// - Must not exceed [`MAX_REQUEST_QUANTITY`] after rounding
///
/// ## Example
/// ```rust
/// use depot_core::whole_units;
///
/// assert_eq!(whole_units(0.0).unwrap(), 0);
/// assert_eq!(whole_units(0.5).unwrap(), 1);
/// assert_eq!(whole_units(3.0).unwrap(), 3);
/// assert_eq!(whole_units(3.2).unwrap(), 4);
/// assert!(whole_units(-1.0).is_err());
/// assert!(whole_units(f64::NAN).is_err());
/// ```
pub fn whole_units(quantity: f64) -> Result<i64, ValidationError> {
    if !quantity.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if quantity < 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    let units = quantity.ceil();

    if units > MAX_REQUEST_QUANTITY as f64 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_REQUEST_QUANTITY,
        });
    }

    Ok(units as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_values_pass_through() {
        assert_eq!(whole_units(0.0).unwrap(), 0);
        assert_eq!(whole_units(1.0).unwrap(), 1);
        assert_eq!(whole_units(250.0).unwrap(), 250);
    }

    #[test]
    fn test_fractions_round_up() {
        assert_eq!(whole_units(0.001).unwrap(), 1);
        assert_eq!(whole_units(0.5).unwrap(), 1);
        assert_eq!(whole_units(1.5).unwrap(), 2);
        assert_eq!(whole_units(7.999).unwrap(), 8);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(whole_units(-0.5).is_err());
        assert!(whole_units(-100.0).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(whole_units(f64::NAN).is_err());
        assert!(whole_units(f64::INFINITY).is_err());
        assert!(whole_units(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_bounded_by_max_request_quantity() {
        assert_eq!(
            whole_units(MAX_REQUEST_QUANTITY as f64).unwrap(),
            MAX_REQUEST_QUANTITY
        );
        assert!(whole_units(MAX_REQUEST_QUANTITY as f64 + 1.0).is_err());
    }
}
