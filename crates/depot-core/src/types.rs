//! # Domain Types
//!
//! Core entity types for the Depot stock ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockLevel    │   │       Lot       │   │StockTransaction │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  warehouse_id   │──┐│  id (UUID)      │──┐│  id (UUID)      │       │
//! │  │  product_id     │  ││  received_at    │  ││  kind           │       │
//! │  │  on_hand        │  ││  unit_cost_cents│  ││  quantity_delta │       │
//! │  │  reserved       │  ││  qty_remaining  │  ││  ref_type/ref_id│       │
//! │  └─────────────────┘  │└─────────────────┘  │└─────────────────┘       │
//! │                       │                     │                          │
//! │      1 level ─────────┴── N lots ───────────┴── N transactions         │
//! │             (all keyed by warehouse_id + product_id)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Pattern
//! - Stock levels are keyed by the composite (warehouse_id, product_id)
//! - Lots and transactions carry a UUID v4 `id` plus the composite key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Transaction Kind
// =============================================================================

/// The kind of a ledger transaction.
///
/// ## Sign Convention
/// ```text
/// ┌──────────────┬────────────────┬──────────────────────────────────┐
/// │ Kind         │ quantity_delta │ Affects                          │
/// ├──────────────┼────────────────┼──────────────────────────────────┤
/// │ Receipt      │ positive       │ on_hand (+), new lot             │
/// │ Reservation  │ negative       │ reserved (+), on_hand untouched  │
/// │ Release      │ positive       │ reserved (-), on_hand untouched  │
/// │ Fulfillment  │ negative       │ on_hand (-), reserved (-), lot(-)│
/// │ Return       │ positive       │ on_hand (+), new lot             │
/// └──────────────┴────────────────┴──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Stock physically received from a supplier.
    Receipt,
    /// Stock provisionally committed to an in-flight business event.
    Reservation,
    /// A reservation given back without depletion.
    Release,
    /// A reservation converted into real depletion (FIFO over lots).
    Fulfillment,
    /// Previously fulfilled stock rolled back in.
    Return,
}

impl TransactionKind {
    /// Whether this kind moves physical stock.
    ///
    /// Replaying the signed deltas of all on-hand-affecting transactions
    /// for a (warehouse, product) key must reproduce the current
    /// `on_hand`. Reservation and Release move only the reserved counter.
    pub const fn affects_on_hand(&self) -> bool {
        matches!(
            self,
            TransactionKind::Receipt | TransactionKind::Fulfillment | TransactionKind::Return
        )
    }
}

// =============================================================================
// Business Reference
// =============================================================================

/// The type of business object that caused a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    /// A customer booking (the usual caller).
    Booking,
    /// A purchase order receipt.
    PurchaseOrder,
    /// A manual stock adjustment.
    Adjustment,
}

/// Reference back to the business object that caused a stock event.
///
/// Every ledger operation records who asked for it, so the audit trail
/// can be reconciled against the booking/purchasing systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRef {
    pub ref_type: RefType,
    pub ref_id: String,
}

impl BusinessRef {
    /// Reference to a booking.
    pub fn booking(id: impl Into<String>) -> Self {
        BusinessRef {
            ref_type: RefType::Booking,
            ref_id: id.into(),
        }
    }

    /// Reference to a purchase order.
    pub fn purchase_order(id: impl Into<String>) -> Self {
        BusinessRef {
            ref_type: RefType::PurchaseOrder,
            ref_id: id.into(),
        }
    }

    /// Reference to a manual adjustment.
    pub fn adjustment(id: impl Into<String>) -> Self {
        BusinessRef {
            ref_type: RefType::Adjustment,
            ref_id: id.into(),
        }
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// Aggregate stock position for one product at one warehouse.
///
/// One row per (warehouse_id, product_id). Created lazily on first
/// receipt, never deleted, mutated by every ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLevel {
    /// Warehouse identifier (external directory reference).
    pub warehouse_id: String,

    /// Product identifier (external directory reference).
    pub product_id: String,

    /// Physically present units. Never negative.
    pub on_hand: i64,

    /// Units provisionally committed but not yet depleted. Never negative,
    /// never above `on_hand`.
    pub reserved: i64,

    /// When the level row was first created.
    pub created_at: DateTime<Utc>,

    /// When the level row was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// Units that can still be promised: `on_hand - reserved`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use depot_core::StockLevel;
    ///
    /// let level = StockLevel {
    ///     warehouse_id: "wh-1".into(),
    ///     product_id: "prod-1".into(),
    ///     on_hand: 10,
    ///     reserved: 3,
    ///     created_at: Utc::now(),
    ///     updated_at: Utc::now(),
    /// };
    /// assert_eq!(level.available(), 7);
    /// ```
    #[inline]
    pub const fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    /// Whether `qty` more units can be reserved without overselling.
    #[inline]
    pub const fn can_reserve(&self, qty: i64) -> bool {
        self.available() >= qty
    }
}

// =============================================================================
// Lot
// =============================================================================

/// A batch of stock received at one time and cost.
///
/// Lots are consumed oldest-first (FIFO) so the `unit_cost_cents` recorded
/// on each fulfillment keeps cost-basis accounting correct downstream.
/// Lots are never deleted; a fully consumed lot stays at zero remaining
/// for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Lot {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub warehouse_id: String,
    pub product_id: String,

    /// Receipt time; defines FIFO consumption order.
    pub received_at: DateTime<Utc>,

    /// Acquisition cost per unit in cents. Zero for returns with no
    /// meaningful cost basis.
    pub unit_cost_cents: i64,

    /// Units of this lot not yet consumed by fulfillment.
    pub quantity_remaining: i64,

    /// Optional supplier/batch code for physical traceability.
    pub lot_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Lot {
    /// Whether fulfillment has fully consumed this lot.
    #[inline]
    pub const fn is_depleted(&self) -> bool {
        self.quantity_remaining == 0
    }
}

// =============================================================================
// Stock Transaction
// =============================================================================

/// An immutable ledger entry for a single stock-affecting event.
///
/// Append-only: transactions are never updated or deleted. Replaying the
/// on-hand-affecting deltas (see [`TransactionKind::affects_on_hand`])
/// reproduces the current `on_hand` for the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub warehouse_id: String,
    pub product_id: String,

    /// The lot touched, when the event is lot-specific (receipt, return,
    /// fulfillment). Reservation and release are not lot-specific.
    pub lot_id: Option<String>,

    pub kind: TransactionKind,

    /// Signed quantity, per the sign convention on [`TransactionKind`].
    pub quantity_delta: i64,

    /// Cost basis of the units moved, when known.
    pub unit_cost_cents: Option<i64>,

    /// Type of the causing business object.
    pub ref_type: RefType,

    /// Identifier of the causing business object (e.g. a booking id).
    pub ref_id: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn level(on_hand: i64, reserved: i64) -> StockLevel {
        StockLevel {
            warehouse_id: "wh-1".to_string(),
            product_id: "prod-1".to_string(),
            on_hand,
            reserved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_available() {
        assert_eq!(level(10, 3).available(), 7);
        assert_eq!(level(10, 10).available(), 0);
        assert_eq!(level(0, 0).available(), 0);
    }

    #[test]
    fn test_can_reserve() {
        assert!(level(10, 3).can_reserve(7));
        assert!(!level(10, 3).can_reserve(8));
        assert!(level(10, 10).can_reserve(0));
    }

    #[test]
    fn test_affects_on_hand() {
        assert!(TransactionKind::Receipt.affects_on_hand());
        assert!(TransactionKind::Fulfillment.affects_on_hand());
        assert!(TransactionKind::Return.affects_on_hand());
        assert!(!TransactionKind::Reservation.affects_on_hand());
        assert!(!TransactionKind::Release.affects_on_hand());
    }

    #[test]
    fn test_business_ref_constructors() {
        let r = BusinessRef::booking("bkg-42");
        assert_eq!(r.ref_type, RefType::Booking);
        assert_eq!(r.ref_id, "bkg-42");

        let r = BusinessRef::purchase_order("po-7");
        assert_eq!(r.ref_type, RefType::PurchaseOrder);
    }

    #[test]
    fn test_lot_is_depleted() {
        let lot = Lot {
            id: "lot-1".to_string(),
            warehouse_id: "wh-1".to_string(),
            product_id: "prod-1".to_string(),
            received_at: Utc::now(),
            unit_cost_cents: 500,
            quantity_remaining: 0,
            lot_code: None,
            created_at: Utc::now(),
        };
        assert!(lot.is_depleted());
    }
}
