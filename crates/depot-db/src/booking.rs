//! # Booking Stock Orchestration
//!
//! Fans a single booking event out across every product its line items
//! expand to, applying one ledger operation per product.
//!
//! ## State Machine Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          Booking Workflow (external)  →  Ledger Operation               │
//! │                                                                         │
//! │  PENDING                    ──► reserve_for_booking                     │
//! │  PENDING → IN_PROGRESS      ──► fulfill_for_booking                     │
//! │  * → CANCELLED (fulfilled)  ──► return_for_cancelled_booking            │
//! │  * → CANCELLED (reserved)   ──► release_for_booking                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial-Failure Policy
//! Every expanded (product, quantity) pair is attempted independently; one
//! product failing never stops the rest. Each item yields a tagged
//! [`ItemOutcome`], aggregated into a [`StockApplySummary`]. Only when
//! *every* item failed do `reserve_for_booking`/`fulfill_for_booking`
//! raise `AllItemsFailed` - the caller must then abort the enclosing
//! business transaction. Cancellation paths never raise at all: a failed
//! reversal must not block a cancellation, so it is logged for manual
//! reconciliation instead.
//!
//! Cross-product atomicity is intentionally absent (each product's ledger
//! call is its own atomic unit). Callers needing all-or-nothing semantics
//! should pre-check `StockLedger::available` for every product before
//! reserving any.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::StockLedger;
use depot_core::{whole_units, BusinessRef, CoreError, ValidationError};

// =============================================================================
// Expansion Input
// =============================================================================

/// One (product, quantity) pair expanded from a booking's line items.
///
/// The expansion itself (which products a booked service consumes) is
/// owned by an external lookup; this type is how its output enters the
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRequirement {
    pub product_id: String,
    pub quantity: i64,
}

impl ProductRequirement {
    /// Creates a requirement from an already-whole quantity.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        ProductRequirement {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Creates a requirement from a decimal expansion quantity.
    ///
    /// Expansions may specify fractional consumption ("0.5 units per
    /// seat"); physical stock moves in whole units, rounded **up** (see
    /// `depot_core::quantity`). A quantity of zero means the item needs
    /// nothing and is skipped by the orchestrator.
    pub fn from_decimal(
        product_id: impl Into<String>,
        quantity: f64,
    ) -> Result<Self, ValidationError> {
        Ok(ProductRequirement {
            product_id: product_id.into(),
            quantity: whole_units(quantity)?,
        })
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// What happened to one expanded item.
///
/// An explicit tag per item - never an exception hierarchy - so "fatal"
/// versus "skip and continue" stays a caller decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ItemOutcome {
    /// The ledger operation committed for this product.
    Applied { product_id: String, quantity: i64 },
    /// The ledger operation failed for this product; the rest of the
    /// booking's items were still attempted.
    Failed {
        product_id: String,
        quantity: i64,
        reason: String,
    },
}

impl ItemOutcome {
    /// Whether this item committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, ItemOutcome::Applied { .. })
    }
}

/// Aggregated result of applying one ledger operation across a booking's
/// expanded items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockApplySummary {
    pub booking_id: String,
    pub outcomes: Vec<ItemOutcome>,
}

impl StockApplySummary {
    /// Number of items that committed.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    /// Number of items that failed.
    pub fn fail_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Whether some items committed and some failed.
    pub fn is_partial(&self) -> bool {
        self.success_count() > 0 && self.fail_count() > 0
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// The ledger operation a booking state transition maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookingOp {
    Reserve,
    Fulfill,
    Release,
    Return,
}

impl BookingOp {
    const fn verb(self) -> &'static str {
        match self {
            BookingOp::Reserve => "reserve",
            BookingOp::Fulfill => "fulfill",
            BookingOp::Release => "release",
            BookingOp::Return => "return",
        }
    }
}

/// Applies booking-level stock operations across expanded line items.
#[derive(Debug, Clone)]
pub struct BookingStockOrchestrator {
    ledger: StockLedger,
}

impl BookingStockOrchestrator {
    /// Creates a new orchestrator over a stock ledger.
    pub fn new(ledger: StockLedger) -> Self {
        BookingStockOrchestrator { ledger }
    }

    /// Reserves stock for every product a booking needs (PENDING).
    ///
    /// ## Returns
    /// * `Ok(summary)` - at least one item committed (or there was nothing
    ///   to do); partial failure is reported, not raised
    /// * `Err(AllItemsFailed)` - every attempted item failed; the caller
    ///   must abort the booking
    pub async fn reserve_for_booking(
        &self,
        warehouse_id: &str,
        booking_id: &str,
        items: &[ProductRequirement],
    ) -> LedgerResult<StockApplySummary> {
        let summary = self
            .apply_each(BookingOp::Reserve, warehouse_id, booking_id, items)
            .await;
        Self::fail_if_nothing_succeeded(summary)
    }

    /// Converts a booking's reservations into FIFO depletion
    /// (PENDING → IN_PROGRESS).
    ///
    /// Same failure contract as [`Self::reserve_for_booking`].
    pub async fn fulfill_for_booking(
        &self,
        warehouse_id: &str,
        booking_id: &str,
        items: &[ProductRequirement],
    ) -> LedgerResult<StockApplySummary> {
        let summary = self
            .apply_each(BookingOp::Fulfill, warehouse_id, booking_id, items)
            .await;
        Self::fail_if_nothing_succeeded(summary)
    }

    /// Releases a cancelled booking's outstanding reservations
    /// (* → CANCELLED before fulfillment).
    ///
    /// Best-effort: never raises. Failed items are logged for manual
    /// reconciliation and reported in the summary.
    pub async fn release_for_booking(
        &self,
        warehouse_id: &str,
        booking_id: &str,
        items: &[ProductRequirement],
    ) -> StockApplySummary {
        self.apply_each(BookingOp::Release, warehouse_id, booking_id, items)
            .await
    }

    /// Returns a cancelled booking's already-fulfilled stock
    /// (IN_PROGRESS/PAUSED → CANCELLED).
    ///
    /// Best-effort: never raises. A failed stock return must not block
    /// the cancellation itself; it is logged and left for manual
    /// reconciliation.
    pub async fn return_for_cancelled_booking(
        &self,
        warehouse_id: &str,
        booking_id: &str,
        items: &[ProductRequirement],
    ) -> StockApplySummary {
        self.apply_each(BookingOp::Return, warehouse_id, booking_id, items)
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Applies one ledger operation to each expanded item independently.
    ///
    /// Zero-quantity items need nothing and are skipped without an
    /// outcome. Every other item produces exactly one [`ItemOutcome`],
    /// failure or not.
    async fn apply_each(
        &self,
        op: BookingOp,
        warehouse_id: &str,
        booking_id: &str,
        items: &[ProductRequirement],
    ) -> StockApplySummary {
        debug!(
            warehouse_id,
            booking_id,
            op = op.verb(),
            items = items.len(),
            "Applying booking stock operation"
        );

        let caused_by = BusinessRef::booking(booking_id);
        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            if item.quantity == 0 {
                debug!(product_id = %item.product_id, "Skipping zero-quantity item");
                continue;
            }

            let result = match op {
                BookingOp::Reserve => {
                    self.ledger
                        .reserve(warehouse_id, &item.product_id, item.quantity, &caused_by)
                        .await
                }
                BookingOp::Fulfill => self
                    .ledger
                    .fulfill_fifo(warehouse_id, &item.product_id, item.quantity, &caused_by)
                    .await
                    .map(|_| ()),
                BookingOp::Release => {
                    self.ledger
                        .release(warehouse_id, &item.product_id, item.quantity, &caused_by)
                        .await
                }
                BookingOp::Return => self
                    .ledger
                    .return_to_stock(warehouse_id, &item.product_id, item.quantity, None, &caused_by)
                    .await
                    .map(|_| ()),
            };

            match result {
                Ok(()) => outcomes.push(ItemOutcome::Applied {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                }),
                Err(err) => {
                    warn!(
                        warehouse_id,
                        booking_id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        op = op.verb(),
                        error = %err,
                        "Booking stock item failed; continuing with remaining items"
                    );
                    outcomes.push(ItemOutcome::Failed {
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let summary = StockApplySummary {
            booking_id: booking_id.to_string(),
            outcomes,
        };

        info!(
            warehouse_id,
            booking_id,
            op = op.verb(),
            success = summary.success_count(),
            failed = summary.fail_count(),
            "Booking stock operation finished"
        );

        summary
    }

    /// The all-or-nothing floor: a summary where everything that was
    /// attempted failed becomes `AllItemsFailed`.
    fn fail_if_nothing_succeeded(
        summary: StockApplySummary,
    ) -> LedgerResult<StockApplySummary> {
        if summary.success_count() == 0 && summary.fail_count() > 0 {
            return Err(LedgerError::Core(CoreError::AllItemsFailed {
                booking_id: summary.booking_id,
                attempted: summary.outcomes.len(),
            }));
        }
        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use depot_core::TransactionKind;

    const WH: &str = "wh-east";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database, product_id: &str, qty: i64) {
        db.ledger()
            .add_stock(
                WH,
                product_id,
                qty,
                100,
                None,
                &depot_core::BusinessRef::purchase_order("po-1"),
            )
            .await
            .unwrap();
    }

    fn items(specs: &[(&str, i64)]) -> Vec<ProductRequirement> {
        specs
            .iter()
            .map(|(p, q)| ProductRequirement::new(*p, *q))
            .collect()
    }

    #[tokio::test]
    async fn test_reserve_partial_failure_reports_without_raising() {
        let db = test_db().await;
        seed(&db, "prod-a", 10).await;
        seed(&db, "prod-b", 1).await;
        seed(&db, "prod-c", 5).await;

        let summary = db
            .bookings()
            .reserve_for_booking(WH, "bkg-1", &items(&[("prod-a", 2), ("prod-b", 5), ("prod-c", 1)]))
            .await
            .unwrap();

        assert_eq!(summary.success_count(), 2);
        assert_eq!(summary.fail_count(), 1);
        assert!(summary.is_partial());

        // The failing item names the product and keeps the reason.
        let failed = summary
            .outcomes
            .iter()
            .find(|o| !o.is_applied())
            .unwrap();
        match failed {
            ItemOutcome::Failed { product_id, reason, .. } => {
                assert_eq!(product_id, "prod-b");
                assert!(reason.contains("Insufficient available stock"));
            }
            other => panic!("expected Failed outcome, got {other:?}"),
        }

        // The two successes actually committed.
        assert_eq!(db.ledger().available(WH, "prod-a").await.unwrap(), 8);
        assert_eq!(db.ledger().available(WH, "prod-c").await.unwrap(), 4);
        // The failed one did not.
        assert_eq!(db.ledger().available(WH, "prod-b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reserve_all_items_failed_raises() {
        let db = test_db().await;
        seed(&db, "prod-a", 1).await;

        let err = db
            .bookings()
            .reserve_for_booking(WH, "bkg-2", &items(&[("prod-a", 5), ("prod-b", 2), ("prod-c", 3)]))
            .await
            .unwrap_err();

        match err {
            LedgerError::Core(CoreError::AllItemsFailed {
                booking_id,
                attempted,
            }) => {
                assert_eq!(booking_id, "bkg-2");
                assert_eq!(attempted, 3);
            }
            other => panic!("expected AllItemsFailed, got {other:?}"),
        }

        // The caller aborts; nothing was reserved.
        assert_eq!(db.ledger().available(WH, "prod-a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_expansion_is_a_no_op() {
        let db = test_db().await;

        let summary = db
            .bookings()
            .reserve_for_booking(WH, "bkg-3", &[])
            .await
            .unwrap();
        assert_eq!(summary.success_count(), 0);
        assert_eq!(summary.fail_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_items_skipped() {
        let db = test_db().await;
        seed(&db, "prod-a", 5).await;

        let summary = db
            .bookings()
            .reserve_for_booking(WH, "bkg-4", &items(&[("prod-a", 2), ("prod-b", 0)]))
            .await
            .unwrap();

        // The zero-quantity item produces no outcome at all.
        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(summary.success_count(), 1);
    }

    #[tokio::test]
    async fn test_fulfill_for_booking_depletes_reserved_stock() {
        let db = test_db().await;
        seed(&db, "prod-a", 10).await;
        seed(&db, "prod-b", 4).await;
        let reqs = items(&[("prod-a", 3), ("prod-b", 4)]);

        db.bookings()
            .reserve_for_booking(WH, "bkg-5", &reqs)
            .await
            .unwrap();
        let summary = db
            .bookings()
            .fulfill_for_booking(WH, "bkg-5", &reqs)
            .await
            .unwrap();
        assert_eq!(summary.success_count(), 2);

        let level_a = db.ledger().find_level(WH, "prod-a").await.unwrap().unwrap();
        assert_eq!(level_a.on_hand, 7);
        assert_eq!(level_a.reserved, 0);

        let level_b = db.ledger().find_level(WH, "prod-b").await.unwrap().unwrap();
        assert_eq!(level_b.on_hand, 0);
        assert_eq!(level_b.reserved, 0);
    }

    #[tokio::test]
    async fn test_release_for_booking_never_raises() {
        let db = test_db().await;
        seed(&db, "prod-a", 5).await;
        db.bookings()
            .reserve_for_booking(WH, "bkg-6", &items(&[("prod-a", 2)]))
            .await
            .unwrap();

        // One real release plus one item that cannot validate: the
        // cancellation path still returns a summary instead of raising.
        let summary = db
            .bookings()
            .release_for_booking(WH, "bkg-6", &items(&[("prod-a", 2), ("", 1)]))
            .await;

        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.fail_count(), 1);
        assert_eq!(db.ledger().available(WH, "prod-a").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_return_for_cancelled_booking_restores_stock() {
        let db = test_db().await;
        seed(&db, "prod-a", 6).await;
        let reqs = items(&[("prod-a", 4)]);

        db.bookings()
            .reserve_for_booking(WH, "bkg-7", &reqs)
            .await
            .unwrap();
        db.bookings()
            .fulfill_for_booking(WH, "bkg-7", &reqs)
            .await
            .unwrap();
        assert_eq!(db.ledger().available(WH, "prod-a").await.unwrap(), 2);

        let summary = db
            .bookings()
            .return_for_cancelled_booking(WH, "bkg-7", &reqs)
            .await;
        assert_eq!(summary.success_count(), 1);
        assert_eq!(db.ledger().available(WH, "prod-a").await.unwrap(), 6);

        // The return shows up in the audit trail as a zero-cost lot.
        let transactions = db.ledger().transactions(WH, "prod-a").await.unwrap();
        let ret = transactions
            .iter()
            .find(|t| t.kind == TransactionKind::Return)
            .unwrap();
        assert_eq!(ret.quantity_delta, 4);
        assert_eq!(ret.unit_cost_cents, Some(0));
        assert_eq!(ret.ref_id, "bkg-7");
    }

    #[tokio::test]
    async fn test_return_failures_are_swallowed_entirely() {
        let db = test_db().await;

        // Invalid items on the cancellation path: everything fails, the
        // call still completes with a summary.
        let summary = db
            .bookings()
            .return_for_cancelled_booking(WH, "bkg-8", &items(&[("", 1), ("", 2)]))
            .await;
        assert_eq!(summary.success_count(), 0);
        assert_eq!(summary.fail_count(), 2);
    }

    #[test]
    fn test_requirement_from_decimal_rounds_up() {
        let req = ProductRequirement::from_decimal("prod-a", 2.4).unwrap();
        assert_eq!(req.quantity, 3);

        let req = ProductRequirement::from_decimal("prod-a", 0.0).unwrap();
        assert_eq!(req.quantity, 0);

        assert!(ProductRequirement::from_decimal("prod-a", -1.0).is_err());
    }
}
