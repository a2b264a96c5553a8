//! # Stock Ledger
//!
//! The core ledger operations: reserve, release, FIFO fulfillment, and
//! receipt/return, plus the read surface for levels, lots, and the audit
//! trail.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Ledger Operation                                │
//! │                                                                         │
//! │  reserve / release / fulfill_fifo / add_stock / return_to_stock        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION                                                     │
//! │       ├── read stock level (+ open lots for fulfillment)               │
//! │       ├── guarded UPDATE(s)  ← invariant re-checked in the statement   │
//! │       ├── INSERT stock_transactions row(s)  ← audit trail              │
//! │       └── COMMIT (any error path rolls everything back)                │
//! │                                                                         │
//! │  Per-key serialization: SQLite's single writer + the UPDATE guards     │
//! │  (`on_hand - reserved >= qty`, `quantity_remaining >= take`) make      │
//! │  oversell impossible under any interleaving.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call is one atomic unit of work. Cross-product atomicity is
//! intentionally NOT provided here; that trade-off lives in the booking
//! orchestrator (see `booking.rs`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use depot_core::{
    validation, BusinessRef, CoreError, Lot, StockLevel, StockTransaction, TransactionKind,
};

/// The stock ledger service.
///
/// Tracks, per (warehouse, product) pair, how much stock physically
/// exists, how much is provisionally committed, and what remains
/// available to promise - and records every movement as an immutable
/// transaction row.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // =========================================================================
    // Read Surface
    // =========================================================================

    /// Gets the stock level for a (warehouse, product) pair, if it exists.
    pub async fn find_level(
        &self,
        warehouse_id: &str,
        product_id: &str,
    ) -> LedgerResult<Option<StockLevel>> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;

        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT warehouse_id, product_id, on_hand, reserved, created_at, updated_at
            FROM stock_levels
            WHERE warehouse_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Gets the stock level, creating a zero row if none exists yet.
    ///
    /// Levels are created lazily on first receipt; this is also exposed
    /// for callers that want a row to exist before any stock arrives.
    pub async fn get_or_create_level(
        &self,
        warehouse_id: &str,
        product_id: &str,
    ) -> LedgerResult<StockLevel> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;

        let mut tx = self.pool.begin().await?;
        let level = Self::get_or_create_level_tx(&mut tx, warehouse_id, product_id).await?;
        tx.commit().await?;

        Ok(level)
    }

    /// Units still available to promise: `on_hand - reserved`.
    ///
    /// A missing level row means no stock was ever received: zero.
    pub async fn available(&self, warehouse_id: &str, product_id: &str) -> LedgerResult<i64> {
        let level = self.find_level(warehouse_id, product_id).await?;
        Ok(level.map(|l| l.available()).unwrap_or(0))
    }

    /// Lists all lots for a (warehouse, product) pair in FIFO order,
    /// including fully consumed ones (kept for audit).
    pub async fn lots(&self, warehouse_id: &str, product_id: &str) -> LedgerResult<Vec<Lot>> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;

        let lots = sqlx::query_as::<_, Lot>(
            r#"
            SELECT id, warehouse_id, product_id, received_at, unit_cost_cents,
                   quantity_remaining, lot_code, created_at
            FROM inventory_lots
            WHERE warehouse_id = ?1 AND product_id = ?2
            ORDER BY received_at ASC, rowid ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    /// Lists the full audit trail for a (warehouse, product) pair in
    /// chronological order.
    pub async fn transactions(
        &self,
        warehouse_id: &str,
        product_id: &str,
    ) -> LedgerResult<Vec<StockTransaction>> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;

        let transactions = sqlx::query_as::<_, StockTransaction>(
            r#"
            SELECT id, warehouse_id, product_id, lot_id, kind, quantity_delta,
                   unit_cost_cents, ref_type, ref_id, created_at
            FROM stock_transactions
            WHERE warehouse_id = ?1 AND product_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Replays the ledger for a key: sums the deltas of all
    /// on-hand-affecting transactions (receipt, return, fulfillment).
    ///
    /// ## Usage
    /// Reconciliation: the result must equal the current `on_hand`; any
    /// difference is drift worth investigating.
    pub async fn replayed_on_hand(
        &self,
        warehouse_id: &str,
        product_id: &str,
    ) -> LedgerResult<i64> {
        let transactions = self.transactions(warehouse_id, product_id).await?;

        Ok(transactions
            .iter()
            .filter(|t| t.kind.affects_on_hand())
            .map(|t| t.quantity_delta)
            .sum())
    }

    // =========================================================================
    // Reservation Engine
    // =========================================================================

    /// Reserves `qty` units ahead of fulfillment.
    ///
    /// ## What This Does
    /// 1. Checks `on_hand - reserved >= qty` (the available-quantity
    ///    invariant); fails with `InsufficientAvailableStock` otherwise
    /// 2. Increments `reserved`
    /// 3. Appends a RESERVATION transaction with `quantity_delta = -qty`
    ///
    /// `on_hand` is untouched. Never retried automatically.
    pub async fn reserve(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        caused_by: &BusinessRef,
    ) -> LedgerResult<()> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;
        validation::validate_quantity(qty)?;
        validation::validate_ref_id(&caused_by.ref_id)?;

        debug!(warehouse_id, product_id, qty, ref_id = %caused_by.ref_id, "Reserving stock");

        let mut tx = self.pool.begin().await?;

        let available = Self::find_level_tx(&mut tx, warehouse_id, product_id)
            .await?
            .map(|l| l.available())
            .unwrap_or(0);

        if available < qty {
            return Err(CoreError::InsufficientAvailableStock {
                warehouse_id: warehouse_id.to_string(),
                product_id: product_id.to_string(),
                available,
                requested: qty,
            }
            .into());
        }

        let now = Utc::now();

        // The guard re-checks the invariant inside the statement itself.
        let result = sqlx::query(
            r#"
            UPDATE stock_levels
            SET reserved = reserved + ?1, updated_at = ?2
            WHERE warehouse_id = ?3 AND product_id = ?4 AND on_hand - reserved >= ?1
            "#,
        )
        .bind(qty)
        .bind(now)
        .bind(warehouse_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::transaction_failed(
                "concurrent stock level mutation during reserve",
            )
            .into());
        }

        Self::append_transaction_tx(
            &mut tx,
            Self::new_transaction(
                warehouse_id,
                product_id,
                None,
                TransactionKind::Reservation,
                -qty,
                None,
                caused_by,
            ),
        )
        .await?;

        tx.commit().await?;

        info!(warehouse_id, product_id, qty, ref_id = %caused_by.ref_id, "Stock reserved");
        Ok(())
    }

    /// Gives back `qty` reserved units without depleting stock.
    ///
    /// ## Clamping
    /// `reserved = max(0, reserved - qty)`. Releasing more than is
    /// currently reserved is tolerated, not an error, so retried
    /// releases stay safe. A RELEASE transaction with
    /// `quantity_delta = +qty` is appended either way, for audit.
    pub async fn release(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        caused_by: &BusinessRef,
    ) -> LedgerResult<()> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;
        validation::validate_quantity(qty)?;
        validation::validate_ref_id(&caused_by.ref_id)?;

        debug!(warehouse_id, product_id, qty, ref_id = %caused_by.ref_id, "Releasing reservation");

        let mut tx = self.pool.begin().await?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE stock_levels
            SET reserved = max(0, reserved - ?1), updated_at = ?2
            WHERE warehouse_id = ?3 AND product_id = ?4
            "#,
        )
        .bind(qty)
        .bind(now)
        .bind(warehouse_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // No level row: nothing was ever received here. The release is
            // a no-op on counters but still worth an audit row.
            debug!(warehouse_id, product_id, "Release against missing stock level");
        }

        Self::append_transaction_tx(
            &mut tx,
            Self::new_transaction(
                warehouse_id,
                product_id,
                None,
                TransactionKind::Release,
                qty,
                None,
                caused_by,
            ),
        )
        .await?;

        tx.commit().await?;

        info!(warehouse_id, product_id, qty, ref_id = %caused_by.ref_id, "Reservation released");
        Ok(())
    }

    // =========================================================================
    // FIFO Fulfillment Engine
    // =========================================================================

    /// Converts a reservation into real depletion, consuming lots
    /// oldest-first.
    ///
    /// ## What This Does
    /// 1. Loads all lots with remaining stock, ordered by `received_at`
    ///    (ties broken by insertion order)
    /// 2. Takes `min(still needed, lot remaining)` from each lot in turn,
    ///    appending one FULFILLMENT transaction per lot touched, carrying
    ///    that lot's `unit_cost_cents` for cost-basis reporting
    /// 3. On full allocation: `on_hand -= qty`,
    ///    `reserved = max(0, reserved - qty)`
    ///
    /// ## Failure
    /// If the open lots cannot cover `qty`, fails with
    /// `InsufficientLotStock` and rolls back - no partial lot decrement
    /// survives. That error means the reserved counter and the lot totals
    /// drifted apart: a consistency fault, not a retry candidate.
    ///
    /// ## Returns
    /// The FULFILLMENT transactions written, oldest lot first.
    pub async fn fulfill_fifo(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        caused_by: &BusinessRef,
    ) -> LedgerResult<Vec<StockTransaction>> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;
        validation::validate_quantity(qty)?;
        validation::validate_ref_id(&caused_by.ref_id)?;

        debug!(warehouse_id, product_id, qty, ref_id = %caused_by.ref_id, "Fulfilling FIFO");

        let mut tx = self.pool.begin().await?;

        let on_hand = Self::find_level_tx(&mut tx, warehouse_id, product_id)
            .await?
            .map(|l| l.on_hand)
            .unwrap_or(0);

        if on_hand < qty {
            return Err(CoreError::InsufficientLotStock {
                warehouse_id: warehouse_id.to_string(),
                product_id: product_id.to_string(),
                requested: qty,
                unfulfilled: qty - on_hand,
            }
            .into());
        }

        let open_lots = Self::open_lots_tx(&mut tx, warehouse_id, product_id).await?;

        let mut remaining = qty;
        let mut written = Vec::new();

        for lot in &open_lots {
            if remaining == 0 {
                break;
            }

            let take = remaining.min(lot.quantity_remaining);

            let result = sqlx::query(
                r#"
                UPDATE inventory_lots
                SET quantity_remaining = quantity_remaining - ?1
                WHERE id = ?2 AND quantity_remaining >= ?1
                "#,
            )
            .bind(take)
            .bind(&lot.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::transaction_failed(
                    "concurrent lot mutation during fulfillment",
                )
                .into());
            }

            let transaction = Self::new_transaction(
                warehouse_id,
                product_id,
                Some(lot.id.clone()),
                TransactionKind::Fulfillment,
                -take,
                Some(lot.unit_cost_cents),
                caused_by,
            );
            Self::append_transaction_tx(&mut tx, transaction.clone()).await?;
            written.push(transaction);

            remaining -= take;
        }

        if remaining > 0 {
            // Dropping the transaction rolls back every lot decrement above.
            return Err(CoreError::InsufficientLotStock {
                warehouse_id: warehouse_id.to_string(),
                product_id: product_id.to_string(),
                requested: qty,
                unfulfilled: remaining,
            }
            .into());
        }

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE stock_levels
            SET on_hand = on_hand - ?1,
                reserved = max(0, reserved - ?1),
                updated_at = ?2
            WHERE warehouse_id = ?3 AND product_id = ?4 AND on_hand >= ?1
            "#,
        )
        .bind(qty)
        .bind(now)
        .bind(warehouse_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::transaction_failed(
                "concurrent stock level mutation during fulfillment",
            )
            .into());
        }

        tx.commit().await?;

        info!(
            warehouse_id,
            product_id,
            qty,
            lots_touched = written.len(),
            ref_id = %caused_by.ref_id,
            "Stock fulfilled FIFO"
        );
        Ok(written)
    }

    // =========================================================================
    // Receipt/Return Engine
    // =========================================================================

    /// Increases physical stock: `on_hand += qty`, a new lot, and one
    /// RECEIPT or RETURN transaction linked to it.
    ///
    /// ## Arguments
    /// * `kind` - must be `Receipt` or `Return`; other kinds never create
    ///   stock and are rejected
    ///
    /// ## Returns
    /// The newly created lot.
    pub async fn increase_stock(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        unit_cost_cents: i64,
        lot_code: Option<&str>,
        caused_by: &BusinessRef,
        kind: TransactionKind,
    ) -> LedgerResult<Lot> {
        validation::validate_warehouse_id(warehouse_id)?;
        validation::validate_product_id(product_id)?;
        validation::validate_quantity(qty)?;
        validation::validate_unit_cost_cents(unit_cost_cents)?;
        validation::validate_ref_id(&caused_by.ref_id)?;

        if !matches!(kind, TransactionKind::Receipt | TransactionKind::Return) {
            return Err(depot_core::ValidationError::InvalidFormat {
                field: "kind".to_string(),
                reason: "stock increases must be recorded as receipt or return".to_string(),
            }
            .into());
        }

        debug!(warehouse_id, product_id, qty, ?kind, ref_id = %caused_by.ref_id, "Increasing stock");

        let mut tx = self.pool.begin().await?;

        Self::get_or_create_level_tx(&mut tx, warehouse_id, product_id).await?;

        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE stock_levels
            SET on_hand = on_hand + ?1, updated_at = ?2
            WHERE warehouse_id = ?3 AND product_id = ?4
            "#,
        )
        .bind(qty)
        .bind(now)
        .bind(warehouse_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        let lot = Lot {
            id: Uuid::new_v4().to_string(),
            warehouse_id: warehouse_id.to_string(),
            product_id: product_id.to_string(),
            received_at: now,
            unit_cost_cents,
            quantity_remaining: qty,
            lot_code: lot_code.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_lots (
                id, warehouse_id, product_id, received_at,
                unit_cost_cents, quantity_remaining, lot_code, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&lot.id)
        .bind(&lot.warehouse_id)
        .bind(&lot.product_id)
        .bind(lot.received_at)
        .bind(lot.unit_cost_cents)
        .bind(lot.quantity_remaining)
        .bind(&lot.lot_code)
        .bind(lot.created_at)
        .execute(&mut *tx)
        .await?;

        Self::append_transaction_tx(
            &mut tx,
            Self::new_transaction(
                warehouse_id,
                product_id,
                Some(lot.id.clone()),
                kind,
                qty,
                Some(unit_cost_cents),
                caused_by,
            ),
        )
        .await?;

        tx.commit().await?;

        info!(warehouse_id, product_id, qty, lot_id = %lot.id, ?kind, "Stock increased");
        Ok(lot)
    }

    /// Records a purchase receipt: new stock with its acquisition cost.
    pub async fn add_stock(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        unit_cost_cents: i64,
        lot_code: Option<&str>,
        caused_by: &BusinessRef,
    ) -> LedgerResult<Lot> {
        self.increase_stock(
            warehouse_id,
            product_id,
            qty,
            unit_cost_cents,
            lot_code,
            caused_by,
            TransactionKind::Receipt,
        )
        .await
    }

    /// Books in stock found by a physical count, as a manual correction.
    ///
    /// Count corrections enter the ledger as a receipt referencing the
    /// adjustment record that authorized them, so reconciliation can
    /// separate counted-in stock from purchased stock. Found units carry
    /// no acquisition cost.
    pub async fn correct_stock(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        adjustment_id: &str,
    ) -> LedgerResult<Lot> {
        self.increase_stock(
            warehouse_id,
            product_id,
            qty,
            0,
            None,
            &BusinessRef::adjustment(adjustment_id),
            TransactionKind::Receipt,
        )
        .await
    }

    /// Rolls previously fulfilled stock back in.
    ///
    /// Returned units carry no meaningful cost basis (they came out of a
    /// cancelled service booking, not a priced sale), so the new lot is
    /// recorded at zero cost.
    pub async fn return_to_stock(
        &self,
        warehouse_id: &str,
        product_id: &str,
        qty: i64,
        lot_code: Option<&str>,
        caused_by: &BusinessRef,
    ) -> LedgerResult<Lot> {
        self.increase_stock(
            warehouse_id,
            product_id,
            qty,
            0,
            lot_code,
            caused_by,
            TransactionKind::Return,
        )
        .await
    }

    // =========================================================================
    // Transaction-Scoped Helpers
    // =========================================================================

    async fn find_level_tx(
        conn: &mut SqliteConnection,
        warehouse_id: &str,
        product_id: &str,
    ) -> Result<Option<StockLevel>, sqlx::Error> {
        sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT warehouse_id, product_id, on_hand, reserved, created_at, updated_at
            FROM stock_levels
            WHERE warehouse_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await
    }

    async fn get_or_create_level_tx(
        conn: &mut SqliteConnection,
        warehouse_id: &str,
        product_id: &str,
    ) -> Result<StockLevel, sqlx::Error> {
        if let Some(level) = Self::find_level_tx(conn, warehouse_id, product_id).await? {
            return Ok(level);
        }

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stock_levels (warehouse_id, product_id, on_hand, reserved, created_at, updated_at)
            VALUES (?1, ?2, 0, 0, ?3, ?3)
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(StockLevel {
            warehouse_id: warehouse_id.to_string(),
            product_id: product_id.to_string(),
            on_hand: 0,
            reserved: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Open lots (remaining > 0) for a key, oldest first.
    async fn open_lots_tx(
        conn: &mut SqliteConnection,
        warehouse_id: &str,
        product_id: &str,
    ) -> Result<Vec<Lot>, sqlx::Error> {
        sqlx::query_as::<_, Lot>(
            r#"
            SELECT id, warehouse_id, product_id, received_at, unit_cost_cents,
                   quantity_remaining, lot_code, created_at
            FROM inventory_lots
            WHERE warehouse_id = ?1 AND product_id = ?2 AND quantity_remaining > 0
            ORDER BY received_at ASC, rowid ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_all(conn)
        .await
    }

    fn new_transaction(
        warehouse_id: &str,
        product_id: &str,
        lot_id: Option<String>,
        kind: TransactionKind,
        quantity_delta: i64,
        unit_cost_cents: Option<i64>,
        caused_by: &BusinessRef,
    ) -> StockTransaction {
        StockTransaction {
            id: Uuid::new_v4().to_string(),
            warehouse_id: warehouse_id.to_string(),
            product_id: product_id.to_string(),
            lot_id,
            kind,
            quantity_delta,
            unit_cost_cents,
            ref_type: caused_by.ref_type,
            ref_id: caused_by.ref_id.clone(),
            created_at: Utc::now(),
        }
    }

    /// Appends one immutable ledger row. There is deliberately no UPDATE
    /// or DELETE counterpart anywhere in this crate.
    async fn append_transaction_tx(
        conn: &mut SqliteConnection,
        transaction: StockTransaction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stock_transactions (
                id, warehouse_id, product_id, lot_id, kind,
                quantity_delta, unit_cost_cents, ref_type, ref_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.warehouse_id)
        .bind(&transaction.product_id)
        .bind(&transaction.lot_id)
        .bind(transaction.kind)
        .bind(transaction.quantity_delta)
        .bind(transaction.unit_cost_cents)
        .bind(transaction.ref_type)
        .bind(&transaction.ref_id)
        .bind(transaction.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use depot_core::RefType;

    const WH: &str = "wh-east";
    const PROD: &str = "prod-17";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn po() -> BusinessRef {
        BusinessRef::purchase_order("po-1")
    }

    fn booking() -> BusinessRef {
        BusinessRef::booking("bkg-1")
    }

    #[tokio::test]
    async fn test_receipt_creates_level_lot_and_transaction() {
        let db = test_db().await;
        let ledger = db.ledger();

        let lot = ledger
            .add_stock(WH, PROD, 10, 250, Some("LOT-A"), &po())
            .await
            .unwrap();
        assert_eq!(lot.quantity_remaining, 10);
        assert_eq!(lot.unit_cost_cents, 250);
        assert_eq!(lot.lot_code.as_deref(), Some("LOT-A"));

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 10);
        assert_eq!(level.reserved, 0);
        assert_eq!(level.available(), 10);

        let transactions = ledger.transactions(WH, PROD).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::Receipt);
        assert_eq!(transactions[0].quantity_delta, 10);
        assert_eq!(transactions[0].lot_id.as_deref(), Some(lot.id.as_str()));
        assert_eq!(transactions[0].ref_type, RefType::PurchaseOrder);
    }

    #[tokio::test]
    async fn test_reservation_ceiling() {
        let db = test_db().await;
        let ledger = db.ledger();
        ledger.add_stock(WH, PROD, 10, 100, None, &po()).await.unwrap();

        // One unit over the ceiling fails with a diagnostic.
        let err = ledger.reserve(WH, PROD, 11, &booking()).await.unwrap_err();
        match err {
            LedgerError::Core(CoreError::InsufficientAvailableStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("expected InsufficientAvailableStock, got {other:?}"),
        }

        // Exactly the ceiling succeeds and zeroes availability.
        ledger.reserve(WH, PROD, 10, &booking()).await.unwrap();
        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.reserved, 10);
        assert_eq!(level.available(), 0);

        let transactions = ledger.transactions(WH, PROD).await.unwrap();
        let reservation = transactions.last().unwrap();
        assert_eq!(reservation.kind, TransactionKind::Reservation);
        assert_eq!(reservation.quantity_delta, -10);
    }

    #[tokio::test]
    async fn test_reserve_respects_existing_reservations() {
        let db = test_db().await;
        let ledger = db.ledger();
        ledger.add_stock(WH, PROD, 10, 100, None, &po()).await.unwrap();

        ledger.reserve(WH, PROD, 6, &booking()).await.unwrap();

        let err = ledger.reserve(WH, PROD, 5, &booking()).await.unwrap_err();
        match err {
            LedgerError::Core(CoreError::InsufficientAvailableStock {
                available,
                ..
            }) => assert_eq!(available, 4),
            other => panic!("expected InsufficientAvailableStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reserve_on_empty_warehouse() {
        let db = test_db().await;
        let ledger = db.ledger();

        let err = ledger.reserve(WH, PROD, 1, &booking()).await.unwrap_err();
        match err {
            LedgerError::Core(CoreError::InsufficientAvailableStock {
                available,
                ..
            }) => assert_eq!(available, 0),
            other => panic!("expected InsufficientAvailableStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_release_clamps_at_zero() {
        let db = test_db().await;
        let ledger = db.ledger();
        ledger.add_stock(WH, PROD, 10, 100, None, &po()).await.unwrap();
        ledger.reserve(WH, PROD, 3, &booking()).await.unwrap();

        // Over-release is tolerated (retry-safe), clamped at zero.
        ledger.release(WH, PROD, 5, &booking()).await.unwrap();

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.reserved, 0);
        assert_eq!(level.on_hand, 10);

        let release = ledger
            .transactions(WH, PROD)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.kind == TransactionKind::Release)
            .unwrap();
        assert_eq!(release.quantity_delta, 5);
    }

    #[tokio::test]
    async fn test_fifo_consumes_oldest_lot_first() {
        let db = test_db().await;
        let ledger = db.ledger();

        let lot_a = ledger
            .add_stock(WH, PROD, 5, 100, Some("LOT-A"), &po())
            .await
            .unwrap();
        let lot_b = ledger
            .add_stock(WH, PROD, 5, 200, Some("LOT-B"), &po())
            .await
            .unwrap();

        ledger.reserve(WH, PROD, 7, &booking()).await.unwrap();
        let written = ledger.fulfill_fifo(WH, PROD, 7, &booking()).await.unwrap();

        // Two fulfillment rows: all of A first, then the remainder from B,
        // each carrying its own lot's cost basis.
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].lot_id.as_deref(), Some(lot_a.id.as_str()));
        assert_eq!(written[0].quantity_delta, -5);
        assert_eq!(written[0].unit_cost_cents, Some(100));
        assert_eq!(written[1].lot_id.as_deref(), Some(lot_b.id.as_str()));
        assert_eq!(written[1].quantity_delta, -2);
        assert_eq!(written[1].unit_cost_cents, Some(200));

        let lots = ledger.lots(WH, PROD).await.unwrap();
        assert_eq!(lots[0].quantity_remaining, 0);
        assert_eq!(lots[1].quantity_remaining, 3);

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 3);
        assert_eq!(level.reserved, 0);
    }

    #[tokio::test]
    async fn test_fifo_orders_by_received_at_not_insertion() {
        let db = test_db().await;
        let ledger = db.ledger();

        let lot_a = ledger.add_stock(WH, PROD, 5, 100, None, &po()).await.unwrap();
        let lot_b = ledger.add_stock(WH, PROD, 5, 200, None, &po()).await.unwrap();

        // Backdate the second lot: it should now be consumed first.
        let earlier = Utc::now() - chrono::Duration::days(3);
        sqlx::query("UPDATE inventory_lots SET received_at = ?1 WHERE id = ?2")
            .bind(earlier)
            .bind(&lot_b.id)
            .execute(db.pool())
            .await
            .unwrap();

        ledger.reserve(WH, PROD, 6, &booking()).await.unwrap();
        let written = ledger.fulfill_fifo(WH, PROD, 6, &booking()).await.unwrap();

        assert_eq!(written[0].lot_id.as_deref(), Some(lot_b.id.as_str()));
        assert_eq!(written[0].quantity_delta, -5);
        assert_eq!(written[1].lot_id.as_deref(), Some(lot_a.id.as_str()));
        assert_eq!(written[1].quantity_delta, -1);
    }

    #[tokio::test]
    async fn test_fulfillment_clears_reservation() {
        let db = test_db().await;
        let ledger = db.ledger();

        ledger.add_stock(WH, PROD, 6, 100, None, &po()).await.unwrap();
        ledger.add_stock(WH, PROD, 4, 150, None, &po()).await.unwrap();
        ledger.reserve(WH, PROD, 10, &booking()).await.unwrap();

        ledger.fulfill_fifo(WH, PROD, 10, &booking()).await.unwrap();

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 0);
        assert_eq!(level.reserved, 0);
        assert_eq!(level.available(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_lot_stock_rolls_back() {
        let db = test_db().await;
        let ledger = db.ledger();
        ledger.add_stock(WH, PROD, 5, 100, None, &po()).await.unwrap();

        let err = ledger.fulfill_fifo(WH, PROD, 8, &booking()).await.unwrap_err();
        match err {
            LedgerError::Core(CoreError::InsufficientLotStock {
                requested,
                unfulfilled,
                ..
            }) => {
                assert_eq!(requested, 8);
                assert_eq!(unfulfilled, 3);
            }
            other => panic!("expected InsufficientLotStock, got {other:?}"),
        }

        // Nothing moved: no partial lot decrement, no fulfillment rows.
        let lots = ledger.lots(WH, PROD).await.unwrap();
        assert_eq!(lots[0].quantity_remaining, 5);

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 5);

        let transactions = ledger.transactions(WH, PROD).await.unwrap();
        assert!(transactions
            .iter()
            .all(|t| t.kind != TransactionKind::Fulfillment));
    }

    #[tokio::test]
    async fn test_return_round_trip() {
        let db = test_db().await;
        let ledger = db.ledger();

        let lot = ledger
            .return_to_stock(WH, PROD, 4, None, &booking())
            .await
            .unwrap();
        assert_eq!(lot.quantity_remaining, 4);
        assert_eq!(lot.unit_cost_cents, 0);

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 4);

        let transactions = ledger.transactions(WH, PROD).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::Return);
        assert_eq!(transactions[0].quantity_delta, 4);
        assert_eq!(transactions[0].lot_id.as_deref(), Some(lot.id.as_str()));
    }

    #[tokio::test]
    async fn test_count_correction_recorded_as_adjustment() {
        let db = test_db().await;
        let ledger = db.ledger();

        // A physical count found two units the ledger did not know about.
        let lot = ledger.correct_stock(WH, PROD, 2, "adj-3").await.unwrap();
        assert_eq!(lot.quantity_remaining, 2);
        assert_eq!(lot.unit_cost_cents, 0);

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 2);

        let transactions = ledger.transactions(WH, PROD).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::Receipt);
        assert_eq!(transactions[0].ref_type, RefType::Adjustment);
        assert_eq!(transactions[0].ref_id, "adj-3");
        assert_eq!(transactions[0].lot_id.as_deref(), Some(lot.id.as_str()));
    }

    #[tokio::test]
    async fn test_ledger_replay_matches_on_hand() {
        let db = test_db().await;
        let ledger = db.ledger();

        ledger.add_stock(WH, PROD, 10, 100, None, &po()).await.unwrap();
        ledger.reserve(WH, PROD, 4, &booking()).await.unwrap();
        ledger.fulfill_fifo(WH, PROD, 3, &booking()).await.unwrap();
        ledger.release(WH, PROD, 1, &booking()).await.unwrap();
        ledger.return_to_stock(WH, PROD, 2, None, &booking()).await.unwrap();

        let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
        assert_eq!(level.on_hand, 9); // 10 - 3 + 2

        let replayed = ledger.replayed_on_hand(WH, PROD).await.unwrap();
        assert_eq!(replayed, level.on_hand);
    }

    #[tokio::test]
    async fn test_invariants_hold_after_every_operation() {
        let db = test_db().await;
        let ledger = db.ledger();

        async fn assert_invariants(ledger: &StockLedger) {
            let level = ledger.find_level(WH, PROD).await.unwrap().unwrap();
            assert!(level.on_hand >= level.reserved);
            assert!(level.reserved >= 0);
            assert!(level.available() >= 0);
        }

        ledger.add_stock(WH, PROD, 8, 100, None, &po()).await.unwrap();
        assert_invariants(&ledger).await;

        ledger.reserve(WH, PROD, 8, &booking()).await.unwrap();
        assert_invariants(&ledger).await;

        ledger.fulfill_fifo(WH, PROD, 5, &booking()).await.unwrap();
        assert_invariants(&ledger).await;

        ledger.release(WH, PROD, 3, &booking()).await.unwrap();
        assert_invariants(&ledger).await;

        ledger.return_to_stock(WH, PROD, 2, None, &booking()).await.unwrap();
        assert_invariants(&ledger).await;
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let db = test_db().await;
        let ledger = db.ledger();

        assert!(ledger.reserve(WH, PROD, 0, &booking()).await.is_err());
        assert!(ledger.reserve(WH, PROD, -5, &booking()).await.is_err());
        assert!(ledger.reserve("", PROD, 1, &booking()).await.is_err());
        assert!(ledger
            .add_stock(WH, PROD, 5, -1, None, &po())
            .await
            .is_err());
        assert!(ledger
            .increase_stock(WH, PROD, 5, 0, None, &po(), TransactionKind::Reservation)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_find_and_get_or_create_level() {
        let db = test_db().await;
        let ledger = db.ledger();

        assert!(ledger.find_level(WH, PROD).await.unwrap().is_none());
        assert_eq!(ledger.available(WH, PROD).await.unwrap(), 0);

        let created = ledger.get_or_create_level(WH, PROD).await.unwrap();
        assert_eq!(created.on_hand, 0);
        assert_eq!(created.reserved, 0);

        // Second call returns the existing row instead of failing.
        let again = ledger.get_or_create_level(WH, PROD).await.unwrap();
        assert_eq!(again.created_at, created.created_at);
    }
}
