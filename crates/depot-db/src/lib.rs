//! # depot-db: Ledger Store for Depot
//!
//! This crate provides durable storage and the operational surface of the
//! Depot stock ledger. It uses SQLite for local storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  Booking workflow state transition (external)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depot-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐  │   │
//! │  │   │   Database    │   │  StockLedger   │   │ Orchestrator  │  │   │
//! │  │   │   (pool.rs)   │   │  (ledger.rs)   │   │ (booking.rs)  │  │   │
//! │  │   │               │   │                │   │               │  │   │
//! │  │   │ SqlitePool    │◄──│ reserve        │◄──│ per-item loop │  │   │
//! │  │   │ Migrations    │   │ fulfill_fifo   │   │ with tagged   │  │   │
//! │  │   │ WAL mode      │   │ release/return │   │ outcomes      │  │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: stock_levels, inventory_lots, stock_transactions              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`ledger`] - Stock ledger operations (reserve/release/fulfill/receipt)
//! - [`booking`] - Booking-level orchestration across expanded line items
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_db::{Database, DbConfig};
//! use depot_core::BusinessRef;
//!
//! let db = Database::new(DbConfig::new("path/to/depot.db")).await?;
//!
//! // Receive stock
//! db.ledger()
//!     .add_stock("wh-east", "prod-17", 100, 499, Some("LOT-2026-08"),
//!                &BusinessRef::purchase_order("po-1"))
//!     .await?;
//!
//! // Reserve for a booking, then fulfill oldest-lot-first
//! let ledger = db.ledger();
//! ledger.reserve("wh-east", "prod-17", 3, &BusinessRef::booking("bkg-9")).await?;
//! ledger.fulfill_fifo("wh-east", "prod-17", 3, &BusinessRef::booking("bkg-9")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};

// Service re-exports for convenience
pub use booking::{BookingStockOrchestrator, ItemOutcome, ProductRequirement, StockApplySummary};
pub use ledger::StockLedger;
