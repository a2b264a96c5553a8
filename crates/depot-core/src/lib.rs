//! # depot-core: Pure Domain Logic for the Depot Stock Ledger
//!
//! This crate is the **heart** of the Depot inventory ledger. It contains
//! the entity types, the ledger sign conventions, and the quantity policy
//! as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Booking Workflow (host application, external)          │   │
//! │  │    PENDING ──► IN_PROGRESS ──► COMPLETED / CANCELLED            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ reserve / fulfill / return             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    depot-db (ledger store)                      │   │
//! │  │        StockLedger, BookingStockOrchestrator, SQLite            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ quantity  │  │   error   │  │ validation│  │   │
//! │  │   │StockLevel │  │whole_units│  │ CoreError │  │   rules   │  │   │
//! │  │   │ Lot, Txn  │  │  policy   │  │ taxonomy  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity types (StockLevel, Lot, StockTransaction, ...)
//! - [`quantity`] - Whole-unit quantity policy (no fractional stock!)
//! - [`error`] - Domain error types
//! - [`validation`] - Ledger input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Units**: Stock quantities are whole units (i64), costs are cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use depot_core::StockLevel` instead of
// `use depot_core::types::StockLevel`

pub use error::{CoreError, CoreResult, ValidationError};
pub use quantity::whole_units;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity a single ledger operation may move.
///
/// ## Business Reason
/// Prevents runaway requests (e.g., an expansion bug multiplying a line
/// item by a million) from draining or flooding a stock level in one call.
/// Can be made configurable per-warehouse in future versions.
pub const MAX_REQUEST_QUANTITY: i64 = 1_000_000;

/// Maximum length of warehouse/product/reference identifiers.
///
/// ## Business Reason
/// Identifiers come from external directories; UUIDs are 36 characters,
/// human-assigned codes shorter. 64 leaves headroom without letting
/// unbounded strings into composite keys.
pub const MAX_ID_LENGTH: usize = 64;
