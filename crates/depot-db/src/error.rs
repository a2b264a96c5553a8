//! # Database Error Types
//!
//! Error types for ledger store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                        CoreError (depot-core)                  │
//! │       │                             │                                   │
//! │       └──────────┬──────────────────┘                                   │
//! │                  ▼                                                      │
//! │  LedgerError ← What every ledger/orchestrator operation returns        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use depot_core::{CoreError, ValidationError};

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors with the ledger's actual constraint
/// surface. The schema has exactly one unique key (the composite primary
/// key on `stock_levels`) and backs the core invariants with CHECK
/// constraints; those two shapes get their own variants instead of a
/// generic constraint bucket.
#[derive(Debug, Error)]
pub enum DbError {
    /// A concurrent writer created the same stock level row first.
    ///
    /// ## When This Occurs
    /// Two callers race the lazy creation of one (warehouse, product)
    /// level; the loser's INSERT hits the composite primary key.
    /// Retry-safe: the row the caller wanted now exists.
    #[error("Stock level created concurrently: {0}")]
    LevelExists(String),

    /// The database rejected a write that would break a ledger invariant.
    ///
    /// ## When This Occurs
    /// A CHECK constraint (`on_hand >= 0`, `reserved <= on_hand`,
    /// `quantity_remaining >= 0`, `quantity_delta <> 0`) fired on a write
    /// the application validation should have caught - drift between the
    /// two layers, worth an alert.
    #[error("Ledger invariant violated in database: {0}")]
    InvariantViolated(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (runtime SQL error outside the constraint
    /// surface above).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    ///
    /// ## When This Occurs
    /// - A guarded UPDATE matched no row because a concurrent writer
    ///   changed the stock level between snapshot read and write
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a TransactionFailed error with context.
    pub fn transaction_failed(message: impl Into<String>) -> Self {
        DbError::TransactionFailed(message.into())
    }
}

/// Classifies a SQLite statement failure by its message.
///
/// SQLite phrases constraint failures as
/// `UNIQUE constraint failed: <table>.<column>, ...` and
/// `CHECK constraint failed: <detail>`. The only UNIQUE key in this
/// schema is the `stock_levels` composite primary key, so a UNIQUE
/// failure naming that table is always the level-creation race.
fn classify_statement_error(msg: &str) -> DbError {
    if msg.contains("UNIQUE constraint failed: stock_levels") {
        DbError::LevelExists(msg.to_string())
    } else if msg.contains("CHECK constraint failed") {
        DbError::InvariantViolated(msg.to_string())
    } else {
        DbError::QueryFailed(msg.to_string())
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → classify by constraint (see above)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
/// `RowNotFound` has no mapping: every read in this crate uses
/// `fetch_optional`/`fetch_all`, so it cannot surface.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => classify_statement_error(db_err.message()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// The error surface of every ledger and orchestrator operation.
///
/// Domain rule violations (insufficient stock, validation) arrive as
/// [`CoreError`]; storage failures arrive as [`DbError`]. Callers that
/// only care about "did it work" can bubble this up; callers implementing
/// fallbacks match on `Core(...)` variants.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

// `?` applies a single From; these keep ledger code free of manual mapping.
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Db(DbError::from(err))
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_racing_level_insert_classified() {
        let err = classify_statement_error(
            "UNIQUE constraint failed: stock_levels.warehouse_id, stock_levels.product_id",
        );
        assert!(matches!(err, DbError::LevelExists(_)));
    }

    #[test]
    fn test_check_failure_classified_as_invariant_drift() {
        let err = classify_statement_error("CHECK constraint failed: reserved <= on_hand");
        assert!(matches!(err, DbError::InvariantViolated(_)));
        assert!(err.to_string().contains("reserved <= on_hand"));
    }

    #[test]
    fn test_other_statement_errors_pass_through() {
        let err = classify_statement_error("no such table: stock_levels");
        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[test]
    fn test_ledger_error_from_core() {
        let core = CoreError::InsufficientAvailableStock {
            warehouse_id: "wh-1".to_string(),
            product_id: "prod-1".to_string(),
            available: 0,
            requested: 1,
        };
        let err: LedgerError = core.into();
        assert!(matches!(err, LedgerError::Core(_)));
    }

    #[test]
    fn test_ledger_error_from_validation() {
        let validation = ValidationError::Required {
            field: "warehouse_id".to_string(),
        };
        let err: LedgerError = validation.into();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Validation(_))
        ));
    }
}
