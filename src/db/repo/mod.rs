//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `partners.rs` - Brand, store and partnership operations, credit posting
//! - `customers.rs` - Customer lookup and linking
//! - `samples.rs` - Sample history
//! - `conversions.rs` - Conversion recording and the idempotency guard
//! - `inventory.rs` - Inventory counters, transactions and product mappings
//! - `wholesale.rs` - Wholesale order lifecycle
//! - `events.rs` - Processed-event audit log

mod conversions;
mod customers;
mod events;
mod inventory;
mod partners;
mod samples;
mod wholesale;

pub use conversions::ConversionOutcome;
pub use events::{NewProcessedEvent, ProcessedEventRow};
pub use inventory::NewProductMapping;
pub use samples::NewSample;
pub use wholesale::{NewWholesaleItem, NewWholesaleOrder};

use crate::domain::Money;
use sqlx::sqlite::{SqliteRow, SqlitePool};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// The underlying connection pool.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a money column stored as a canonical decimal string.
///
/// Unparseable values log a warning and read as zero; money is never
/// stored through SQLite's REAL type.
pub(crate) fn money_column(row: &SqliteRow, column: &str) -> Money {
    let raw: String = row.get(column);
    Money::from_str(&raw).unwrap_or_else(|e| {
        warn!(
            column = column,
            value = %raw,
            error = %e,
            "Failed to parse money column, using zero"
        );
        Money::default()
    })
}

/// Parse a nullable money column.
pub(crate) fn money_column_opt(row: &SqliteRow, column: &str) -> Option<Money> {
    let raw: Option<String> = row.get(column);
    raw.map(|raw| {
        Money::from_str(&raw).unwrap_or_else(|e| {
            warn!(
                column = column,
                value = %raw,
                error = %e,
                "Failed to parse money column, using zero"
            );
            Money::default()
        })
    })
}
