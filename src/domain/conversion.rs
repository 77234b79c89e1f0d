//! Conversion records: externally-tracked orders tied back to samples.

use crate::domain::{Money, TimeMs};
use serde::{Deserialize, Serialize};

/// One row per externally-tracked order from a resolved customer.
///
/// UNIQUE(brand_id, external_order_id) in the schema is the idempotency
/// guard: at most one row per delivered order, however many times the
/// webhook is redelivered. Rows are written for attributed and
/// non-attributed orders alike so redelivery of either is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub id: i64,
    pub brand_id: i64,
    pub external_order_id: String,
    pub customer_id: i64,
    /// Store of attribution (from the most recent sample), when attributed.
    pub store_id: Option<i64>,
    pub partnership_id: Option<i64>,
    pub order_total: Money,
    pub commission_rate: Option<Money>,
    pub commission_amount: Option<Money>,
    pub sampled_at: Option<TimeMs>,
    pub purchased_at: TimeMs,
    pub days_to_conversion: Option<i64>,
    pub attributed: bool,
    /// True once the commission credit has been posted to the ledger.
    pub paid: bool,
}

/// Fields for recording a new conversion.
#[derive(Debug, Clone)]
pub struct NewConversion {
    pub brand_id: i64,
    pub external_order_id: String,
    pub customer_id: i64,
    pub store_id: Option<i64>,
    pub partnership_id: Option<i64>,
    pub order_total: Money,
    pub commission_rate: Option<Money>,
    pub commission_amount: Option<Money>,
    pub sampled_at: Option<TimeMs>,
    pub purchased_at: TimeMs,
    pub attributed: bool,
}

impl NewConversion {
    /// Whole days between sample and purchase, when a sample exists.
    pub fn days_to_conversion(&self) -> Option<i64> {
        self.sampled_at.map(|sampled| {
            let elapsed_ms = self.purchased_at.as_ms().saturating_sub(sampled.as_ms());
            elapsed_ms / crate::domain::primitives::DAY_MS
        })
    }
}
