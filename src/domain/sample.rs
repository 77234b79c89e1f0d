//! Immutable sample history records.

use crate::domain::TimeMs;
use serde::{Deserialize, Serialize};

/// One sample given to a customer by a brand at a store.
///
/// Immutable once written; the most recent record per (customer, brand)
/// decides attribution eligibility and the store of attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleHistory {
    pub id: i64,
    pub customer_id: i64,
    pub brand_id: i64,
    pub store_id: i64,
    /// In-store display the sample was taken from, when known.
    pub display_id: Option<i64>,
    pub sampled_at: TimeMs,
    pub attribution_window_days: i64,
    /// sampled_at + attribution window; purchases at or before this instant attribute.
    pub expires_at: TimeMs,
}

impl SampleHistory {
    /// Compute the expiry for a sample taken at `sampled_at` with the given window.
    pub fn compute_expires_at(sampled_at: TimeMs, attribution_window_days: i64) -> TimeMs {
        sampled_at.plus_days(attribution_window_days)
    }

    /// True if a purchase at `purchased_at` falls inside the attribution window.
    pub fn covers(&self, purchased_at: TimeMs) -> bool {
        self.expires_at >= purchased_at
    }
}
