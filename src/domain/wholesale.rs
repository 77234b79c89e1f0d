//! Wholesale replenishment orders and their lifecycle.

use crate::domain::{Money, TimeMs};
use serde::{Deserialize, Serialize};

/// Lifecycle of a wholesale order.
///
/// pending → submitted → delivered → verified. No transition skips a
/// state; verified is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WholesaleStatus {
    Pending,
    Submitted,
    Delivered,
    Verified,
}

impl WholesaleStatus {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WholesaleStatus::Pending => "pending",
            WholesaleStatus::Submitted => "submitted",
            WholesaleStatus::Delivered => "delivered",
            WholesaleStatus::Verified => "verified",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WholesaleStatus::Pending),
            "submitted" => Some(WholesaleStatus::Submitted),
            "delivered" => Some(WholesaleStatus::Delivered),
            "verified" => Some(WholesaleStatus::Verified),
            _ => None,
        }
    }

    /// The only state this one may advance to, if any.
    pub fn next(&self) -> Option<WholesaleStatus> {
        match self {
            WholesaleStatus::Pending => Some(WholesaleStatus::Submitted),
            WholesaleStatus::Submitted => Some(WholesaleStatus::Delivered),
            WholesaleStatus::Delivered => Some(WholesaleStatus::Verified),
            WholesaleStatus::Verified => None,
        }
    }

    /// True if `to` is the direct successor of this state.
    pub fn can_advance_to(&self, to: WholesaleStatus) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for WholesaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A replenishment order placed by a store against a brand's wholesale
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholesaleOrder {
    pub id: i64,
    pub store_id: i64,
    pub brand_id: i64,
    /// Order id on the e-commerce platform, linked at submission.
    pub external_order_id: Option<String>,
    pub subtotal: Money,
    /// Partnership credit redeemed at submission (clamped to balance).
    pub applied_credit: Money,
    /// subtotal - applied_credit; the cash remainder.
    pub total: Money,
    pub status: WholesaleStatus,
    pub discrepancy_notes: Option<String>,
    pub created_at: TimeMs,
    pub verified_at: Option<TimeMs>,
}

/// One wholesale (box) line on a replenishment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholesaleOrderItem {
    pub id: i64,
    pub order_id: i64,
    pub wholesale_sku: String,
    pub retail_sku: String,
    pub units_per_box: i64,
    pub boxes: i64,
    /// boxes * units_per_box, staged as incoming.
    pub expected_units: i64,
    /// Physically confirmed at verification.
    pub received_units: Option<i64>,
    /// expected_units - received_units, recorded at verification.
    pub discrepancy: Option<i64>,
    /// Price per box.
    pub unit_price: Money,
}
