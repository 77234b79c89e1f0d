//! Store inventory counters and the append-only inventory ledger.

use crate::domain::TimeMs;
use serde::{Deserialize, Serialize};

/// Per store/SKU stock record.
///
/// Invariant (outside of mid-transition states):
/// available <= on_hand - reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInventory {
    pub id: i64,
    pub store_id: i64,
    pub sku: String,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
    /// Units expected from wholesale orders, not yet confirmed received.
    pub quantity_incoming: i64,
}

/// Type of an inventory counter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryTransactionType {
    /// Retail sale decrementing on-hand.
    Sale,
    /// Wholesale units staged at order payment.
    WholesaleOrdered,
    /// Wholesale units staged at order fulfillment/shipment.
    WholesaleIncoming,
    /// Verified receipt moving incoming units on-hand.
    Received,
    /// Manual correction.
    Adjustment,
}

impl InventoryTransactionType {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryTransactionType::Sale => "sale",
            InventoryTransactionType::WholesaleOrdered => "wholesale_ordered",
            InventoryTransactionType::WholesaleIncoming => "wholesale_incoming",
            InventoryTransactionType::Received => "received",
            InventoryTransactionType::Adjustment => "adjustment",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(InventoryTransactionType::Sale),
            "wholesale_ordered" => Some(InventoryTransactionType::WholesaleOrdered),
            "wholesale_incoming" => Some(InventoryTransactionType::WholesaleIncoming),
            "received" => Some(InventoryTransactionType::Received),
            "adjustment" => Some(InventoryTransactionType::Adjustment),
            _ => None,
        }
    }
}

/// Append-only log entry for an inventory counter change.
///
/// Mirrors the credit ledger: signed quantity plus the resulting balance
/// of the counter the change targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: i64,
    pub store_id: i64,
    pub sku: String,
    pub tx_type: InventoryTransactionType,
    pub quantity: i64,
    pub balance_after: i64,
    /// Originating reference, e.g. "order:<external order id>".
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: TimeMs,
}

/// Wholesale-to-retail product mapping, input to the ordered product match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub id: i64,
    pub brand_id: i64,
    pub wholesale_sku: String,
    pub retail_sku: String,
    pub external_product_id: Option<String>,
    pub external_variant_id: Option<String>,
    pub units_per_box: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_tx_type_roundtrip() {
        for t in [
            InventoryTransactionType::Sale,
            InventoryTransactionType::WholesaleOrdered,
            InventoryTransactionType::WholesaleIncoming,
            InventoryTransactionType::Received,
            InventoryTransactionType::Adjustment,
        ] {
            assert_eq!(InventoryTransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(InventoryTransactionType::parse("transfer"), None);
    }
}
