//! Domain types for the attribution, commission and credit ledger core.
//!
//! This module provides:
//! - Lossless monetary amounts via the Money wrapper
//! - Domain primitives: TimeMs, EventTopic
//! - Customer, sample, partnership, conversion and ledger entry types
//! - Inventory and wholesale replenishment types
//! - The inbound order event payload

pub mod conversion;
pub mod credit;
pub mod customer;
pub mod inventory;
pub mod money;
pub mod order_event;
pub mod partnership;
pub mod primitives;
pub mod sample;
pub mod wholesale;

pub use conversion::{Conversion, NewConversion};
pub use credit::{CreditPosting, CreditTransaction, CreditTransactionType, PostedCredit};
pub use customer::{Customer, LifecycleStage, NewCustomer};
pub use inventory::{
    InventoryTransaction, InventoryTransactionType, ProductMapping, StoreInventory,
};
pub use money::Money;
pub use order_event::{LineItem, OrderCustomer, OrderEvent};
pub use partnership::{Brand, BrandPartnership, RateKind, Store};
pub use primitives::{EventTopic, TimeMs};
pub use sample::SampleHistory;
pub use wholesale::{WholesaleOrder, WholesaleOrderItem, WholesaleStatus};
