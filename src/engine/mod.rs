//! Core engines: identity resolution, attribution, commission, the
//! credit ledger poster and inventory staging/reconciliation.

pub mod attribution;
pub mod commission;
pub mod inventory;
pub mod ledger;
pub mod resolver;
pub mod wholesale;

pub use attribution::{AttributionEvaluator, AttributionOutcome, NoAttributionReason};
pub use commission::commission;
pub use inventory::{
    InventoryError, InventoryStager, ReceiptLine, StagingSummary, VerificationResult,
};
pub use ledger::{CreditLedger, LedgerError};
pub use resolver::{IdentityResolver, MatchStrategy, ResolvedCustomer};
pub use wholesale::{OrderLine, SubmittedOrder, WholesaleError, WholesaleService};
