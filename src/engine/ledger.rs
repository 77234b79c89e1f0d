//! Credit ledger poster: the single policy surface for balance mutations.

use crate::db::repo::ConversionOutcome;
use crate::db::Repository;
use crate::domain::{CreditPosting, NewConversion, PostedCredit};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by ledger postings.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Partnership {0} not found")]
    PartnershipNotFound(i64),
    #[error(transparent)]
    Db(sqlx::Error),
}

/// True for storage-contention errors worth one retry.
fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

fn map_posting_error(partnership_id: i64, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::RowNotFound => LedgerError::PartnershipNotFound(partnership_id),
        other => LedgerError::Db(other),
    }
}

/// Posts signed amounts against partnership balances.
///
/// Every mutation is a single read-modify-write transaction in the
/// storage layer; deductions clamp to the available balance rather than
/// failing. Contention gets exactly one retry — beyond that the caller's
/// redelivery plus the idempotency key make retries safe.
pub struct CreditLedger {
    repo: Arc<Repository>,
}

impl CreditLedger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Post a signed amount to a partnership balance.
    ///
    /// Positive amounts earn; negative amounts deduct, clamped to the
    /// available balance. The returned `applied` is what actually landed.
    pub async fn post(&self, posting: &CreditPosting) -> Result<PostedCredit, LedgerError> {
        match self.repo.post_credit(posting).await {
            Ok(posted) => Ok(posted),
            Err(e) if is_contention(&e) => {
                warn!(
                    partnership_id = posting.partnership_id,
                    "Credit posting hit contention, retrying once"
                );
                self.repo
                    .post_credit(posting)
                    .await
                    .map_err(|e| map_posting_error(posting.partnership_id, e))
            }
            Err(e) => Err(map_posting_error(posting.partnership_id, e)),
        }
    }

    /// Record a conversion and its commission posting as one atomic unit.
    ///
    /// Redelivery of the same (brand, external order id) yields
    /// `ConversionOutcome::Duplicate` with nothing posted.
    pub async fn settle_conversion(
        &self,
        new: &NewConversion,
        posting: Option<&CreditPosting>,
    ) -> Result<ConversionOutcome, LedgerError> {
        match self.repo.record_conversion(new, posting).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if is_contention(&e) => {
                warn!(
                    external_order_id = %new.external_order_id,
                    "Conversion settlement hit contention, retrying once"
                );
                self.repo
                    .record_conversion(new, posting)
                    .await
                    .map_err(LedgerError::Db)
            }
            Err(sqlx::Error::RowNotFound) => Err(LedgerError::PartnershipNotFound(
                posting.map(|p| p.partnership_id).unwrap_or_default(),
            )),
            Err(e) => Err(LedgerError::Db(e)),
        }
    }

    /// Complete the posting for an attributed conversion left unpaid by
    /// an earlier failure. Returns None when nothing was pending.
    pub async fn complete_pending(
        &self,
        conversion_id: i64,
        posting: &CreditPosting,
    ) -> Result<Option<PostedCredit>, LedgerError> {
        self.repo
            .complete_conversion_credit(conversion_id, posting)
            .await
            .map_err(|e| map_posting_error(posting.partnership_id, e))
    }
}
