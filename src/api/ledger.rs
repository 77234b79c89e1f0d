//! Partnership credit ledger reads.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub partnership_id: i64,
    pub balance: String,
    pub transactions: Vec<LedgerEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub id: i64,
    pub amount: String,
    pub tx_type: String,
    pub reason: String,
    pub balance_after: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wholesale_order_id: Option<i64>,
    pub created_at_ms: i64,
}

pub async fn get_ledger(
    Path(partnership_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    let partnership = state
        .repo
        .get_partnership(partnership_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Partnership {} not found", partnership_id)))?;

    let transactions = state
        .repo
        .list_credit_transactions(partnership_id)
        .await?
        .into_iter()
        .map(|tx| LedgerEntryDto {
            id: tx.id,
            amount: tx.amount.to_canonical_string(),
            tx_type: tx.tx_type.as_str().to_string(),
            reason: tx.reason,
            balance_after: tx.balance_after.to_canonical_string(),
            conversion_id: tx.conversion_id,
            wholesale_order_id: tx.wholesale_order_id,
            created_at_ms: tx.created_at.as_ms(),
        })
        .collect();

    Ok(Json(LedgerResponse {
        partnership_id,
        balance: partnership.credit_balance.to_canonical_string(),
        transactions,
    }))
}
