//! Inventory reads and the store POS sale feed.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    pub store_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub inventory: Vec<InventoryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDto {
    pub sku: String,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
    pub quantity_incoming: i64,
}

pub async fn list_inventory(
    Query(params): Query<InventoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<InventoryResponse>, AppError> {
    let inventory = state
        .repo
        .list_inventory(params.store_id)
        .await?
        .into_iter()
        .map(|row| InventoryDto {
            sku: row.sku,
            quantity_on_hand: row.quantity_on_hand,
            quantity_reserved: row.quantity_reserved,
            quantity_available: row.quantity_available,
            quantity_incoming: row.quantity_incoming,
        })
        .collect();

    Ok(Json(InventoryResponse { inventory }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    pub store_id: i64,
    pub sku: String,
    pub quantity: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleResponse {
    pub quantity_on_hand: i64,
}

pub async fn record_sale(
    State(state): State<AppState>,
    Json(request): Json<RecordSaleRequest>,
) -> Result<Json<RecordSaleResponse>, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Sale quantity must be positive".to_string(),
        ));
    }

    let quantity_on_hand = state
        .repo
        .record_sale(
            request.store_id,
            &request.sku,
            request.quantity,
            request.reference.as_deref(),
        )
        .await?;

    Ok(Json(RecordSaleResponse { quantity_on_hand }))
}
