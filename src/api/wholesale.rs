//! Wholesale order lifecycle endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Money, WholesaleOrder, WholesaleOrderItem};
use crate::engine::{OrderLine, ReceiptLine};
use crate::error::AppError;

fn parse_money(raw: &str, field: &str) -> Result<Money, AppError> {
    Money::from_str(raw)
        .map_err(|_| AppError::BadRequest(format!("Invalid decimal for {}: {}", field, raw)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleOrderDto {
    pub id: i64,
    pub store_id: i64,
    pub brand_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_order_id: Option<String>,
    pub subtotal: String,
    pub applied_credit: String,
    pub total: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy_notes: Option<String>,
    pub items: Vec<WholesaleItemDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleItemDto {
    pub id: i64,
    pub wholesale_sku: String,
    pub retail_sku: String,
    pub units_per_box: i64,
    pub boxes: i64,
    pub expected_units: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_units: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<i64>,
    pub unit_price: String,
}

fn order_dto(order: WholesaleOrder, items: Vec<WholesaleOrderItem>) -> WholesaleOrderDto {
    WholesaleOrderDto {
        id: order.id,
        store_id: order.store_id,
        brand_id: order.brand_id,
        external_order_id: order.external_order_id,
        subtotal: order.subtotal.to_canonical_string(),
        applied_credit: order.applied_credit.to_canonical_string(),
        total: order.total.to_canonical_string(),
        status: order.status.as_str().to_string(),
        discrepancy_notes: order.discrepancy_notes,
        items: items
            .into_iter()
            .map(|item| WholesaleItemDto {
                id: item.id,
                wholesale_sku: item.wholesale_sku,
                retail_sku: item.retail_sku,
                units_per_box: item.units_per_box,
                boxes: item.boxes,
                expected_units: item.expected_units,
                received_units: item.received_units,
                discrepancy: item.discrepancy,
                unit_price: item.unit_price.to_canonical_string(),
            })
            .collect(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub store_id: i64,
    pub brand_id: i64,
    pub lines: Vec<CreateOrderLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderLine {
    pub wholesale_sku: String,
    pub boxes: i64,
    /// Price per box, canonical decimal string.
    pub unit_price: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<WholesaleOrderDto>, AppError> {
    if request.lines.is_empty() {
        return Err(AppError::BadRequest(
            "A wholesale order needs at least one line".to_string(),
        ));
    }

    let mut lines = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        if line.boxes <= 0 {
            return Err(AppError::BadRequest("Box count must be positive".to_string()));
        }
        lines.push(OrderLine {
            wholesale_sku: line.wholesale_sku.clone(),
            boxes: line.boxes,
            unit_price: parse_money(&line.unit_price, "unitPrice")?,
        });
    }

    let order = state
        .wholesale
        .create_order(request.store_id, request.brand_id, &lines)
        .await?;
    let items = state.repo.get_wholesale_order_items(order.id).await?;

    Ok(Json(order_dto(order, items)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    pub external_order_id: String,
    /// Credit to redeem, canonical decimal string; clamped to the balance.
    #[serde(default)]
    pub credit_to_apply: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub credit_applied: String,
    #[serde(flatten)]
    pub order: WholesaleOrderDto,
}

pub async fn submit_order(
    Path(order_id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<Json<SubmitOrderResponse>, AppError> {
    let credit_to_apply = request
        .credit_to_apply
        .as_deref()
        .map(|raw| parse_money(raw, "creditToApply"))
        .transpose()?;

    let submitted = state
        .wholesale
        .submit_order(order_id, &request.external_order_id, credit_to_apply)
        .await?;
    let items = state.repo.get_wholesale_order_items(order_id).await?;

    Ok(Json(SubmitOrderResponse {
        credit_applied: submitted.credit_applied.to_canonical_string(),
        order: order_dto(submitted.order, items),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOrderRequest {
    pub receipts: Vec<VerifyReceiptLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReceiptLine {
    pub item_id: i64,
    pub received_units: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOrderResponse {
    pub received_units: i64,
    pub total_discrepancy: i64,
    #[serde(flatten)]
    pub order: WholesaleOrderDto,
}

pub async fn verify_order(
    Path(order_id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<VerifyOrderRequest>,
) -> Result<Json<VerifyOrderResponse>, AppError> {
    let receipts: Vec<ReceiptLine> = request
        .receipts
        .iter()
        .map(|r| ReceiptLine {
            item_id: r.item_id,
            received_units: r.received_units,
        })
        .collect();

    let result = state
        .stager
        .verify_receipt(order_id, &receipts, request.notes.as_deref())
        .await?;

    let order = state
        .repo
        .get_wholesale_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Wholesale order {} not found", order_id)))?;
    let items = state.repo.get_wholesale_order_items(order_id).await?;

    Ok(Json(VerifyOrderResponse {
        received_units: result.received_units,
        total_discrepancy: result.total_discrepancy,
        order: order_dto(order, items),
    }))
}

pub async fn get_order(
    Path(order_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<WholesaleOrderDto>, AppError> {
    let order = state
        .repo
        .get_wholesale_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Wholesale order {} not found", order_id)))?;
    let items = state.repo.get_wholesale_order_items(order_id).await?;

    Ok(Json(order_dto(order, items)))
}
