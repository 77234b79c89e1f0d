//! Conversion reads.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionsQuery {
    pub brand_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionsResponse {
    pub conversions: Vec<ConversionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDto {
    pub id: i64,
    pub external_order_id: String,
    pub customer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    pub order_total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_conversion: Option<i64>,
    pub attributed: bool,
    pub paid: bool,
}

pub async fn list_conversions(
    Query(params): Query<ConversionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ConversionsResponse>, AppError> {
    let conversions = state
        .repo
        .list_conversions(params.brand_id)
        .await?
        .into_iter()
        .map(|c| ConversionDto {
            id: c.id,
            external_order_id: c.external_order_id,
            customer_id: c.customer_id,
            store_id: c.store_id,
            order_total: c.order_total.to_canonical_string(),
            commission_rate: c.commission_rate.map(|r| r.to_canonical_string()),
            commission_amount: c.commission_amount.map(|a| a.to_canonical_string()),
            days_to_conversion: c.days_to_conversion,
            attributed: c.attributed,
            paid: c.paid,
        })
        .collect();

    Ok(Json(ConversionsResponse { conversions }))
}
