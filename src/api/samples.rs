//! Sample recording: the entry point that makes customers trackable.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::repo::NewSample;
use crate::domain::{NewCustomer, TimeMs};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RecordSampleRequest {
    pub brand_id: i64,
    pub store_id: i64,
    #[serde(default)]
    pub display_id: Option<i64>,
    /// Known member id for repeat sampling; omitted on first contact.
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Sample time override (ms since epoch); defaults to now.
    #[serde(default)]
    pub sampled_at_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecordSampleResponse {
    pub sample_id: i64,
    pub customer_id: i64,
    pub member_id: String,
    pub expires_at_ms: i64,
    pub customer_created: bool,
}

/// Record a sample handed to a customer.
///
/// Creates the customer on first sample; appends an immutable sample
/// history row with the brand's attribution window.
pub async fn record_sample(
    State(state): State<AppState>,
    Json(request): Json<RecordSampleRequest>,
) -> Result<Json<RecordSampleResponse>, AppError> {
    let brand = state
        .repo
        .get_brand(request.brand_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand {} not found", request.brand_id)))?;

    if request.member_id.is_none() && request.phone.is_none() && request.email.is_none() {
        return Err(AppError::BadRequest(
            "A member id or phone/email contact is required".to_string(),
        ));
    }

    let existing = match request.member_id.as_deref() {
        Some(member_id) => Some(
            state
                .repo
                .find_customer_by_member_id(member_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Member {} not found", member_id))
                })?,
        ),
        None => {
            state
                .repo
                .find_customer_by_contact(request.phone.as_deref(), request.email.as_deref())
                .await?
        }
    };

    let customer_created = existing.is_none();
    let customer = match existing {
        Some(customer) => customer,
        None => {
            state
                .repo
                .insert_customer(&NewCustomer {
                    member_id: NewCustomer::fresh_member_id(),
                    brand_id: brand.id,
                    store_id: request.store_id,
                    phone: request.phone.clone(),
                    email: request.email.clone(),
                })
                .await?
        }
    };

    let sampled_at = request
        .sampled_at_ms
        .map(TimeMs::new)
        .unwrap_or_else(TimeMs::now);

    let sample = state
        .repo
        .insert_sample(&NewSample {
            customer_id: customer.id,
            brand_id: brand.id,
            store_id: request.store_id,
            display_id: request.display_id,
            sampled_at,
            attribution_window_days: brand.attribution_window_days,
        })
        .await?;

    state.repo.touch_last_sampled(customer.id, sampled_at).await?;

    Ok(Json(RecordSampleResponse {
        sample_id: sample.id,
        customer_id: customer.id,
        member_id: customer.member_id,
        expires_at_ms: sample.expires_at.as_ms(),
        customer_created,
    }))
}
