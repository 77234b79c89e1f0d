//! Webhook ingress for order events from the e-commerce platform.
//!
//! POST /webhooks/orders — raw body (not extracted JSON) so the HMAC is
//! computed over the exact bytes on the wire.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::api::signature::verify_signature;
use crate::api::AppState;
use crate::db::repo::NewProcessedEvent;
use crate::domain::{EventTopic, OrderEvent};
use crate::error::AppError;

/// Header carrying the brand's shop domain.
pub const SHOP_DOMAIN_HEADER: &str = "x-platform-shop-domain";
/// Header carrying the event topic.
pub const TOPIC_HEADER: &str = "x-platform-topic";
/// Header carrying the hex HMAC-SHA256 signature of the body.
pub const SIGNATURE_HEADER: &str = "x-platform-hmac-sha256";

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", name)))
}

/// Handle an inbound order event.
///
/// Transport, auth and parse failures return 4xx with no side effects.
/// Every business-level outcome — duplicate, unmatched customer, not
/// attributed — acknowledges with 200 so the sender stops redelivering.
pub async fn handle_order_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let shop_domain = required_header(&headers, SHOP_DOMAIN_HEADER)?;
    let topic_header = required_header(&headers, TOPIC_HEADER)?;
    let signature = required_header(&headers, SIGNATURE_HEADER)?;

    let brand = state
        .repo
        .find_brand_by_domain(shop_domain)
        .await?
        .ok_or_else(|| {
            warn!(shop_domain, "Webhook from unknown shop domain");
            AppError::Unauthorized("Unknown shop domain".to_string())
        })?;

    if let Err(e) = verify_signature(&body, signature, &brand.webhook_secret) {
        warn!(shop_domain, error = %e, "Webhook signature verification failed");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let event: OrderEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid order payload: {}", e)))?;

    let Some(topic) = EventTopic::parse(topic_header) else {
        // Unrecognized topics are acknowledged and ignored, but audited.
        info!(shop_domain, topic = topic_header, "Ignoring unhandled webhook topic");
        state
            .repo
            .insert_processed_event(&NewProcessedEvent {
                topic: topic_header.to_string(),
                shop_domain: shop_domain.to_string(),
                external_order_id: Some(event.id.clone()),
                customer_id: None,
                status: "ignored".to_string(),
                reason: "unhandled topic".to_string(),
            })
            .await?;
        return Ok(Json(json!({"status": "ignored", "reason": "unhandled topic"})));
    };

    info!(
        shop_domain,
        topic = topic.as_str(),
        external_order_id = %event.id,
        "Processing order event"
    );

    let outcome = state.pipeline.process(&brand, topic, &event).await?;

    Ok(Json(json!({
        "status": outcome.status.as_str(),
        "reason": outcome.reason,
    })))
}
