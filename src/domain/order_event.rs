//! Inbound order event payloads from the e-commerce platform.

use crate::domain::{Money, TimeMs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tag prefix for the platform-controlled member id tag.
pub const MEMBER_TAG_PREFIX: &str = "member:";
/// Tag prefix for the platform-controlled store code tag.
pub const STORE_TAG_PREFIX: &str = "store:";

/// JSON order representation delivered by the webhook.
///
/// Prices arrive as canonical decimal strings; identifiers are kept as
/// strings regardless of how the platform encodes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Stable external order id; the idempotency key together with the brand.
    pub id: String,
    #[serde(default)]
    pub total_price: String,
    /// RFC 3339 creation timestamp, when supplied.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// Buyer identity block on an order event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Comma-separated free-text tags, platform convention.
    #[serde(default)]
    pub tags: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub price: String,
}

fn default_quantity() -> i64 {
    1
}

impl OrderEvent {
    /// Order total as Money; unparseable totals read as zero.
    pub fn order_total(&self) -> Money {
        Money::from_str(&self.total_price).unwrap_or_default()
    }

    /// Purchase timestamp: payload created_at when parseable, else now.
    pub fn purchased_at(&self) -> TimeMs {
        self.created_at
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| TimeMs::new(dt.timestamp_millis()))
            .unwrap_or_else(TimeMs::now)
    }
}

impl OrderCustomer {
    /// Split the comma-separated tag string into trimmed tags.
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(self.tags.as_deref().unwrap_or(""))
    }
}

/// Split a comma-separated tag string into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Extract the value of the first tag with the given prefix.
pub fn tag_value<'a>(tags: &'a [String], prefix: &str) -> Option<&'a str> {
    tags.iter()
        .find_map(|t| t.strip_prefix(prefix))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_order_event() {
        let json = serde_json::json!({
            "id": "820982911946154508",
            "total_price": "133.33",
            "created_at": "2024-03-01T12:00:00Z",
            "customer": {
                "id": "207119551",
                "email": "jane@example.com",
                "phone": "+15551234567",
                "tags": "member:abc-123, store:DT-01"
            },
            "line_items": [
                {"product_id": "632910392", "variant_id": "808950810",
                 "sku": "GRN-TEA-CS", "quantity": 2, "price": "54.00"}
            ]
        });

        let event: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.id, "820982911946154508");
        assert_eq!(event.order_total().to_canonical_string(), "133.33");
        assert_eq!(event.line_items.len(), 1);
        assert_eq!(event.line_items[0].quantity, 2);

        let tags = event.customer.as_ref().unwrap().tag_list();
        assert_eq!(tag_value(&tags, MEMBER_TAG_PREFIX), Some("abc-123"));
        assert_eq!(tag_value(&tags, STORE_TAG_PREFIX), Some("DT-01"));
    }

    #[test]
    fn test_purchased_at_parses_rfc3339() {
        let event = OrderEvent {
            id: "1".to_string(),
            total_price: "0".to_string(),
            created_at: Some("1970-01-02T00:00:00Z".to_string()),
            customer: None,
            line_items: vec![],
        };
        assert_eq!(event.purchased_at().as_ms(), 86_400_000);
    }

    #[test]
    fn test_purchased_at_falls_back_to_now() {
        let event = OrderEvent {
            id: "1".to_string(),
            total_price: "0".to_string(),
            created_at: Some("not a timestamp".to_string()),
            customer: None,
            line_items: vec![],
        };
        assert!(event.purchased_at().as_ms() > 0);
    }

    #[test]
    fn test_split_tags_trims_and_drops_empty() {
        assert_eq!(
            split_tags(" a, b ,, c "),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_tag_value_missing() {
        let tags = split_tags("vip, newsletter");
        assert_eq!(tag_value(&tags, MEMBER_TAG_PREFIX), None);
    }

    #[test]
    fn test_minimal_payload_defaults() {
        let event: OrderEvent = serde_json::from_value(serde_json::json!({"id": "9"})).unwrap();
        assert!(event.customer.is_none());
        assert!(event.line_items.is_empty());
        assert!(event.order_total().is_zero());
    }
}
