//! Tracked customer records and lifecycle stages.

use crate::domain::TimeMs;
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a tracked customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStage {
    /// Has received at least one sample, no attributed purchase yet.
    Sampled,
    /// Has at least one attributed purchase.
    Converted,
    /// Has more than one attributed purchase.
    Repeat,
}

impl LifecycleStage {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Sampled => "sampled",
            LifecycleStage::Converted => "converted",
            LifecycleStage::Repeat => "repeat",
        }
    }

    /// Parse the database representation. Unknown values fall back to Sampled.
    pub fn parse(s: &str) -> Self {
        match s {
            "converted" => LifecycleStage::Converted,
            "repeat" => LifecycleStage::Repeat,
            _ => LifecycleStage::Sampled,
        }
    }

    /// The stage after one more attributed purchase.
    pub fn after_conversion(&self) -> Self {
        match self {
            LifecycleStage::Sampled => LifecycleStage::Converted,
            LifecycleStage::Converted | LifecycleStage::Repeat => LifecycleStage::Repeat,
        }
    }
}

/// A customer tracked by the platform.
///
/// Created on first sample request, updated by attribution and purchase
/// events, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    /// Platform-assigned member id; appears in platform-controlled order tags.
    pub member_id: String,
    /// Brand that owns this customer relationship.
    pub brand_id: i64,
    /// Store where the customer first signed up.
    pub store_id: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// E-commerce platform customer id, null until linked by the resolver.
    pub external_customer_id: Option<String>,
    pub lifecycle_stage: LifecycleStage,
    pub last_sampled_at: Option<TimeMs>,
}

/// Fields for creating a customer on first sample.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub member_id: String,
    pub brand_id: i64,
    pub store_id: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl NewCustomer {
    /// Generate a fresh member id for a brand-new customer.
    pub fn fresh_member_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
