//! Store–brand partnerships and brand attribution policy.

use crate::domain::Money;
use serde::{Deserialize, Serialize};

/// A brand organization known to the platform.
///
/// Holds the webhook shared secret (keyed by shop domain) and the brand's
/// default attribution policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    /// E-commerce shop domain, unique; identifies the brand on inbound webhooks.
    pub shop_domain: String,
    #[serde(skip_serializing)]
    pub webhook_secret: String,
    pub attribution_window_days: i64,
    /// Default commission rates (percent), overridable per partnership.
    pub rate_online: Money,
    pub rate_promo: Money,
    pub rate_subscription: Money,
}

/// The commercial relationship between one store and one brand.
///
/// Carries the running credit balance. The balance is mutated only through
/// the credit ledger poster and always equals the sum of the partnership's
/// credit transaction amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandPartnership {
    pub id: i64,
    pub store_id: i64,
    pub brand_id: i64,
    pub credit_balance: Money,
    /// Per-partnership rate overrides; fall back to the brand defaults.
    pub rate_online: Option<Money>,
    pub rate_promo: Option<Money>,
    pub rate_subscription: Option<Money>,
}

/// Commission context: which rate applies to a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Online,
    InPersonPromo,
    Subscription,
}

impl BrandPartnership {
    /// Resolve the effective commission rate for a purchase context.
    ///
    /// Partnership override wins; otherwise the brand default applies.
    pub fn effective_rate(&self, brand: &Brand, kind: RateKind) -> Money {
        match kind {
            RateKind::Online => self.rate_online.unwrap_or(brand.rate_online),
            RateKind::InPersonPromo => self.rate_promo.unwrap_or(brand.rate_promo),
            RateKind::Subscription => self.rate_subscription.unwrap_or(brand.rate_subscription),
        }
    }
}

/// A physical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    /// Short code embedded in platform-controlled customer tags.
    pub store_code: String,
}
