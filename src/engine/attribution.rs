//! Attribution evaluation: does a purchase count as a conversion?

use crate::db::Repository;
use crate::domain::{Brand, Customer, SampleHistory, TimeMs};
use std::sync::Arc;

/// Why a purchase did not attribute.
///
/// These are expected, frequent outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoAttributionReason {
    /// The customer has no sample for this brand.
    NoSampleHistory,
    /// The most recent sample's window closed before the purchase.
    WindowExpired,
    /// This external order id already produced a conversion.
    AlreadyAttributed,
}

impl NoAttributionReason {
    /// Name used in audit reasons and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoAttributionReason::NoSampleHistory => "no sample history",
            NoAttributionReason::WindowExpired => "attribution window expired",
            NoAttributionReason::AlreadyAttributed => "already attributed",
        }
    }
}

/// Outcome of evaluating a purchase against the brand's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributionOutcome {
    /// The purchase attributes to the store on the given sample.
    Attributed { sample: SampleHistory },
    /// The purchase does not attribute, with the reason why.
    NotAttributed(NoAttributionReason),
}

/// Evaluates purchases against sample history and the brand window.
pub struct AttributionEvaluator {
    repo: Arc<Repository>,
}

impl AttributionEvaluator {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Decide whether a purchase counts as an attributed conversion.
    ///
    /// Attribute iff the customer's most recent sample for this brand
    /// exists, its expiry is at or after the purchase timestamp, and the
    /// external order id has not already produced a conversion. The store
    /// of attribution is the store on that sample, not necessarily the
    /// customer's signup store.
    pub async fn evaluate(
        &self,
        customer: &Customer,
        brand: &Brand,
        external_order_id: &str,
        purchased_at: TimeMs,
    ) -> Result<AttributionOutcome, sqlx::Error> {
        if self
            .repo
            .find_conversion(brand.id, external_order_id)
            .await?
            .is_some()
        {
            return Ok(AttributionOutcome::NotAttributed(
                NoAttributionReason::AlreadyAttributed,
            ));
        }

        let Some(sample) = self.repo.latest_sample(customer.id, brand.id).await? else {
            return Ok(AttributionOutcome::NotAttributed(
                NoAttributionReason::NoSampleHistory,
            ));
        };

        if !sample.covers(purchased_at) {
            return Ok(AttributionOutcome::NotAttributed(
                NoAttributionReason::WindowExpired,
            ));
        }

        Ok(AttributionOutcome::Attributed { sample })
    }
}
