//! The webhook event pipeline: dedup, resolve, attribute, post, stage.
//!
//! Every delivery runs two independent paths — attribution (paid orders
//! only) and wholesale inventory staging — and ends with exactly one
//! durable audit row, whatever the business outcome.

use crate::db::repo::{ConversionOutcome, NewProcessedEvent};
use crate::db::Repository;
use crate::domain::{
    Brand, CreditPosting, EventTopic, Money, NewConversion, OrderEvent, RateKind,
};
use crate::engine::{
    commission, AttributionEvaluator, AttributionOutcome, CreditLedger, IdentityResolver,
    InventoryStager, LedgerError,
};
use crate::platform::CommercePlatform;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Business outcome of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    /// An attributed conversion was recorded.
    Converted,
    /// A tracked customer purchased outside the attribution rules.
    NotAttributed,
    /// The buyer could not be matched to a tracked customer.
    CustomerNotTracked,
    /// A delivery for an order that already produced a conversion.
    Duplicate,
    /// Processed with no attribution work (e.g. fulfillment events).
    Processed,
}

impl ProcessStatus {
    /// Database representation in the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Converted => "converted",
            ProcessStatus::NotAttributed => "not_attributed",
            ProcessStatus::CustomerNotTracked => "customer_not_tracked",
            ProcessStatus::Duplicate => "duplicate",
            ProcessStatus::Processed => "processed",
        }
    }
}

/// What one delivery did, as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub status: ProcessStatus,
    pub reason: String,
    pub customer_id: Option<i64>,
}

/// Errors that fail the whole delivery.
///
/// Transport-level callers surface these so the sender redelivers; the
/// idempotency key makes that safe.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Processes verified order events end to end.
pub struct EventPipeline {
    repo: Arc<Repository>,
    resolver: IdentityResolver,
    evaluator: AttributionEvaluator,
    ledger: CreditLedger,
    stager: InventoryStager,
}

impl EventPipeline {
    pub fn new(repo: Arc<Repository>, platform: Arc<dyn CommercePlatform>) -> Self {
        Self {
            resolver: IdentityResolver::new(repo.clone(), platform),
            evaluator: AttributionEvaluator::new(repo.clone()),
            ledger: CreditLedger::new(repo.clone()),
            stager: InventoryStager::new(repo.clone()),
            repo,
        }
    }

    /// Process one verified delivery and write its audit row.
    pub async fn process(
        &self,
        brand: &Brand,
        topic: EventTopic,
        event: &OrderEvent,
    ) -> Result<PipelineOutcome, PipelineError> {
        let result = self.process_inner(brand, topic, event).await;

        let (status, reason, customer_id) = match &result {
            Ok(outcome) => (
                outcome.status.as_str().to_string(),
                outcome.reason.clone(),
                outcome.customer_id,
            ),
            Err(e) => ("failed".to_string(), e.to_string(), None),
        };
        let audit = self
            .repo
            .insert_processed_event(&NewProcessedEvent {
                topic: topic.as_str().to_string(),
                shop_domain: brand.shop_domain.clone(),
                external_order_id: Some(event.id.clone()),
                customer_id,
                status,
                reason,
            })
            .await;
        if let Err(e) = audit {
            // The audit row must not mask the business outcome.
            error!(error = %e, external_order_id = %event.id, "Failed to write audit row");
        }

        result
    }

    async fn process_inner(
        &self,
        brand: &Brand,
        topic: EventTopic,
        event: &OrderEvent,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut outcome = match topic {
            EventTopic::OrdersPaid => self.run_attribution(brand, event).await?,
            EventTopic::OrdersFulfilled => PipelineOutcome {
                status: ProcessStatus::Processed,
                reason: "fulfillment event".to_string(),
                customer_id: None,
            },
        };

        // The inventory path inspects every event independently of the
        // attribution outcome.
        match self.stager.stage_order(brand, event, topic).await? {
            Some(summary) if summary.already_staged => {
                outcome.reason.push_str("; wholesale staging already recorded");
            }
            Some(summary) => {
                outcome.reason.push_str(&format!(
                    "; staged {} wholesale units as {}",
                    summary.units_staged,
                    summary.tx_type.as_str()
                ));
            }
            None => {}
        }

        Ok(outcome)
    }

    async fn run_attribution(
        &self,
        brand: &Brand,
        event: &OrderEvent,
    ) -> Result<PipelineOutcome, PipelineError> {
        // Dedup before any side effect: at-least-once delivery means this
        // check runs on every event, not just suspected retries.
        if let Some(existing) = self.repo.find_conversion(brand.id, &event.id).await? {
            if existing.attributed && !existing.paid {
                if let Some(partnership_id) = existing.partnership_id {
                    // A crash after the conversion insert left the credit
                    // unposted; redelivery is the repair mechanism.
                    let posting = CreditPosting::earned(
                        partnership_id,
                        existing.commission_amount.unwrap_or_else(Money::zero),
                        format!("commission for order {}", event.id),
                    );
                    if self
                        .ledger
                        .complete_pending(existing.id, &posting)
                        .await?
                        .is_some()
                    {
                        info!(
                            conversion_id = existing.id,
                            "Completed pending credit posting on redelivery"
                        );
                        return Ok(PipelineOutcome {
                            status: ProcessStatus::Duplicate,
                            reason: "completed pending credit posting".to_string(),
                            customer_id: Some(existing.customer_id),
                        });
                    }
                }
            }
            return Ok(PipelineOutcome {
                status: ProcessStatus::Duplicate,
                reason: "conversion already recorded".to_string(),
                customer_id: Some(existing.customer_id),
            });
        }

        let order_customer = event.customer.clone().unwrap_or_default();
        let Some(resolved) = self.resolver.resolve(&order_customer).await? else {
            return Ok(PipelineOutcome {
                status: ProcessStatus::CustomerNotTracked,
                reason: "customer not tracked".to_string(),
                customer_id: None,
            });
        };
        let customer = resolved.customer;
        let purchased_at = event.purchased_at();
        let order_total = event.order_total();

        match self
            .evaluator
            .evaluate(&customer, brand, &event.id, purchased_at)
            .await?
        {
            AttributionOutcome::NotAttributed(no_attribution) => {
                let new = NewConversion {
                    brand_id: brand.id,
                    external_order_id: event.id.clone(),
                    customer_id: customer.id,
                    store_id: None,
                    partnership_id: None,
                    order_total,
                    commission_rate: None,
                    commission_amount: None,
                    sampled_at: None,
                    purchased_at,
                    attributed: false,
                };
                match self.ledger.settle_conversion(&new, None).await? {
                    ConversionOutcome::Recorded { .. } => Ok(PipelineOutcome {
                        status: ProcessStatus::NotAttributed,
                        reason: format!(
                            "{} (matched via {})",
                            no_attribution.as_str(),
                            resolved.strategy.as_str()
                        ),
                        customer_id: Some(customer.id),
                    }),
                    ConversionOutcome::Duplicate => Ok(PipelineOutcome {
                        status: ProcessStatus::Duplicate,
                        reason: "conversion already recorded".to_string(),
                        customer_id: Some(customer.id),
                    }),
                }
            }
            AttributionOutcome::Attributed { sample } => {
                let partnership = self
                    .repo
                    .find_partnership(sample.store_id, brand.id)
                    .await?;

                let (partnership_id, rate, amount, posting) = match &partnership {
                    Some(p) => {
                        let rate = p.effective_rate(brand, RateKind::Online);
                        let amount = commission(order_total, rate);
                        let posting = CreditPosting::earned(
                            p.id,
                            amount,
                            format!("commission for order {}", event.id),
                        );
                        (Some(p.id), Some(rate), Some(amount), Some(posting))
                    }
                    None => {
                        warn!(
                            store_id = sample.store_id,
                            brand_id = brand.id,
                            "Attributed store has no partnership; conversion recorded unpaid"
                        );
                        (None, None, None, None)
                    }
                };

                let new = NewConversion {
                    brand_id: brand.id,
                    external_order_id: event.id.clone(),
                    customer_id: customer.id,
                    store_id: Some(sample.store_id),
                    partnership_id,
                    order_total,
                    commission_rate: rate,
                    commission_amount: amount,
                    sampled_at: Some(sample.sampled_at),
                    purchased_at,
                    attributed: true,
                };

                match self.ledger.settle_conversion(&new, posting.as_ref()).await? {
                    ConversionOutcome::Recorded { posted, .. } => {
                        self.repo
                            .set_lifecycle_stage(
                                customer.id,
                                customer.lifecycle_stage.after_conversion(),
                            )
                            .await?;

                        let reason = match posted {
                            Some(posted) => format!(
                                "commission {} posted (matched via {})",
                                posted.applied,
                                resolved.strategy.as_str()
                            ),
                            None => "attributed; no partnership to credit".to_string(),
                        };
                        Ok(PipelineOutcome {
                            status: ProcessStatus::Converted,
                            reason,
                            customer_id: Some(customer.id),
                        })
                    }
                    ConversionOutcome::Duplicate => Ok(PipelineOutcome {
                        status: ProcessStatus::Duplicate,
                        reason: "conversion already recorded".to_string(),
                        customer_id: Some(customer.id),
                    }),
                }
            }
        }
    }
}
