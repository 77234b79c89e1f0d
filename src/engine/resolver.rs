//! Identity resolution: match an inbound order to a tracked customer.

use crate::db::Repository;
use crate::domain::order_event::{tag_value, MEMBER_TAG_PREFIX, STORE_TAG_PREFIX};
use crate::domain::{Customer, OrderCustomer};
use crate::platform::CommercePlatform;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One strategy in the resolution chain, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Platform-controlled member-id tag on the order's customer.
    MemberTag,
    /// Store-code tag combined with buyer phone-or-email.
    StoreTagContact,
    /// Previously linked external customer id.
    LinkedExternalId,
    /// Raw phone-or-email fallback.
    Contact,
}

impl MatchStrategy {
    /// The full chain, evaluated in order; first match wins.
    pub const CHAIN: [MatchStrategy; 4] = [
        MatchStrategy::MemberTag,
        MatchStrategy::StoreTagContact,
        MatchStrategy::LinkedExternalId,
        MatchStrategy::Contact,
    ];

    /// Name used in audit reasons and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::MemberTag => "member_tag",
            MatchStrategy::StoreTagContact => "store_tag_contact",
            MatchStrategy::LinkedExternalId => "linked_external_id",
            MatchStrategy::Contact => "contact",
        }
    }
}

/// A resolved customer plus the strategy that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCustomer {
    pub customer: Customer,
    pub strategy: MatchStrategy,
}

/// Resolves order events to tracked customers through the strategy chain.
pub struct IdentityResolver {
    repo: Arc<Repository>,
    platform: Arc<dyn CommercePlatform>,
}

impl IdentityResolver {
    pub fn new(repo: Arc<Repository>, platform: Arc<dyn CommercePlatform>) -> Self {
        Self { repo, platform }
    }

    /// Find the tracked customer for an order's buyer block.
    ///
    /// Strategies run in strict order; the first match wins. A match via
    /// any strategy other than the linked external id links the external
    /// id as a side effect so later events take the faster path. No
    /// match is an expected outcome, not an error.
    pub async fn resolve(
        &self,
        order_customer: &OrderCustomer,
    ) -> Result<Option<ResolvedCustomer>, sqlx::Error> {
        let tags = self.effective_tags(order_customer).await;
        let phone = order_customer.phone.as_deref();
        let email = order_customer.email.as_deref();

        for strategy in MatchStrategy::CHAIN {
            let matched = match strategy {
                MatchStrategy::MemberTag => match tag_value(&tags, MEMBER_TAG_PREFIX) {
                    Some(member_id) => self.repo.find_customer_by_member_id(member_id).await?,
                    None => None,
                },
                MatchStrategy::StoreTagContact => match tag_value(&tags, STORE_TAG_PREFIX) {
                    Some(store_code) => match self.repo.find_store_by_code(store_code).await? {
                        Some(store) => {
                            self.repo
                                .find_customer_by_store_and_contact(store.id, phone, email)
                                .await?
                        }
                        None => None,
                    },
                    None => None,
                },
                MatchStrategy::LinkedExternalId => match order_customer.id.as_deref() {
                    Some(external_id) => self.repo.find_customer_by_external_id(external_id).await?,
                    None => None,
                },
                MatchStrategy::Contact => self.repo.find_customer_by_contact(phone, email).await?,
            };

            if let Some(customer) = matched {
                debug!(
                    customer_id = customer.id,
                    strategy = strategy.as_str(),
                    "Resolved order customer"
                );
                let customer = self.link_if_unlinked(customer, strategy, order_customer).await?;
                return Ok(Some(ResolvedCustomer { customer, strategy }));
            }
        }

        Ok(None)
    }

    /// Tags from the payload, or fetched from the platform when absent.
    ///
    /// The fetch is best-effort: a failure degrades to "no tags".
    async fn effective_tags(&self, order_customer: &OrderCustomer) -> Vec<String> {
        let tags = order_customer.tag_list();
        if !tags.is_empty() {
            return tags;
        }

        let Some(external_id) = order_customer.id.as_deref() else {
            return tags;
        };

        match self.platform.fetch_customer_tags(external_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(
                    external_customer_id = external_id,
                    error = %e,
                    "Tag lookup failed, resolving with payload data only"
                );
                Vec::new()
            }
        }
    }

    async fn link_if_unlinked(
        &self,
        mut customer: Customer,
        strategy: MatchStrategy,
        order_customer: &OrderCustomer,
    ) -> Result<Customer, sqlx::Error> {
        if strategy == MatchStrategy::LinkedExternalId || customer.external_customer_id.is_some() {
            return Ok(customer);
        }
        let Some(external_id) = order_customer.id.as_deref() else {
            return Ok(customer);
        };

        self.repo
            .link_external_customer_id(customer.id, external_id)
            .await?;
        customer.external_customer_id = Some(external_id.to_string());
        info!(
            customer_id = customer.id,
            external_customer_id = external_id,
            "Linked external customer id"
        );
        Ok(customer)
    }
}
