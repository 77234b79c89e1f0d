//! Wholesale order creation and submission with credit redemption.

use crate::db::repo::{NewWholesaleItem, NewWholesaleOrder};
use crate::db::Repository;
use crate::domain::{CreditPosting, Money, WholesaleOrder, WholesaleStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// One requested line of a replenishment order.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub wholesale_sku: String,
    pub boxes: i64,
    /// Price per box.
    pub unit_price: Money,
}

/// Errors from the wholesale order lifecycle.
#[derive(Debug, Error)]
pub enum WholesaleError {
    #[error("Wholesale order {0} not found")]
    OrderNotFound(i64),
    #[error("Wholesale order {order_id} cannot be submitted from status {status}")]
    InvalidTransition {
        order_id: i64,
        status: WholesaleStatus,
    },
    #[error("No product mapping for wholesale SKU {0}")]
    MissingMapping(String),
    #[error("No partnership between store {store_id} and brand {brand_id}")]
    PartnershipNotFound { store_id: i64, brand_id: i64 },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Result of submitting a wholesale order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOrder {
    pub order: WholesaleOrder,
    /// Credit actually redeemed (clamped to the partnership balance).
    pub credit_applied: Money,
}

/// Creates and submits replenishment orders.
pub struct WholesaleService {
    repo: Arc<Repository>,
}

impl WholesaleService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create a pending order, expanding each line through its product
    /// mapping.
    pub async fn create_order(
        &self,
        store_id: i64,
        brand_id: i64,
        lines: &[OrderLine],
    ) -> Result<WholesaleOrder, WholesaleError> {
        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = Money::zero();

        for line in lines {
            let mapping = self
                .repo
                .find_mapping_by_wholesale_sku(brand_id, &line.wholesale_sku)
                .await?
                .ok_or_else(|| WholesaleError::MissingMapping(line.wholesale_sku.clone()))?;

            subtotal = subtotal + line.unit_price * Money::from_i64(line.boxes);

            items.push(NewWholesaleItem {
                wholesale_sku: line.wholesale_sku.clone(),
                retail_sku: mapping.retail_sku,
                units_per_box: mapping.units_per_box,
                boxes: line.boxes,
                unit_price: line.unit_price,
            });
        }

        let order = self
            .repo
            .insert_wholesale_order(&NewWholesaleOrder {
                store_id,
                brand_id,
                subtotal,
                items,
            })
            .await?;

        info!(order_id = order.id, store_id, brand_id, "Wholesale order created");
        Ok(order)
    }

    /// Submit a pending order to the platform, optionally redeeming
    /// partnership credit against it.
    ///
    /// Runs as one transaction: the status advance, the (clamped) credit
    /// deduction and the recorded totals commit together. The unredeemed
    /// remainder stays payable in cash, so partial redemption succeeds
    /// rather than failing.
    pub async fn submit_order(
        &self,
        order_id: i64,
        external_order_id: &str,
        credit_to_apply: Option<Money>,
    ) -> Result<SubmittedOrder, WholesaleError> {
        let order = self
            .repo
            .get_wholesale_order(order_id)
            .await?
            .ok_or(WholesaleError::OrderNotFound(order_id))?;

        if order.status != WholesaleStatus::Pending {
            return Err(WholesaleError::InvalidTransition {
                order_id,
                status: order.status,
            });
        }

        let requested = credit_to_apply.unwrap_or_else(Money::zero);
        let partnership = if requested.is_positive() {
            Some(
                self.repo
                    .find_partnership(order.store_id, order.brand_id)
                    .await?
                    .ok_or(WholesaleError::PartnershipNotFound {
                        store_id: order.store_id,
                        brand_id: order.brand_id,
                    })?,
            )
        } else {
            None
        };

        let mut tx = self.repo.pool().begin().await?;

        let advanced = Repository::advance_wholesale_status_on(
            &mut tx,
            order_id,
            WholesaleStatus::Pending,
            WholesaleStatus::Submitted,
        )
        .await?;
        if !advanced {
            // Lost a race with a concurrent submission.
            return Err(WholesaleError::InvalidTransition {
                order_id,
                status: order.status,
            });
        }

        let mut credit_applied = Money::zero();
        if let Some(partnership) = partnership {
            let posting = CreditPosting::deducted(
                partnership.id,
                requested,
                format!("credit applied to wholesale order {}", order_id),
            )
            .for_wholesale_order(order_id);
            let posted = Repository::post_credit_on(&mut tx, &posting).await?;
            credit_applied = posted.applied.abs();
        }

        let total = order.subtotal - credit_applied;
        Repository::record_wholesale_submission_on(
            &mut tx,
            order_id,
            external_order_id,
            credit_applied,
            total,
        )
        .await?;

        tx.commit().await?;

        info!(
            order_id,
            external_order_id,
            credit_applied = %credit_applied,
            total = %total,
            "Wholesale order submitted"
        );

        let order = self
            .repo
            .get_wholesale_order(order_id)
            .await?
            .ok_or(WholesaleError::OrderNotFound(order_id))?;

        Ok(SubmittedOrder {
            order,
            credit_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::db::repo::NewProductMapping;
    use crate::domain::CreditPosting;
    use std::str::FromStr;
    use tempfile::TempDir;

    struct Fixture {
        repo: Arc<Repository>,
        brand_id: i64,
        store_id: i64,
        partnership_id: i64,
        _temp: TempDir,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));

        let brand = repo
            .insert_brand(
                "Acme",
                "acme.example.com",
                "secret",
                30,
                Money::from_str("10").unwrap(),
                Money::zero(),
                Money::zero(),
            )
            .await
            .unwrap();
        let store = repo.insert_store("Downtown", "DT-01").await.unwrap();
        let partnership = repo.insert_partnership(store.id, brand.id).await.unwrap();

        repo.insert_product_mapping(&NewProductMapping {
            brand_id: brand.id,
            wholesale_sku: "GRN-TEA-CS".to_string(),
            retail_sku: "GRN-TEA".to_string(),
            external_product_id: None,
            external_variant_id: None,
            units_per_box: 6,
        })
        .await
        .unwrap();

        Fixture {
            repo,
            brand_id: brand.id,
            store_id: store.id,
            partnership_id: partnership.id,
            _temp: temp_dir,
        }
    }

    fn two_boxes() -> Vec<OrderLine> {
        vec![OrderLine {
            wholesale_sku: "GRN-TEA-CS".to_string(),
            boxes: 2,
            unit_price: Money::from_str("54").unwrap(),
        }]
    }

    #[tokio::test]
    async fn test_create_order_computes_subtotal() {
        let f = setup().await;
        let service = WholesaleService::new(f.repo.clone());

        let order = service
            .create_order(f.store_id, f.brand_id, &two_boxes())
            .await
            .unwrap();
        assert_eq!(order.subtotal, Money::from_str("108").unwrap());
        assert_eq!(order.status, WholesaleStatus::Pending);

        let items = f.repo.get_wholesale_order_items(order.id).await.unwrap();
        assert_eq!(items[0].expected_units, 12);
        assert_eq!(items[0].retail_sku, "GRN-TEA");
    }

    #[tokio::test]
    async fn test_create_order_unknown_sku() {
        let f = setup().await;
        let service = WholesaleService::new(f.repo.clone());

        let err = service
            .create_order(
                f.store_id,
                f.brand_id,
                &[OrderLine {
                    wholesale_sku: "MISSING-CS".to_string(),
                    boxes: 1,
                    unit_price: Money::from_str("10").unwrap(),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WholesaleError::MissingMapping(sku) if sku == "MISSING-CS"));
    }

    #[tokio::test]
    async fn test_submit_with_partial_credit_redemption() {
        let f = setup().await;
        let service = WholesaleService::new(f.repo.clone());

        // Balance is only 12; a 20 redemption clamps, remainder is cash.
        f.repo
            .post_credit(&CreditPosting::earned(
                f.partnership_id,
                Money::from_str("12").unwrap(),
                "commission",
            ))
            .await
            .unwrap();

        let order = service
            .create_order(f.store_id, f.brand_id, &two_boxes())
            .await
            .unwrap();
        let submitted = service
            .submit_order(order.id, "ext-777", Some(Money::from_str("20").unwrap()))
            .await
            .unwrap();

        assert_eq!(submitted.credit_applied, Money::from_str("12").unwrap());
        assert_eq!(submitted.order.applied_credit, Money::from_str("12").unwrap());
        assert_eq!(submitted.order.total, Money::from_str("96").unwrap());
        assert_eq!(submitted.order.status, WholesaleStatus::Submitted);
        assert_eq!(
            submitted.order.external_order_id.as_deref(),
            Some("ext-777")
        );

        // Balance drained to zero, ledger entry linked to the order.
        let partnership = f
            .repo
            .get_partnership(f.partnership_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(partnership.credit_balance, Money::zero());
        let txs = f
            .repo
            .list_credit_transactions(f.partnership_id)
            .await
            .unwrap();
        assert_eq!(txs.last().unwrap().wholesale_order_id, Some(order.id));
    }

    #[tokio::test]
    async fn test_submit_without_credit() {
        let f = setup().await;
        let service = WholesaleService::new(f.repo.clone());

        let order = service
            .create_order(f.store_id, f.brand_id, &two_boxes())
            .await
            .unwrap();
        let submitted = service.submit_order(order.id, "ext-1", None).await.unwrap();

        assert_eq!(submitted.credit_applied, Money::zero());
        assert_eq!(submitted.order.total, Money::from_str("108").unwrap());

        let txs = f
            .repo
            .list_credit_transactions(f.partnership_id)
            .await
            .unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn test_double_submission_rejected() {
        let f = setup().await;
        let service = WholesaleService::new(f.repo.clone());

        let order = service
            .create_order(f.store_id, f.brand_id, &two_boxes())
            .await
            .unwrap();
        service.submit_order(order.id, "ext-1", None).await.unwrap();

        let err = service
            .submit_order(order.id, "ext-1", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WholesaleError::InvalidTransition {
                status: WholesaleStatus::Submitted,
                ..
            }
        ));
    }
}
