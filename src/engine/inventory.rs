//! Inventory staging and two-phase reconciliation.

use crate::db::Repository;
use crate::domain::{
    Brand, EventTopic, InventoryTransactionType, LineItem, OrderEvent, ProductMapping, TimeMs,
    WholesaleStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Suffix convention: wholesale (case) SKU = retail SKU + "-CS".
pub const CASE_SKU_SUFFIX: &str = "-CS";

/// Errors from staging and reconciliation.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Wholesale order {0} not found")]
    OrderNotFound(i64),
    #[error("Wholesale order {0} is already verified")]
    AlreadyVerified(i64),
    #[error("Wholesale order {order_id} cannot be verified from status {status}")]
    InvalidTransition {
        order_id: i64,
        status: WholesaleStatus,
    },
    #[error("Item {item_id} does not belong to wholesale order {order_id}")]
    UnknownItem { order_id: i64, item_id: i64 },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// What a staging pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSummary {
    pub order_id: i64,
    pub tx_type: InventoryTransactionType,
    pub lines_staged: usize,
    pub units_staged: i64,
    /// True when this order's units were already staged and nothing ran.
    pub already_staged: bool,
}

/// Store-confirmed quantities for one order item.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptLine {
    pub item_id: i64,
    pub received_units: i64,
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub order_id: i64,
    pub received_units: i64,
    /// Sum of per-item (expected - received); recorded, never auto-corrected.
    pub total_discrepancy: i64,
}

/// Stages wholesale units as incoming and reconciles physical receipt.
pub struct InventoryStager {
    repo: Arc<Repository>,
}

impl InventoryStager {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Resolve an order line to its product mapping.
    ///
    /// Ordered match, first hit wins: external variant id, then external
    /// product id, then the case-suffix convention on the SKU.
    pub async fn match_line(
        &self,
        brand_id: i64,
        line: &LineItem,
    ) -> Result<Option<ProductMapping>, sqlx::Error> {
        if let Some(variant_id) = line.variant_id.as_deref() {
            if let Some(mapping) = self.repo.find_mapping_by_variant(brand_id, variant_id).await? {
                return Ok(Some(mapping));
            }
        }

        if let Some(product_id) = line.product_id.as_deref() {
            if let Some(mapping) = self.repo.find_mapping_by_product(brand_id, product_id).await? {
                return Ok(Some(mapping));
            }
        }

        if let Some(sku) = line.sku.as_deref() {
            if let Some(retail_sku) = sku.strip_suffix(CASE_SKU_SUFFIX) {
                if let Some(mapping) = self
                    .repo
                    .find_mapping_by_retail_sku(brand_id, retail_sku)
                    .await?
                {
                    return Ok(Some(mapping));
                }
            }
        }

        Ok(None)
    }

    /// Stage an order event's wholesale lines as incoming units.
    ///
    /// Only orders linked to a wholesale order (by external order id) are
    /// staged — the linked order supplies the receiving store. Units are
    /// staged once per order, by whichever lifecycle event arrives first
    /// (they may be reordered): the logged transaction type records the
    /// trigger, `wholesale_ordered` for paid and `wholesale_incoming` for
    /// fulfilled. A defensive existence check makes any second staging
    /// pass for the same order a no-op, while status transitions still
    /// follow each topic.
    pub async fn stage_order(
        &self,
        brand: &Brand,
        event: &OrderEvent,
        topic: EventTopic,
    ) -> Result<Option<StagingSummary>, sqlx::Error> {
        let Some(order) = self
            .repo
            .find_wholesale_order_by_external_id(&event.id)
            .await?
        else {
            return Ok(None);
        };

        let tx_type = match topic {
            EventTopic::OrdersPaid => InventoryTransactionType::WholesaleOrdered,
            EventTopic::OrdersFulfilled => InventoryTransactionType::WholesaleIncoming,
        };
        let reference = format!("order:{}", event.id);

        let already_staged = self
            .repo
            .has_inventory_transaction(&reference, InventoryTransactionType::WholesaleOrdered)
            .await?
            || self
                .repo
                .has_inventory_transaction(&reference, InventoryTransactionType::WholesaleIncoming)
                .await?;

        // Expand event lines through the product match; fall back to the
        // stored order items when the payload carries no line items.
        let mut lines: Vec<(String, i64)> = Vec::new();
        if !already_staged {
            for line in &event.line_items {
                match self.match_line(brand.id, line).await? {
                    Some(mapping) => {
                        lines.push((mapping.retail_sku, line.quantity * mapping.units_per_box))
                    }
                    None => debug!(sku = ?line.sku, "Order line has no wholesale mapping, skipping"),
                }
            }
            if lines.is_empty() {
                let items = self.repo.get_wholesale_order_items(order.id).await?;
                lines = items
                    .into_iter()
                    .map(|item| (item.retail_sku, item.expected_units))
                    .collect();
            }
        } else {
            debug!(
                order_id = order.id,
                "Wholesale staging already recorded, only advancing status"
            );
        }

        let mut tx = self.repo.pool().begin().await?;
        let mut units_staged = 0;
        for (retail_sku, units) in &lines {
            Repository::stage_incoming_on(&mut tx, order.store_id, retail_sku, *units, tx_type, &reference)
                .await?;
            units_staged += units;
        }

        match topic {
            EventTopic::OrdersPaid => {
                // The order may already be submitted locally; the guard
                // makes this a no-op in that case.
                Repository::advance_wholesale_status_on(
                    &mut tx,
                    order.id,
                    WholesaleStatus::Pending,
                    WholesaleStatus::Submitted,
                )
                .await?;
            }
            EventTopic::OrdersFulfilled => {
                let advanced = Repository::advance_wholesale_status_on(
                    &mut tx,
                    order.id,
                    WholesaleStatus::Submitted,
                    WholesaleStatus::Delivered,
                )
                .await?;
                if !advanced {
                    warn!(
                        order_id = order.id,
                        status = order.status.as_str(),
                        "Fulfillment event for order not in submitted state"
                    );
                }
            }
        }

        tx.commit().await?;

        if !already_staged {
            info!(
                order_id = order.id,
                tx_type = tx_type.as_str(),
                units = units_staged,
                "Staged wholesale units"
            );
        }

        Ok(Some(StagingSummary {
            order_id: order.id,
            tx_type,
            lines_staged: lines.len(),
            units_staged,
            already_staged,
        }))
    }

    /// Reconcile a store's confirmed receipt against a delivered order.
    ///
    /// Moves what was actually received from incoming to on-hand, records
    /// per-item discrepancies and free-text notes, and marks the order
    /// verified. Verification is terminal and idempotent-rejecting:
    /// re-verifying fails with `AlreadyVerified`.
    pub async fn verify_receipt(
        &self,
        order_id: i64,
        receipts: &[ReceiptLine],
        notes: Option<&str>,
    ) -> Result<VerificationResult, InventoryError> {
        let order = self
            .repo
            .get_wholesale_order(order_id)
            .await?
            .ok_or(InventoryError::OrderNotFound(order_id))?;

        match order.status {
            WholesaleStatus::Delivered => {}
            WholesaleStatus::Verified => return Err(InventoryError::AlreadyVerified(order_id)),
            status => return Err(InventoryError::InvalidTransition { order_id, status }),
        }

        let items = self.repo.get_wholesale_order_items(order_id).await?;
        let mut received_by_item: HashMap<i64, i64> = HashMap::new();
        for receipt in receipts {
            if !items.iter().any(|item| item.id == receipt.item_id) {
                return Err(InventoryError::UnknownItem {
                    order_id,
                    item_id: receipt.item_id,
                });
            }
            received_by_item.insert(receipt.item_id, receipt.received_units.max(0));
        }

        let reference = format!("wholesale:{}", order_id);
        let mut tx = self.repo.pool().begin().await?;

        // Guarded flip first: a racing verification loses here.
        let verified =
            Repository::record_verification_on(&mut tx, order_id, notes, TimeMs::now()).await?;
        if !verified {
            return Err(InventoryError::AlreadyVerified(order_id));
        }

        let mut received_total = 0;
        let mut discrepancy_total = 0;
        for item in &items {
            let received = received_by_item.get(&item.id).copied().unwrap_or(0);
            let discrepancy = item.expected_units - received;
            Repository::record_item_receipt_on(&mut tx, item.id, received, discrepancy).await?;
            if received > 0 {
                Repository::receive_units_on(
                    &mut tx,
                    order.store_id,
                    &item.retail_sku,
                    received,
                    &reference,
                    notes,
                )
                .await?;
            }
            received_total += received;
            discrepancy_total += discrepancy;
        }

        tx.commit().await?;

        info!(
            order_id,
            received = received_total,
            discrepancy = discrepancy_total,
            "Wholesale order verified"
        );

        Ok(VerificationResult {
            order_id,
            received_units: received_total,
            total_discrepancy: discrepancy_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::db::repo::{NewProductMapping, NewWholesaleItem, NewWholesaleOrder};
    use crate::domain::Money;
    use std::str::FromStr;
    use tempfile::TempDir;

    struct Fixture {
        repo: Arc<Repository>,
        brand: Brand,
        store_id: i64,
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

        repo.insert_product_mapping(&NewProductMapping {
            brand_id: brand.id,
            wholesale_sku: "GRN-TEA-CS".to_string(),
            retail_sku: "GRN-TEA".to_string(),
            external_product_id: Some("632910392".to_string()),
            external_variant_id: Some("808950810".to_string()),
            units_per_box: 6,
        })
        .await
        .unwrap();

        Fixture {
            repo,
            brand,
            store_id: store.id,
            _temp: temp_dir,
        }
    }

    async fn seed_submitted_order(f: &Fixture, external_order_id: &str) -> i64 {
        let order = f
            .repo
            .insert_wholesale_order(&NewWholesaleOrder {
                store_id: f.store_id,
                brand_id: f.brand.id,
                subtotal: Money::from_str("108").unwrap(),
                items: vec![NewWholesaleItem {
                    wholesale_sku: "GRN-TEA-CS".to_string(),
                    retail_sku: "GRN-TEA".to_string(),
                    units_per_box: 6,
                    boxes: 2,
                    unit_price: Money::from_str("54").unwrap(),
                }],
            })
            .await
            .unwrap();

        let mut tx = f.repo.pool().begin().await.unwrap();
        Repository::record_wholesale_submission_on(
            &mut tx,
            order.id,
            external_order_id,
            Money::zero(),
            order.subtotal,
        )
        .await
        .unwrap();
        Repository::advance_wholesale_status_on(
            &mut tx,
            order.id,
            WholesaleStatus::Pending,
            WholesaleStatus::Submitted,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        order.id
    }

    fn paid_event(external_order_id: &str) -> OrderEvent {
        serde_json::from_value(serde_json::json!({
            "id": external_order_id,
            "total_price": "108.00",
            "line_items": [
                {"variant_id": "808950810", "sku": "GRN-TEA-CS", "quantity": 2, "price": "54.00"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_match_line_precedence() {
        let f = setup().await;
        let stager = InventoryStager::new(f.repo.clone());

        // Variant id wins even with a bogus SKU.
        let by_variant = LineItem {
            variant_id: Some("808950810".to_string()),
            sku: Some("UNKNOWN".to_string()),
            ..Default::default()
        };
        assert!(stager
            .match_line(f.brand.id, &by_variant)
            .await
            .unwrap()
            .is_some());

        let by_product = LineItem {
            product_id: Some("632910392".to_string()),
            ..Default::default()
        };
        assert!(stager
            .match_line(f.brand.id, &by_product)
            .await
            .unwrap()
            .is_some());

        let by_suffix = LineItem {
            sku: Some("GRN-TEA-CS".to_string()),
            ..Default::default()
        };
        assert!(stager
            .match_line(f.brand.id, &by_suffix)
            .await
            .unwrap()
            .is_some());

        let no_match = LineItem {
            sku: Some("OTHER-SKU".to_string()),
            ..Default::default()
        };
        assert!(stager
            .match_line(f.brand.id, &no_match)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_staging_two_boxes_increments_incoming_by_twelve() {
        let f = setup().await;
        let order_id = seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());

        let summary = stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersPaid)
            .await
            .unwrap()
            .expect("order not staged");
        assert_eq!(summary.order_id, order_id);
        assert_eq!(summary.units_staged, 12);
        assert!(!summary.already_staged);

        let inv = f
            .repo
            .get_inventory(f.store_id, "GRN-TEA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.quantity_incoming, 12);
    }

    #[tokio::test]
    async fn test_second_staging_pass_is_noop() {
        let f = setup().await;
        seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());

        stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersPaid)
            .await
            .unwrap();
        let second = stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersPaid)
            .await
            .unwrap()
            .unwrap();
        assert!(second.already_staged);

        let inv = f
            .repo
            .get_inventory(f.store_id, "GRN-TEA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.quantity_incoming, 12);

        // The fulfillment event does not stage a second time either; it
        // only advances delivery.
        let fulfilled = stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersFulfilled)
            .await
            .unwrap()
            .unwrap();
        assert!(fulfilled.already_staged);

        let inv = f
            .repo
            .get_inventory(f.store_id, "GRN-TEA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.quantity_incoming, 12);

        let order = f
            .repo
            .get_wholesale_order(fulfilled.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, WholesaleStatus::Delivered);
    }

    #[tokio::test]
    async fn test_fulfilled_before_paid_stages_as_incoming() {
        let f = setup().await;
        seed_submitted_order(&f, "ext-9").await;
        let stager = InventoryStager::new(f.repo.clone());

        // Reordered delivery: the fulfillment event arrives first and
        // performs the one staging pass, typed wholesale_incoming.
        let summary = stager
            .stage_order(&f.brand, &paid_event("ext-9"), EventTopic::OrdersFulfilled)
            .await
            .unwrap()
            .unwrap();
        assert!(!summary.already_staged);
        assert_eq!(summary.tx_type, InventoryTransactionType::WholesaleIncoming);

        let late_paid = stager
            .stage_order(&f.brand, &paid_event("ext-9"), EventTopic::OrdersPaid)
            .await
            .unwrap()
            .unwrap();
        assert!(late_paid.already_staged);

        let inv = f
            .repo
            .get_inventory(f.store_id, "GRN-TEA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.quantity_incoming, 12);
    }

    #[tokio::test]
    async fn test_unlinked_order_is_ignored() {
        let f = setup().await;
        let stager = InventoryStager::new(f.repo.clone());

        let summary = stager
            .stage_order(&f.brand, &paid_event("ext-unknown"), EventTopic::OrdersPaid)
            .await
            .unwrap();
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn test_two_phase_reconciliation_with_discrepancy() {
        let f = setup().await;
        let order_id = seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());

        stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersPaid)
            .await
            .unwrap();
        stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersFulfilled)
            .await
            .unwrap();

        let items = f.repo.get_wholesale_order_items(order_id).await.unwrap();
        let result = stager
            .verify_receipt(
                order_id,
                &[ReceiptLine {
                    item_id: items[0].id,
                    received_units: 10,
                }],
                Some("2 units short"),
            )
            .await
            .unwrap();
        assert_eq!(result.received_units, 10);
        assert_eq!(result.total_discrepancy, 2);

        let inv = f
            .repo
            .get_inventory(f.store_id, "GRN-TEA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.quantity_on_hand, 10);
        // Receipt moved 10 of the 12 staged units; the 2 missing units
        // stay visible as incoming with the discrepancy recorded.
        assert_eq!(inv.quantity_incoming, 2);

        let items = f.repo.get_wholesale_order_items(order_id).await.unwrap();
        assert_eq!(items[0].received_units, Some(10));
        assert_eq!(items[0].discrepancy, Some(2));

        let order = f.repo.get_wholesale_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, WholesaleStatus::Verified);
        assert_eq!(order.discrepancy_notes.as_deref(), Some("2 units short"));
    }

    #[tokio::test]
    async fn test_reverification_rejected() {
        let f = setup().await;
        let order_id = seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());

        stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersFulfilled)
            .await
            .unwrap();
        let items = f.repo.get_wholesale_order_items(order_id).await.unwrap();
        let receipts = [ReceiptLine {
            item_id: items[0].id,
            received_units: 12,
        }];

        stager.verify_receipt(order_id, &receipts, None).await.unwrap();

        let err = stager
            .verify_receipt(order_id, &receipts, None)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyVerified(id) if id == order_id));
    }

    #[tokio::test]
    async fn test_verify_requires_delivered() {
        let f = setup().await;
        let order_id = seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());

        // Submitted but not delivered.
        let err = stager.verify_receipt(order_id, &[], None).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InvalidTransition {
                status: WholesaleStatus::Submitted,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_item() {
        let f = setup().await;
        let order_id = seed_submitted_order(&f, "ext-1").await;
        let stager = InventoryStager::new(f.repo.clone());
        stager
            .stage_order(&f.brand, &paid_event("ext-1"), EventTopic::OrdersFulfilled)
            .await
            .unwrap();

        let err = stager
            .verify_receipt(
                order_id,
                &[ReceiptLine {
                    item_id: 9_999,
                    received_units: 1,
                }],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::UnknownItem { .. }));
    }
}
