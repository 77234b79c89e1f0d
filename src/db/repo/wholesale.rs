//! Wholesale order persistence and guarded status transitions.

use super::{money_column, Repository};
use crate::domain::{Money, TimeMs, WholesaleOrder, WholesaleOrderItem, WholesaleStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::warn;

/// Fields for one line of a new wholesale order.
#[derive(Debug, Clone)]
pub struct NewWholesaleItem {
    pub wholesale_sku: String,
    pub retail_sku: String,
    pub units_per_box: i64,
    pub boxes: i64,
    pub unit_price: Money,
}

/// Fields for creating a wholesale order in `pending` state.
#[derive(Debug, Clone)]
pub struct NewWholesaleOrder {
    pub store_id: i64,
    pub brand_id: i64,
    pub subtotal: Money,
    pub items: Vec<NewWholesaleItem>,
}

fn order_from_row(row: &SqliteRow) -> WholesaleOrder {
    let status_str: String = row.get("status");
    let status = WholesaleStatus::parse(&status_str).unwrap_or_else(|| {
        warn!(status = %status_str, "Unknown wholesale status, reading as pending");
        WholesaleStatus::Pending
    });

    WholesaleOrder {
        id: row.get("id"),
        store_id: row.get("store_id"),
        brand_id: row.get("brand_id"),
        external_order_id: row.get("external_order_id"),
        subtotal: money_column(row, "subtotal"),
        applied_credit: money_column(row, "applied_credit"),
        total: money_column(row, "total"),
        status,
        discrepancy_notes: row.get("discrepancy_notes"),
        created_at: TimeMs::new(row.get("created_at")),
        verified_at: row.get::<Option<i64>, _>("verified_at").map(TimeMs::new),
    }
}

fn item_from_row(row: &SqliteRow) -> WholesaleOrderItem {
    WholesaleOrderItem {
        id: row.get("id"),
        order_id: row.get("order_id"),
        wholesale_sku: row.get("wholesale_sku"),
        retail_sku: row.get("retail_sku"),
        units_per_box: row.get("units_per_box"),
        boxes: row.get("boxes"),
        expected_units: row.get("expected_units"),
        received_units: row.get("received_units"),
        discrepancy: row.get("discrepancy"),
        unit_price: money_column(row, "unit_price"),
    }
}

impl Repository {
    /// Create a wholesale order with its items, in `pending` state.
    pub async fn insert_wholesale_order(
        &self,
        new: &NewWholesaleOrder,
    ) -> Result<WholesaleOrder, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let created_at = TimeMs::now();

        let result = sqlx::query(
            r#"
            INSERT INTO wholesale_orders (store_id, brand_id, subtotal, total, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(new.store_id)
        .bind(new.brand_id)
        .bind(new.subtotal.to_canonical_string())
        .bind(new.subtotal.to_canonical_string())
        .bind(created_at.as_ms())
        .execute(&mut *tx)
        .await?;
        let order_id = result.last_insert_rowid();

        for item in &new.items {
            sqlx::query(
                r#"
                INSERT INTO wholesale_order_items (
                    order_id, wholesale_sku, retail_sku, units_per_box, boxes,
                    expected_units, unit_price
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(order_id)
            .bind(&item.wholesale_sku)
            .bind(&item.retail_sku)
            .bind(item.units_per_box)
            .bind(item.boxes)
            .bind(item.boxes * item.units_per_box)
            .bind(item.unit_price.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(WholesaleOrder {
            id: order_id,
            store_id: new.store_id,
            brand_id: new.brand_id,
            external_order_id: None,
            subtotal: new.subtotal,
            applied_credit: Money::zero(),
            total: new.subtotal,
            status: WholesaleStatus::Pending,
            discrepancy_notes: None,
            created_at,
            verified_at: None,
        })
    }

    /// Look up a wholesale order by id.
    pub async fn get_wholesale_order(
        &self,
        order_id: i64,
    ) -> Result<Option<WholesaleOrder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM wholesale_orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(order_from_row))
    }

    /// Look up a wholesale order by the external order id linked at
    /// submission.
    pub async fn find_wholesale_order_by_external_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<WholesaleOrder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM wholesale_orders WHERE external_order_id = ?")
            .bind(external_order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(order_from_row))
    }

    /// Items of a wholesale order.
    pub async fn get_wholesale_order_items(
        &self,
        order_id: i64,
    ) -> Result<Vec<WholesaleOrderItem>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT * FROM wholesale_order_items WHERE order_id = ? ORDER BY id ASC")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    /// Advance an order's status inside an open transaction, guarded on
    /// the expected current status.
    ///
    /// Returns false when the order was not in `from` — the transition
    /// has already happened or would skip a state.
    pub(crate) async fn advance_wholesale_status_on(
        conn: &mut SqliteConnection,
        order_id: i64,
        from: WholesaleStatus,
        to: WholesaleStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE wholesale_orders SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(order_id)
            .bind(from.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record submission details inside an open transaction: the external
    /// order id, the applied credit and the cash total.
    pub(crate) async fn record_wholesale_submission_on(
        conn: &mut SqliteConnection,
        order_id: i64,
        external_order_id: &str,
        applied_credit: Money,
        total: Money,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE wholesale_orders
            SET external_order_id = ?, applied_credit = ?, total = ?
            WHERE id = ?
            "#,
        )
        .bind(external_order_id)
        .bind(applied_credit.to_canonical_string())
        .bind(total.to_canonical_string())
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Record the receipt outcome of one item inside an open transaction.
    pub(crate) async fn record_item_receipt_on(
        conn: &mut SqliteConnection,
        item_id: i64,
        received_units: i64,
        discrepancy: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE wholesale_order_items SET received_units = ?, discrepancy = ? WHERE id = ?",
        )
        .bind(received_units)
        .bind(discrepancy)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Mark an order verified inside an open transaction, guarded so an
    /// already-verified order is left untouched.
    pub(crate) async fn record_verification_on(
        conn: &mut SqliteConnection,
        order_id: i64,
        notes: Option<&str>,
        verified_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE wholesale_orders
            SET status = 'verified', discrepancy_notes = ?, verified_at = ?
            WHERE id = ? AND status = 'delivered'
            "#,
        )
        .bind(notes)
        .bind(verified_at.as_ms())
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
