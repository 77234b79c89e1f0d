//! Inventory counters, the inventory transaction log and product mappings.

use super::Repository;
use crate::domain::{
    InventoryTransaction, InventoryTransactionType, ProductMapping, StoreInventory, TimeMs,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::warn;

/// Fields for registering a wholesale-to-retail product mapping.
#[derive(Debug, Clone)]
pub struct NewProductMapping {
    pub brand_id: i64,
    pub wholesale_sku: String,
    pub retail_sku: String,
    pub external_product_id: Option<String>,
    pub external_variant_id: Option<String>,
    pub units_per_box: i64,
}

fn inventory_from_row(row: &SqliteRow) -> StoreInventory {
    StoreInventory {
        id: row.get("id"),
        store_id: row.get("store_id"),
        sku: row.get("sku"),
        quantity_on_hand: row.get("quantity_on_hand"),
        quantity_reserved: row.get("quantity_reserved"),
        quantity_available: row.get("quantity_available"),
        quantity_incoming: row.get("quantity_incoming"),
    }
}

fn inventory_tx_from_row(row: &SqliteRow) -> InventoryTransaction {
    let tx_type_str: String = row.get("tx_type");
    let tx_type = InventoryTransactionType::parse(&tx_type_str).unwrap_or_else(|| {
        warn!(tx_type = %tx_type_str, "Unknown inventory transaction type, reading as adjustment");
        InventoryTransactionType::Adjustment
    });

    InventoryTransaction {
        id: row.get("id"),
        store_id: row.get("store_id"),
        sku: row.get("sku"),
        tx_type,
        quantity: row.get("quantity"),
        balance_after: row.get("balance_after"),
        reference: row.get("reference"),
        note: row.get("note"),
        created_at: TimeMs::new(row.get("created_at")),
    }
}

fn mapping_from_row(row: &SqliteRow) -> ProductMapping {
    ProductMapping {
        id: row.get("id"),
        brand_id: row.get("brand_id"),
        wholesale_sku: row.get("wholesale_sku"),
        retail_sku: row.get("retail_sku"),
        external_product_id: row.get("external_product_id"),
        external_variant_id: row.get("external_variant_id"),
        units_per_box: row.get("units_per_box"),
    }
}

/// Ensure a store_inventory row exists for (store, SKU).
async fn ensure_inventory_row(
    conn: &mut SqliteConnection,
    store_id: i64,
    sku: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO store_inventory (store_id, sku) VALUES (?, ?)")
        .bind(store_id)
        .bind(sku)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn append_inventory_tx(
    conn: &mut SqliteConnection,
    store_id: i64,
    sku: &str,
    tx_type: InventoryTransactionType,
    quantity: i64,
    balance_after: i64,
    reference: Option<&str>,
    note: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            store_id, sku, tx_type, quantity, balance_after, reference, note, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(store_id)
    .bind(sku)
    .bind(tx_type.as_str())
    .bind(quantity)
    .bind(balance_after)
    .bind(reference)
    .bind(note)
    .bind(TimeMs::now().as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

impl Repository {
    // =========================================================================
    // Counter mutations (transaction-scoped)
    // =========================================================================

    /// Stage wholesale units as incoming inside an open transaction.
    ///
    /// Logs a transaction whose balance snapshot is the resulting
    /// incoming count.
    pub(crate) async fn stage_incoming_on(
        conn: &mut SqliteConnection,
        store_id: i64,
        sku: &str,
        units: i64,
        tx_type: InventoryTransactionType,
        reference: &str,
    ) -> Result<i64, sqlx::Error> {
        ensure_inventory_row(&mut *conn, store_id, sku).await?;

        sqlx::query(
            "UPDATE store_inventory SET quantity_incoming = quantity_incoming + ? \
             WHERE store_id = ? AND sku = ?",
        )
        .bind(units)
        .bind(store_id)
        .bind(sku)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query(
            "SELECT quantity_incoming FROM store_inventory WHERE store_id = ? AND sku = ?",
        )
        .bind(store_id)
        .bind(sku)
        .fetch_one(&mut *conn)
        .await?;
        let incoming: i64 = row.get("quantity_incoming");

        append_inventory_tx(
            &mut *conn,
            store_id,
            sku,
            tx_type,
            units,
            incoming,
            Some(reference),
            None,
        )
        .await?;

        Ok(incoming)
    }

    /// Move confirmed-received units from incoming to on-hand inside an
    /// open transaction.
    ///
    /// Only what was physically confirmed moves; the balance snapshot is
    /// the resulting on-hand count.
    pub(crate) async fn receive_units_on(
        conn: &mut SqliteConnection,
        store_id: i64,
        sku: &str,
        received: i64,
        reference: &str,
        note: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        ensure_inventory_row(&mut *conn, store_id, sku).await?;

        sqlx::query(
            r#"
            UPDATE store_inventory SET
                quantity_incoming = quantity_incoming - ?,
                quantity_on_hand = quantity_on_hand + ?,
                quantity_available = quantity_available + ?
            WHERE store_id = ? AND sku = ?
            "#,
        )
        .bind(received)
        .bind(received)
        .bind(received)
        .bind(store_id)
        .bind(sku)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query(
            "SELECT quantity_on_hand FROM store_inventory WHERE store_id = ? AND sku = ?",
        )
        .bind(store_id)
        .bind(sku)
        .fetch_one(&mut *conn)
        .await?;
        let on_hand: i64 = row.get("quantity_on_hand");

        append_inventory_tx(
            &mut *conn,
            store_id,
            sku,
            InventoryTransactionType::Received,
            received,
            on_hand,
            Some(reference),
            note,
        )
        .await?;

        Ok(on_hand)
    }

    /// Decrement on-hand for a retail sale, as one transaction.
    pub async fn record_sale(
        &self,
        store_id: i64,
        sku: &str,
        quantity: i64,
        reference: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        ensure_inventory_row(&mut tx, store_id, sku).await?;

        sqlx::query(
            r#"
            UPDATE store_inventory SET
                quantity_on_hand = quantity_on_hand - ?,
                quantity_available = quantity_available - ?
            WHERE store_id = ? AND sku = ?
            "#,
        )
        .bind(quantity)
        .bind(quantity)
        .bind(store_id)
        .bind(sku)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            "SELECT quantity_on_hand FROM store_inventory WHERE store_id = ? AND sku = ?",
        )
        .bind(store_id)
        .bind(sku)
        .fetch_one(&mut *tx)
        .await?;
        let on_hand: i64 = row.get("quantity_on_hand");

        append_inventory_tx(
            &mut tx,
            store_id,
            sku,
            InventoryTransactionType::Sale,
            -quantity,
            on_hand,
            reference,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(on_hand)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Counters for one (store, SKU).
    pub async fn get_inventory(
        &self,
        store_id: i64,
        sku: &str,
    ) -> Result<Option<StoreInventory>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM store_inventory WHERE store_id = ? AND sku = ?")
            .bind(store_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(inventory_from_row))
    }

    /// All inventory rows for a store.
    pub async fn list_inventory(&self, store_id: i64) -> Result<Vec<StoreInventory>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM store_inventory WHERE store_id = ? ORDER BY sku ASC")
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(inventory_from_row).collect())
    }

    /// True if a transaction with this reference and type was already
    /// logged — the defensive check against double staging.
    pub async fn has_inventory_transaction(
        &self,
        reference: &str,
        tx_type: InventoryTransactionType,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM inventory_transactions WHERE reference = ? AND tx_type = ?",
        )
        .bind(reference)
        .bind(tx_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Transaction log for one (store, SKU), oldest first.
    pub async fn list_inventory_transactions(
        &self,
        store_id: i64,
        sku: &str,
    ) -> Result<Vec<InventoryTransaction>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM inventory_transactions WHERE store_id = ? AND sku = ? ORDER BY id ASC",
        )
        .bind(store_id)
        .bind(sku)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(inventory_tx_from_row).collect())
    }

    // =========================================================================
    // Product mappings
    // =========================================================================

    /// Register a wholesale-to-retail product mapping.
    pub async fn insert_product_mapping(
        &self,
        new: &NewProductMapping,
    ) -> Result<ProductMapping, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_mappings (
                brand_id, wholesale_sku, retail_sku,
                external_product_id, external_variant_id, units_per_box
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.brand_id)
        .bind(&new.wholesale_sku)
        .bind(&new.retail_sku)
        .bind(new.external_product_id.as_deref())
        .bind(new.external_variant_id.as_deref())
        .bind(new.units_per_box)
        .execute(&self.pool)
        .await?;

        Ok(ProductMapping {
            id: result.last_insert_rowid(),
            brand_id: new.brand_id,
            wholesale_sku: new.wholesale_sku.clone(),
            retail_sku: new.retail_sku.clone(),
            external_product_id: new.external_product_id.clone(),
            external_variant_id: new.external_variant_id.clone(),
            units_per_box: new.units_per_box,
        })
    }

    /// Mapping lookup by external variant id.
    pub async fn find_mapping_by_variant(
        &self,
        brand_id: i64,
        external_variant_id: &str,
    ) -> Result<Option<ProductMapping>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM product_mappings WHERE brand_id = ? AND external_variant_id = ?",
        )
        .bind(brand_id)
        .bind(external_variant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(mapping_from_row))
    }

    /// Mapping lookup by external product id.
    pub async fn find_mapping_by_product(
        &self,
        brand_id: i64,
        external_product_id: &str,
    ) -> Result<Option<ProductMapping>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM product_mappings WHERE brand_id = ? AND external_product_id = ?",
        )
        .bind(brand_id)
        .bind(external_product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(mapping_from_row))
    }

    /// Mapping lookup by retail SKU (used by the suffix-convention match).
    pub async fn find_mapping_by_retail_sku(
        &self,
        brand_id: i64,
        retail_sku: &str,
    ) -> Result<Option<ProductMapping>, sqlx::Error> {
        let row =
            sqlx::query("SELECT * FROM product_mappings WHERE brand_id = ? AND retail_sku = ?")
                .bind(brand_id)
                .bind(retail_sku)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(mapping_from_row))
    }

    /// Mapping lookup by wholesale SKU.
    pub async fn find_mapping_by_wholesale_sku(
        &self,
        brand_id: i64,
        wholesale_sku: &str,
    ) -> Result<Option<ProductMapping>, sqlx::Error> {
        let row =
            sqlx::query("SELECT * FROM product_mappings WHERE brand_id = ? AND wholesale_sku = ?")
                .bind(brand_id)
                .bind(wholesale_sku)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(mapping_from_row))
    }
}
