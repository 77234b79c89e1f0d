//! Processed-event audit log.
//!
//! Every webhook delivery writes exactly one row here, whatever the
//! business outcome — this is the core's observability surface.

use super::Repository;
use crate::domain::TimeMs;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Fields for one audit entry.
#[derive(Debug, Clone)]
pub struct NewProcessedEvent {
    pub topic: String,
    pub shop_domain: String,
    pub external_order_id: Option<String>,
    pub customer_id: Option<i64>,
    pub status: String,
    pub reason: String,
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEventRow {
    pub id: i64,
    pub topic: String,
    pub shop_domain: String,
    pub external_order_id: Option<String>,
    pub customer_id: Option<i64>,
    pub status: String,
    pub reason: String,
    pub created_at: TimeMs,
}

fn event_from_row(row: &SqliteRow) -> ProcessedEventRow {
    ProcessedEventRow {
        id: row.get("id"),
        topic: row.get("topic"),
        shop_domain: row.get("shop_domain"),
        external_order_id: row.get("external_order_id"),
        customer_id: row.get("customer_id"),
        status: row.get("status"),
        reason: row.get("reason"),
        created_at: TimeMs::new(row.get("created_at")),
    }
}

impl Repository {
    /// Append an audit entry.
    pub async fn insert_processed_event(
        &self,
        new: &NewProcessedEvent,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (
                topic, shop_domain, external_order_id, customer_id, status, reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.topic)
        .bind(&new.shop_domain)
        .bind(new.external_order_id.as_deref())
        .bind(new.customer_id)
        .bind(&new.status)
        .bind(&new.reason)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Audit entries for one external order id, oldest first.
    pub async fn list_processed_events_for_order(
        &self,
        external_order_id: &str,
    ) -> Result<Vec<ProcessedEventRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM processed_events WHERE external_order_id = ? ORDER BY id ASC",
        )
        .bind(external_order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(event_from_row).collect())
    }
}
