//! Sample history operations.

use super::Repository;
use crate::domain::{SampleHistory, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Fields for appending a sample history record.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub customer_id: i64,
    pub brand_id: i64,
    pub store_id: i64,
    pub display_id: Option<i64>,
    pub sampled_at: TimeMs,
    pub attribution_window_days: i64,
}

fn sample_from_row(row: &SqliteRow) -> SampleHistory {
    SampleHistory {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        brand_id: row.get("brand_id"),
        store_id: row.get("store_id"),
        display_id: row.get("display_id"),
        sampled_at: TimeMs::new(row.get("sampled_at")),
        attribution_window_days: row.get("attribution_window_days"),
        expires_at: TimeMs::new(row.get("expires_at")),
    }
}

impl Repository {
    /// Append an immutable sample history record.
    ///
    /// The expiry is computed here from the sample time and window so it
    /// is fixed at write time.
    pub async fn insert_sample(&self, new: &NewSample) -> Result<SampleHistory, sqlx::Error> {
        let expires_at =
            SampleHistory::compute_expires_at(new.sampled_at, new.attribution_window_days);

        let result = sqlx::query(
            r#"
            INSERT INTO sample_history (
                customer_id, brand_id, store_id, display_id,
                sampled_at, attribution_window_days, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.customer_id)
        .bind(new.brand_id)
        .bind(new.store_id)
        .bind(new.display_id)
        .bind(new.sampled_at.as_ms())
        .bind(new.attribution_window_days)
        .bind(expires_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(SampleHistory {
            id: result.last_insert_rowid(),
            customer_id: new.customer_id,
            brand_id: new.brand_id,
            store_id: new.store_id,
            display_id: new.display_id,
            sampled_at: new.sampled_at,
            attribution_window_days: new.attribution_window_days,
            expires_at,
        })
    }

    /// The customer's most recent sample for a brand, if any.
    pub async fn latest_sample(
        &self,
        customer_id: i64,
        brand_id: i64,
    ) -> Result<Option<SampleHistory>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, brand_id, store_id, display_id,
                   sampled_at, attribution_window_days, expires_at
            FROM sample_history
            WHERE customer_id = ? AND brand_id = ?
            ORDER BY sampled_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(brand_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(sample_from_row))
    }

    /// All samples for a customer, oldest first.
    pub async fn list_samples(&self, customer_id: i64) -> Result<Vec<SampleHistory>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, brand_id, store_id, display_id,
                   sampled_at, attribution_window_days, expires_at
            FROM sample_history
            WHERE customer_id = ?
            ORDER BY sampled_at ASC, id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(sample_from_row).collect())
    }
}
