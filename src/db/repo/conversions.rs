//! Conversion recording and the (brand, external order id) idempotency guard.

use super::{money_column, money_column_opt, Repository};
use crate::domain::{Conversion, CreditPosting, NewConversion, PostedCredit, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Result of attempting to record a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The conversion was recorded (with its credit posting, if any).
    Recorded {
        conversion: Conversion,
        posted: Option<PostedCredit>,
    },
    /// A conversion for this (brand, external order id) already exists.
    Duplicate,
}

fn conversion_from_row(row: &SqliteRow) -> Conversion {
    Conversion {
        id: row.get("id"),
        brand_id: row.get("brand_id"),
        external_order_id: row.get("external_order_id"),
        customer_id: row.get("customer_id"),
        store_id: row.get("store_id"),
        partnership_id: row.get("partnership_id"),
        order_total: money_column(row, "order_total"),
        commission_rate: money_column_opt(row, "commission_rate"),
        commission_amount: money_column_opt(row, "commission_amount"),
        sampled_at: row.get::<Option<i64>, _>("sampled_at").map(TimeMs::new),
        purchased_at: TimeMs::new(row.get("purchased_at")),
        days_to_conversion: row.get("days_to_conversion"),
        attributed: row.get::<i64, _>("attributed") != 0,
        paid: row.get::<i64, _>("paid") != 0,
    }
}

impl Repository {
    /// Look up the conversion for a (brand, external order id) pair.
    pub async fn find_conversion(
        &self,
        brand_id: i64,
        external_order_id: &str,
    ) -> Result<Option<Conversion>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM conversions WHERE brand_id = ? AND external_order_id = ?",
        )
        .bind(brand_id)
        .bind(external_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(conversion_from_row))
    }

    /// Record a conversion and, when attributed, post its commission
    /// credit — all in one transaction.
    ///
    /// The conversion insert uses `ON CONFLICT DO NOTHING` against the
    /// UNIQUE(brand_id, external_order_id) key, so two racing deliveries
    /// of the same order commit at most one conversion and one posting;
    /// the loser sees `Duplicate` and rolls back.
    pub async fn record_conversion(
        &self,
        new: &NewConversion,
        posting: Option<&CreditPosting>,
    ) -> Result<ConversionOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let days_to_conversion = new.days_to_conversion();
        let result = sqlx::query(
            r#"
            INSERT INTO conversions (
                brand_id, external_order_id, customer_id, store_id, partnership_id,
                order_total, commission_rate, commission_amount,
                sampled_at, purchased_at, days_to_conversion, attributed, paid
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(brand_id, external_order_id) DO NOTHING
            "#,
        )
        .bind(new.brand_id)
        .bind(&new.external_order_id)
        .bind(new.customer_id)
        .bind(new.store_id)
        .bind(new.partnership_id)
        .bind(new.order_total.to_canonical_string())
        .bind(new.commission_rate.map(|r| r.to_canonical_string()))
        .bind(new.commission_amount.map(|a| a.to_canonical_string()))
        .bind(new.sampled_at.map(|t| t.as_ms()))
        .bind(new.purchased_at.as_ms())
        .bind(days_to_conversion)
        .bind(new.attributed as i64)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(ConversionOutcome::Duplicate);
        }
        let conversion_id = result.last_insert_rowid();

        let mut paid = false;
        let mut posted = None;
        if let Some(posting) = posting {
            let posting = CreditPosting {
                conversion_id: Some(conversion_id),
                ..posting.clone()
            };
            posted = Some(Self::post_credit_on(&mut tx, &posting).await?);

            sqlx::query("UPDATE conversions SET paid = 1 WHERE id = ?")
                .bind(conversion_id)
                .execute(&mut *tx)
                .await?;
            paid = true;
        }

        tx.commit().await?;

        Ok(ConversionOutcome::Recorded {
            conversion: Conversion {
                id: conversion_id,
                brand_id: new.brand_id,
                external_order_id: new.external_order_id.clone(),
                customer_id: new.customer_id,
                store_id: new.store_id,
                partnership_id: new.partnership_id,
                order_total: new.order_total,
                commission_rate: new.commission_rate,
                commission_amount: new.commission_amount,
                sampled_at: new.sampled_at,
                purchased_at: new.purchased_at,
                days_to_conversion,
                attributed: new.attributed,
                paid,
            },
            posted,
        })
    }

    /// Post the commission credit for an attributed conversion whose
    /// posting never landed, and mark it paid — one transaction.
    ///
    /// The paid flag is flipped with a guarded update first, so a racing
    /// redelivery that already completed the posting results in a no-op.
    pub async fn complete_conversion_credit(
        &self,
        conversion_id: i64,
        posting: &CreditPosting,
    ) -> Result<Option<PostedCredit>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE conversions SET paid = 1 WHERE id = ? AND paid = 0")
            .bind(conversion_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let posting = CreditPosting {
            conversion_id: Some(conversion_id),
            ..posting.clone()
        };
        let posted = Self::post_credit_on(&mut tx, &posting).await?;

        tx.commit().await?;
        Ok(Some(posted))
    }

    /// List conversions for a brand, newest first.
    pub async fn list_conversions(&self, brand_id: i64) -> Result<Vec<Conversion>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM conversions WHERE brand_id = ? ORDER BY id DESC")
            .bind(brand_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(conversion_from_row).collect())
    }
}
