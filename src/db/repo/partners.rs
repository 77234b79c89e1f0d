//! Brand, store and partnership operations, including credit posting.

use super::{money_column, money_column_opt, Repository};
use crate::domain::{
    Brand, BrandPartnership, CreditPosting, CreditTransaction, CreditTransactionType, Money,
    PostedCredit, Store, TimeMs,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::warn;

fn brand_from_row(row: &SqliteRow) -> Brand {
    Brand {
        id: row.get("id"),
        name: row.get("name"),
        shop_domain: row.get("shop_domain"),
        webhook_secret: row.get("webhook_secret"),
        attribution_window_days: row.get("attribution_window_days"),
        rate_online: money_column(row, "rate_online"),
        rate_promo: money_column(row, "rate_promo"),
        rate_subscription: money_column(row, "rate_subscription"),
    }
}

fn partnership_from_row(row: &SqliteRow) -> BrandPartnership {
    BrandPartnership {
        id: row.get("id"),
        store_id: row.get("store_id"),
        brand_id: row.get("brand_id"),
        credit_balance: money_column(row, "credit_balance"),
        rate_online: money_column_opt(row, "rate_online"),
        rate_promo: money_column_opt(row, "rate_promo"),
        rate_subscription: money_column_opt(row, "rate_subscription"),
    }
}

fn credit_tx_from_row(row: &SqliteRow) -> CreditTransaction {
    let tx_type_str: String = row.get("tx_type");
    let tx_type = CreditTransactionType::parse(&tx_type_str).unwrap_or_else(|| {
        warn!(tx_type = %tx_type_str, "Unknown credit transaction type, reading as earned");
        CreditTransactionType::Earned
    });

    CreditTransaction {
        id: row.get("id"),
        partnership_id: row.get("partnership_id"),
        amount: money_column(row, "amount"),
        tx_type,
        reason: row.get("reason"),
        balance_after: money_column(row, "balance_after"),
        conversion_id: row.get("conversion_id"),
        wholesale_order_id: row.get("wholesale_order_id"),
        created_at: TimeMs::new(row.get("created_at")),
    }
}

impl Repository {
    // =========================================================================
    // Brand operations
    // =========================================================================

    /// Insert a brand and return it with its assigned id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_brand(
        &self,
        name: &str,
        shop_domain: &str,
        webhook_secret: &str,
        attribution_window_days: i64,
        rate_online: Money,
        rate_promo: Money,
        rate_subscription: Money,
    ) -> Result<Brand, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO brands (
                name, shop_domain, webhook_secret, attribution_window_days,
                rate_online, rate_promo, rate_subscription
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(shop_domain)
        .bind(webhook_secret)
        .bind(attribution_window_days)
        .bind(rate_online.to_canonical_string())
        .bind(rate_promo.to_canonical_string())
        .bind(rate_subscription.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(Brand {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            shop_domain: shop_domain.to_string(),
            webhook_secret: webhook_secret.to_string(),
            attribution_window_days,
            rate_online,
            rate_promo,
            rate_subscription,
        })
    }

    /// Look up a brand by its e-commerce shop domain.
    pub async fn find_brand_by_domain(
        &self,
        shop_domain: &str,
    ) -> Result<Option<Brand>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM brands WHERE shop_domain = ?")
            .bind(shop_domain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(brand_from_row))
    }

    /// Look up a brand by id.
    pub async fn get_brand(&self, brand_id: i64) -> Result<Option<Brand>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM brands WHERE id = ?")
            .bind(brand_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(brand_from_row))
    }

    // =========================================================================
    // Store operations
    // =========================================================================

    /// Insert a store and return it with its assigned id.
    pub async fn insert_store(&self, name: &str, store_code: &str) -> Result<Store, sqlx::Error> {
        let result = sqlx::query("INSERT INTO stores (name, store_code) VALUES (?, ?)")
            .bind(name)
            .bind(store_code)
            .execute(&self.pool)
            .await?;

        Ok(Store {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            store_code: store_code.to_string(),
        })
    }

    /// Look up a store by its short code (as embedded in customer tags).
    pub async fn find_store_by_code(&self, store_code: &str) -> Result<Option<Store>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, store_code FROM stores WHERE store_code = ?")
            .bind(store_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Store {
            id: r.get("id"),
            name: r.get("name"),
            store_code: r.get("store_code"),
        }))
    }

    // =========================================================================
    // Partnership operations
    // =========================================================================

    /// Insert a partnership linking a store and a brand.
    pub async fn insert_partnership(
        &self,
        store_id: i64,
        brand_id: i64,
    ) -> Result<BrandPartnership, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO brand_partnerships (store_id, brand_id) VALUES (?, ?)")
                .bind(store_id)
                .bind(brand_id)
                .execute(&self.pool)
                .await?;

        Ok(BrandPartnership {
            id: result.last_insert_rowid(),
            store_id,
            brand_id,
            credit_balance: Money::zero(),
            rate_online: None,
            rate_promo: None,
            rate_subscription: None,
        })
    }

    /// Look up a partnership by id.
    pub async fn get_partnership(
        &self,
        partnership_id: i64,
    ) -> Result<Option<BrandPartnership>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM brand_partnerships WHERE id = ?")
            .bind(partnership_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(partnership_from_row))
    }

    /// Look up the partnership between a store and a brand.
    pub async fn find_partnership(
        &self,
        store_id: i64,
        brand_id: i64,
    ) -> Result<Option<BrandPartnership>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM brand_partnerships WHERE store_id = ? AND brand_id = ?")
            .bind(store_id)
            .bind(brand_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(partnership_from_row))
    }

    /// Set a per-partnership commission rate override.
    pub async fn set_partnership_rate_online(
        &self,
        partnership_id: i64,
        rate: Option<Money>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE brand_partnerships SET rate_online = ? WHERE id = ?")
            .bind(rate.map(|r| r.to_canonical_string()))
            .bind(partnership_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Credit ledger operations
    // =========================================================================

    /// Apply a signed posting to a partnership balance inside an open
    /// transaction.
    ///
    /// Reads the balance, clamps deductions to what is available, writes
    /// the new balance back and appends the ledger entry with the balance
    /// snapshot — all on the caller's connection so the whole unit commits
    /// or rolls back together.
    ///
    /// # Errors
    /// Returns `RowNotFound` if the partnership does not exist.
    pub(crate) async fn post_credit_on(
        conn: &mut SqliteConnection,
        posting: &CreditPosting,
    ) -> Result<PostedCredit, sqlx::Error> {
        // Touch the row before reading: the transaction's first statement
        // must be a write so concurrent posters queue on the write lock
        // instead of failing the later snapshot upgrade.
        let touched = sqlx::query(
            "UPDATE brand_partnerships SET credit_balance = credit_balance WHERE id = ?",
        )
        .bind(posting.partnership_id)
        .execute(&mut *conn)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        let row = sqlx::query("SELECT credit_balance FROM brand_partnerships WHERE id = ?")
            .bind(posting.partnership_id)
            .fetch_one(&mut *conn)
            .await?;
        let balance = money_column(&row, "credit_balance");

        let applied = if posting.amount.is_negative() {
            let available = if balance.is_negative() {
                Money::zero()
            } else {
                balance
            };
            -posting.amount.abs().min(available)
        } else {
            posting.amount
        };

        let balance_after = balance + applied;

        sqlx::query("UPDATE brand_partnerships SET credit_balance = ? WHERE id = ?")
            .bind(balance_after.to_canonical_string())
            .bind(posting.partnership_id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO credit_transactions (
                partnership_id, amount, tx_type, reason, balance_after,
                conversion_id, wholesale_order_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(posting.partnership_id)
        .bind(applied.to_canonical_string())
        .bind(posting.tx_type().as_str())
        .bind(&posting.reason)
        .bind(balance_after.to_canonical_string())
        .bind(posting.conversion_id)
        .bind(posting.wholesale_order_id)
        .bind(TimeMs::now().as_ms())
        .execute(&mut *conn)
        .await?;

        Ok(PostedCredit {
            transaction_id: result.last_insert_rowid(),
            applied,
            balance_after,
        })
    }

    /// Apply a signed posting as its own transaction.
    ///
    /// # Errors
    /// Returns an error if the partnership is missing or the write fails.
    pub async fn post_credit(&self, posting: &CreditPosting) -> Result<PostedCredit, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let posted = Self::post_credit_on(&mut tx, posting).await?;
        tx.commit().await?;
        Ok(posted)
    }

    /// List a partnership's ledger entries, oldest first.
    pub async fn list_credit_transactions(
        &self,
        partnership_id: i64,
    ) -> Result<Vec<CreditTransaction>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, partnership_id, amount, tx_type, reason, balance_after,
                   conversion_id, wholesale_order_id, created_at
            FROM credit_transactions
            WHERE partnership_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(partnership_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(credit_tx_from_row).collect())
    }

    /// Sum a partnership's ledger entries in Rust.
    ///
    /// Used to verify the balance invariant; the hot path reads the
    /// derived `credit_balance` column instead.
    pub async fn sum_credit_transactions(
        &self,
        partnership_id: i64,
    ) -> Result<Money, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT amount FROM credit_transactions WHERE partnership_id = ? ORDER BY id ASC",
        )
        .bind(partnership_id)
        .fetch_all(&self.pool)
        .await?;

        let mut sum = Money::zero();
        for row in rows {
            sum = sum + money_column(&row, "amount");
        }

        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    async fn seed_partnership(repo: &Repository) -> BrandPartnership {
        let brand = repo
            .insert_brand(
                "Acme",
                "acme.example.com",
                "secret",
                30,
                Money::from_str("10").unwrap(),
                Money::from_str("15").unwrap(),
                Money::from_str("5").unwrap(),
            )
            .await
            .unwrap();
        let store = repo.insert_store("Downtown", "DT-01").await.unwrap();
        repo.insert_partnership(store.id, brand.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_brand_by_domain() {
        let (repo, _temp) = setup_test_db().await;
        seed_partnership(&repo).await;

        let brand = repo
            .find_brand_by_domain("acme.example.com")
            .await
            .unwrap()
            .expect("brand missing");
        assert_eq!(brand.name, "Acme");
        assert_eq!(brand.attribution_window_days, 30);

        assert!(repo
            .find_brand_by_domain("unknown.example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_post_credit_earn_and_snapshot() {
        let (repo, _temp) = setup_test_db().await;
        let partnership = seed_partnership(&repo).await;

        let posted = repo
            .post_credit(&CreditPosting::earned(
                partnership.id,
                Money::from_str("13.33").unwrap(),
                "commission",
            ))
            .await
            .unwrap();

        assert_eq!(posted.applied, Money::from_str("13.33").unwrap());
        assert_eq!(posted.balance_after, Money::from_str("13.33").unwrap());

        let txs = repo.list_credit_transactions(partnership.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, CreditTransactionType::Earned);
        assert_eq!(txs[0].balance_after, Money::from_str("13.33").unwrap());
    }

    #[tokio::test]
    async fn test_post_credit_clamps_deduction() {
        let (repo, _temp) = setup_test_db().await;
        let partnership = seed_partnership(&repo).await;

        repo.post_credit(&CreditPosting::earned(
            partnership.id,
            Money::from_str("12").unwrap(),
            "commission",
        ))
        .await
        .unwrap();

        let posted = repo
            .post_credit(&CreditPosting::deducted(
                partnership.id,
                Money::from_str("20").unwrap(),
                "wholesale redemption",
            ))
            .await
            .unwrap();

        // Applied is the clamped amount, not the requested one.
        assert_eq!(posted.applied, Money::from_str("-12").unwrap());
        assert_eq!(posted.balance_after, Money::zero());

        let txs = repo.list_credit_transactions(partnership.id).await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].amount, Money::from_str("-12").unwrap());
    }

    #[tokio::test]
    async fn test_balance_equals_transaction_sum() {
        let (repo, _temp) = setup_test_db().await;
        let partnership = seed_partnership(&repo).await;

        for amount in ["10", "2.50", "-4", "0.75"] {
            let posting = if amount.starts_with('-') {
                CreditPosting::deducted(
                    partnership.id,
                    Money::from_str(&amount[1..]).unwrap(),
                    "deduction",
                )
            } else {
                CreditPosting::earned(partnership.id, Money::from_str(amount).unwrap(), "earn")
            };
            repo.post_credit(&posting).await.unwrap();
        }

        let balance = repo
            .get_partnership(partnership.id)
            .await
            .unwrap()
            .unwrap()
            .credit_balance;
        let sum = repo.sum_credit_transactions(partnership.id).await.unwrap();
        assert_eq!(balance, sum);
        assert_eq!(balance, Money::from_str("9.25").unwrap());
    }

    #[tokio::test]
    async fn test_post_credit_missing_partnership() {
        let (repo, _temp) = setup_test_db().await;
        let result = repo
            .post_credit(&CreditPosting::earned(
                999,
                Money::from_str("1").unwrap(),
                "commission",
            ))
            .await;
        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
    }
}
