//! Customer lookup and linking operations.

use super::Repository;
use crate::domain::{Customer, LifecycleStage, NewCustomer, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn customer_from_row(row: &SqliteRow) -> Customer {
    let stage: String = row.get("lifecycle_stage");
    Customer {
        id: row.get("id"),
        member_id: row.get("member_id"),
        brand_id: row.get("brand_id"),
        store_id: row.get("store_id"),
        phone: row.get("phone"),
        email: row.get("email"),
        external_customer_id: row.get("external_customer_id"),
        lifecycle_stage: LifecycleStage::parse(&stage),
        last_sampled_at: row
            .get::<Option<i64>, _>("last_sampled_at")
            .map(TimeMs::new),
    }
}

const CUSTOMER_COLUMNS: &str = "id, member_id, brand_id, store_id, phone, email, \
                                external_customer_id, lifecycle_stage, last_sampled_at";

impl Repository {
    /// Insert a customer and return it with its assigned id.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. duplicate member id).
    pub async fn insert_customer(&self, new: &NewCustomer) -> Result<Customer, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (member_id, brand_id, store_id, phone, email)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.member_id)
        .bind(new.brand_id)
        .bind(new.store_id)
        .bind(new.phone.as_deref())
        .bind(new.email.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            member_id: new.member_id.clone(),
            brand_id: new.brand_id,
            store_id: new.store_id,
            phone: new.phone.clone(),
            email: new.email.clone(),
            external_customer_id: None,
            lifecycle_stage: LifecycleStage::Sampled,
            last_sampled_at: None,
        })
    }

    /// Look up a customer by platform member id.
    pub async fn find_customer_by_member_id(
        &self,
        member_id: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE member_id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customer_from_row))
    }

    /// Look up a customer by signup store plus phone-or-email.
    pub async fn find_customer_by_store_and_contact(
        &self,
        store_id: i64,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Customer>, sqlx::Error> {
        if phone.is_none() && email.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM customers
            WHERE store_id = ?
              AND ((phone IS NOT NULL AND phone = ?) OR (email IS NOT NULL AND email = ?))
            ORDER BY id ASC
            LIMIT 1
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(store_id)
        .bind(phone)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customer_from_row))
    }

    /// Look up a customer by previously linked external customer id.
    pub async fn find_customer_by_external_id(
        &self,
        external_customer_id: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE external_customer_id = ? ORDER BY id ASC LIMIT 1",
            CUSTOMER_COLUMNS
        ))
        .bind(external_customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customer_from_row))
    }

    /// Look up a customer by raw phone-or-email.
    pub async fn find_customer_by_contact(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Customer>, sqlx::Error> {
        if phone.is_none() && email.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM customers
            WHERE (phone IS NOT NULL AND phone = ?) OR (email IS NOT NULL AND email = ?)
            ORDER BY id ASC
            LIMIT 1
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(phone)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customer_from_row))
    }

    /// Link an external customer id to a tracked customer.
    pub async fn link_external_customer_id(
        &self,
        customer_id: i64,
        external_customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE customers SET external_customer_id = ? WHERE id = ?")
            .bind(external_customer_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set a customer's lifecycle stage.
    pub async fn set_lifecycle_stage(
        &self,
        customer_id: i64,
        stage: LifecycleStage,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE customers SET lifecycle_stage = ? WHERE id = ?")
            .bind(stage.as_str())
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bump the most-recent-sample timestamp.
    pub async fn touch_last_sampled(
        &self,
        customer_id: i64,
        at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE customers SET last_sampled_at = ? WHERE id = ?")
            .bind(at.as_ms())
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
