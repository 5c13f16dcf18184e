//! # Tier Repository
//!
//! Customer tiers (`customer_types`) and the spend thresholds that unlock
//! them (`required_bills`).
//!
//! A threshold points at its tier by id only; the schema has no foreign key
//! there, so a threshold can outlive its tier. Readers get the rows as they
//! are and [`atelier_core::loyalty::select_tier`] reports the dangling link.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use atelier_core::{CustomerType, RequiredBill};

/// Repository for tier and threshold operations.
#[derive(Debug, Clone)]
pub struct TierRepository {
    pool: SqlitePool,
}

impl TierRepository {
    /// Creates a new TierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TierRepository { pool }
    }

    pub async fn insert_tier(&self, tier: &CustomerType) -> DbResult<()> {
        debug!(name = %tier.name, bps = tier.discount_bps, "Inserting tier");

        sqlx::query("INSERT INTO customer_types (id, name, discount_bps) VALUES (?1, ?2, ?3)")
            .bind(&tier.id)
            .bind(&tier.name)
            .bind(tier.discount_bps)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_threshold(&self, threshold: &RequiredBill) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO required_bills (id, customer_type_id, required_spend) VALUES (?1, ?2, ?3)",
        )
        .bind(&threshold.id)
        .bind(&threshold.customer_type_id)
        .bind(threshold.required_spend)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a tier. Thresholds pointing at it are left behind.
    pub async fn delete_tier(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM customer_types WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets a tier by ID.
    pub async fn get_tier(&self, id: &str) -> DbResult<Option<CustomerType>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_tier_in(&mut conn, id).await
    }

    pub async fn get_tier_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<CustomerType>> {
        let tier = sqlx::query_as::<_, CustomerType>(
            "SELECT id, name, discount_bps FROM customer_types WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(tier)
    }

    /// All tiers, keyed by id.
    pub async fn list_tiers_in(
        conn: &mut SqliteConnection,
    ) -> DbResult<HashMap<String, CustomerType>> {
        let tiers = sqlx::query_as::<_, CustomerType>(
            "SELECT id, name, discount_bps FROM customer_types",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(tiers.into_iter().map(|t| (t.id.clone(), t)).collect())
    }

    /// All thresholds in ascending spend order, ties by id.
    pub async fn list_thresholds_in(conn: &mut SqliteConnection) -> DbResult<Vec<RequiredBill>> {
        let thresholds = sqlx::query_as::<_, RequiredBill>(
            r#"
            SELECT id, customer_type_id, required_spend
            FROM required_bills
            ORDER BY required_spend ASC, id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(thresholds)
    }

    /// Thresholds on the pool, same order as [`Self::list_thresholds_in`].
    pub async fn list_thresholds(&self) -> DbResult<Vec<RequiredBill>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_thresholds_in(&mut conn).await
    }
}
