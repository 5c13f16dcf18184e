//! # Pricing Repository
//!
//! Reads and inserts for SKUs.
//!
//! Stock quantity is written only by the
//! [`StockLedger`](crate::settlement::ledger::StockLedger); this repository
//! never changes it after insert.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use atelier_core::Pricing;

pub(crate) const PRICING_COLUMNS: &str =
    "id, code, product_name, size, color, price, quantity, enabled, created_at, updated_at";

/// Repository for SKU database operations.
#[derive(Debug, Clone)]
pub struct PricingRepository {
    pool: SqlitePool,
}

impl PricingRepository {
    /// Creates a new PricingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PricingRepository { pool }
    }

    /// Gets a SKU by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Pricing>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Gets a SKU by its ID on the given connection.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Pricing>> {
        let sql = format!("SELECT {PRICING_COLUMNS} FROM pricings WHERE id = ?1");
        let pricing = sqlx::query_as::<_, Pricing>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(pricing)
    }

    /// Gets a SKU by its code (e.g. `TSHIRT-BLK-M`).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Pricing>> {
        let sql = format!("SELECT {PRICING_COLUMNS} FROM pricings WHERE code = ?1");
        let pricing = sqlx::query_as::<_, Pricing>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pricing)
    }

    /// Inserts a new SKU.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    /// * `Err(DbError::CheckViolation)` - negative price or quantity
    pub async fn insert(&self, pricing: &Pricing) -> DbResult<()> {
        debug!(code = %pricing.code, "Inserting SKU");

        sqlx::query(
            r#"
            INSERT INTO pricings (
                id, code, product_name, size, color,
                price, quantity, enabled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&pricing.id)
        .bind(&pricing.code)
        .bind(&pricing.product_name)
        .bind(&pricing.size)
        .bind(&pricing.color)
        .bind(pricing.price)
        .bind(pricing.quantity)
        .bind(pricing.enabled)
        .bind(pricing.created_at)
        .bind(pricing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Enables or disables a SKU.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE pricings SET enabled = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(enabled)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pricing", id));
        }

        Ok(())
    }

    /// Counts enabled SKUs (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pricings WHERE enabled = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
