//! # Promotion Repository
//!
//! Promotion lookups and inserts. Consuming a promotion use is the
//! [`PromotionRedeemer`](crate::settlement::redeemer::PromotionRedeemer)'s job.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use atelier_core::Promotion;

pub(crate) const PROMOTION_COLUMNS: &str =
    "id, code, name, discount, start_day, end_day, quantity, enabled, created_at, updated_at";

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Fetches a promotion by code, whatever its state.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Promotion>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_code_in(&mut conn, code).await
    }

    /// Fetches a promotion by code on the given connection.
    pub async fn get_by_code_in(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = ?1");
        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(promotion)
    }

    /// Inserts a new promotion.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(code = %promotion.code, "Inserting promotion");

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, code, name, discount, start_day, end_day,
                quantity, enabled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.code)
        .bind(&promotion.name)
        .bind(promotion.discount)
        .bind(promotion.start_day)
        .bind(promotion.end_day)
        .bind(promotion.quantity)
        .bind(promotion.enabled)
        .bind(promotion.created_at)
        .bind(promotion.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists promotions that are currently enabled, by code.
    pub async fn list_enabled(&self) -> DbResult<Vec<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE enabled = 1 ORDER BY code");
        let promotions = sqlx::query_as::<_, Promotion>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(promotions)
    }
}
