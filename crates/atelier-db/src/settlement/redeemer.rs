//! # Promotion Redeemer
//!
//! Consumes one use of a promotion code.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE promotions                                                      │
//! │  SET quantity = quantity - 1,                                           │
//! │      enabled  = (quantity - 1 > 0)                                      │
//! │  WHERE code = :code AND enabled = 1 AND quantity > 0                    │
//! │    AND (end_day   IS NULL OR end_day   >= :today)                       │
//! │    AND (start_day IS NULL OR start_day <= :today)                       │
//! │  RETURNING ...                                                          │
//! │                                                                         │
//! │  row returned ──► redeemed (last use disables the promotion)            │
//! │  no row       ──► diagnostic read                                       │
//! │                     missing        ──► NotFound                         │
//! │                     disabled       ──► NotAvailable                     │
//! │                     end_day < today ──► disable, Expired                │
//! │                     not started / no uses left ──► NotAvailable         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! N uses admit at most N redemptions however many checkouts race for them.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::repository::promotion::{PromotionRepository, PROMOTION_COLUMNS};
use crate::settlement::error::PromotionError;
use atelier_core::{Promotion, RedemptionCheck};

/// Redeems and expires promotion codes.
#[derive(Debug, Clone)]
pub struct PromotionRedeemer {
    pool: SqlitePool,
}

impl PromotionRedeemer {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRedeemer { pool }
    }

    /// Consumes one use of `code` on the caller's connection.
    ///
    /// On [`PromotionError::Expired`] the disable has been written on `conn`
    /// too; a caller that rolls back must call [`Self::expire`] afterwards to
    /// keep it.
    pub async fn redeem_in(
        conn: &mut SqliteConnection,
        code: &str,
        today: NaiveDate,
    ) -> Result<Promotion, PromotionError> {
        let sql = format!(
            r#"
            UPDATE promotions
            SET quantity = quantity - 1,
                enabled = CASE WHEN quantity - 1 > 0 THEN 1 ELSE 0 END,
                updated_at = ?3
            WHERE code = ?1
              AND enabled = 1
              AND quantity > 0
              AND (end_day IS NULL OR end_day >= ?2)
              AND (start_day IS NULL OR start_day <= ?2)
            RETURNING {PROMOTION_COLUMNS}
            "#
        );
        let redeemed = sqlx::query_as::<_, Promotion>(&sql)
            .bind(code)
            .bind(today)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(promotion) = redeemed {
            debug!(code, left = promotion.quantity, "Redeemed promotion");
            if !promotion.enabled {
                info!(code, "Promotion used up, disabled");
            }
            return Ok(promotion);
        }

        let Some(promotion) = PromotionRepository::get_by_code_in(conn, code).await? else {
            return Err(PromotionError::NotFound(code.to_string()));
        };

        match promotion.redemption_check(today) {
            RedemptionCheck::Expired => {
                Self::expire_in(conn, code, today).await?;
                Err(PromotionError::Expired {
                    code: code.to_string(),
                    end_day: promotion.end_day.unwrap_or(today),
                })
            }
            _ => Err(PromotionError::NotAvailable(code.to_string())),
        }
    }

    /// Disables `code` if its end day is before `today`.
    ///
    /// Returns whether a row changed.
    pub async fn expire_in(
        conn: &mut SqliteConnection,
        code: &str,
        today: NaiveDate,
    ) -> Result<bool, PromotionError> {
        let result = sqlx::query(
            r#"
            UPDATE promotions
            SET enabled = 0, updated_at = ?3
            WHERE code = ?1 AND enabled = 1 AND end_day IS NOT NULL AND end_day < ?2
            "#,
        )
        .bind(code)
        .bind(today)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let expired = result.rows_affected() > 0;
        if expired {
            warn!(code, %today, "Promotion expired, disabled");
        }
        Ok(expired)
    }

    /// Disables an expired promotion on its own connection.
    pub async fn expire(&self, code: &str, today: NaiveDate) -> Result<bool, PromotionError> {
        let mut conn = self.pool.acquire().await?;
        Self::expire_in(&mut conn, code, today).await
    }

    /// Redeems one use as of today, committing on its own.
    ///
    /// An expiry disable is committed even though the redemption fails.
    pub async fn redeem(&self, code: &str) -> Result<Promotion, PromotionError> {
        self.redeem_on(code, Utc::now().date_naive()).await
    }

    /// [`Self::redeem`] for an explicit day.
    pub async fn redeem_on(&self, code: &str, today: NaiveDate) -> Result<Promotion, PromotionError> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::redeem_in(&mut tx, code, today).await;

        match &outcome {
            Ok(_) | Err(PromotionError::Expired { .. }) => tx.commit().await?,
            Err(_) => tx.rollback().await?,
        }

        outcome
    }

    /// Looks a promotion up by code, in whatever state it is.
    pub async fn find_promotion(&self, code: &str) -> Result<Promotion, PromotionError> {
        let mut conn = self.pool.acquire().await?;
        PromotionRepository::get_by_code_in(&mut conn, code)
            .await?
            .ok_or_else(|| PromotionError::NotFound(code.to_string()))
    }
}
