//! # Stock Ledger
//!
//! Reserves and releases SKU units with single conditional statements.
//!
//! ## Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE pricings SET quantity = quantity - :q                           │
//! │  WHERE id = :id AND enabled = 1 AND quantity >= :q                      │
//! │  RETURNING ...                                                          │
//! │                                                                         │
//! │  row returned ──► reserved (the returned row is the post-image)         │
//! │  no row       ──► diagnostic read:                                      │
//! │                     missing / disabled ──► SkuUnavailable               │
//! │                     otherwise          ──► InsufficientStock{available} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two checkouts racing for the last units can't both win: SQLite runs the
//! two statements one after the other and the second sees the first's
//! decrement in its `WHERE`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::repository::pricing::{PricingRepository, PRICING_COLUMNS};
use crate::settlement::error::{SettlementError, SettlementResult};
use atelier_core::validation::validate_quantity;
use atelier_core::Pricing;

/// Conditional stock decrements and compensating increments.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Takes `quantity` units of a SKU.
    ///
    /// Returns the SKU as it is after the decrement; its `price` is the one
    /// the bill line freezes.
    pub async fn reserve_in(
        conn: &mut SqliteConnection,
        pricing_id: &str,
        quantity: i64,
    ) -> SettlementResult<Pricing> {
        validate_quantity("quantity", quantity)?;

        let sql = format!(
            r#"
            UPDATE pricings
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND enabled = 1 AND quantity >= ?2
            RETURNING {PRICING_COLUMNS}
            "#
        );
        let reserved = sqlx::query_as::<_, Pricing>(&sql)
            .bind(pricing_id)
            .bind(quantity)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(pricing) = reserved {
            debug!(pricing_id, quantity, left = pricing.quantity, "Reserved stock");
            return Ok(pricing);
        }

        match PricingRepository::get_by_id_in(conn, pricing_id).await? {
            Some(pricing) if pricing.enabled => Err(SettlementError::InsufficientStock {
                pricing_id: pricing_id.to_string(),
                available: pricing.quantity,
                requested: quantity,
            }),
            _ => Err(SettlementError::SkuUnavailable(pricing_id.to_string())),
        }
    }

    /// Gives `quantity` units back, whether or not the SKU is enabled.
    pub async fn release_in(
        conn: &mut SqliteConnection,
        pricing_id: &str,
        quantity: i64,
    ) -> SettlementResult<()> {
        validate_quantity("quantity", quantity)?;

        let result = sqlx::query(
            "UPDATE pricings SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(pricing_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SettlementError::SkuUnavailable(pricing_id.to_string()));
        }

        debug!(pricing_id, quantity, "Released stock");
        Ok(())
    }

    /// Reserves on its own connection (autocommit).
    pub async fn reserve(&self, pricing_id: &str, quantity: i64) -> SettlementResult<Pricing> {
        let mut conn = self.pool.acquire().await?;
        Self::reserve_in(&mut conn, pricing_id, quantity).await
    }

    /// Releases on its own connection (autocommit).
    pub async fn release(&self, pricing_id: &str, quantity: i64) -> SettlementResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::release_in(&mut conn, pricing_id, quantity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_reserve_until_empty() {
        let db = fixtures::db().await;
        let sku = fixtures::pricing("TEE", 50_000, 5);
        db.pricings().insert(&sku).await.unwrap();
        let ledger = StockLedger::new(db.pool().clone());

        let after = ledger.reserve(&sku.id, 3).await.unwrap();
        assert_eq!(after.quantity, 2);
        assert_eq!(after.price, 50_000);

        let err = ledger.reserve(&sku.id, 3).await.unwrap_err();
        match err {
            SettlementError::InsufficientStock { available, requested, .. } => {
                assert_eq!((available, requested), (2, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        ledger.reserve(&sku.id, 2).await.unwrap();
        let stock = db.pricings().get_by_id(&sku.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 0);
    }

    #[tokio::test]
    async fn test_missing_or_disabled_sku_is_unavailable() {
        let db = fixtures::db().await;
        let sku = fixtures::pricing("TEE", 50_000, 5);
        db.pricings().insert(&sku).await.unwrap();
        db.pricings().set_enabled(&sku.id, false).await.unwrap();
        let ledger = StockLedger::new(db.pool().clone());

        assert!(matches!(
            ledger.reserve(&sku.id, 1).await.unwrap_err(),
            SettlementError::SkuUnavailable(_)
        ));
        assert!(matches!(
            ledger.reserve("ghost", 1).await.unwrap_err(),
            SettlementError::SkuUnavailable(_)
        ));
        assert!(matches!(
            ledger.release("ghost", 1).await.unwrap_err(),
            SettlementError::SkuUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_release_restores_and_rejects_bad_quantity() {
        let db = fixtures::db().await;
        let sku = fixtures::pricing("TEE", 50_000, 1);
        db.pricings().insert(&sku).await.unwrap();
        let ledger = StockLedger::new(db.pool().clone());

        ledger.reserve(&sku.id, 1).await.unwrap();
        ledger.release(&sku.id, 1).await.unwrap();
        assert_eq!(db.pricings().get_by_id(&sku.id).await.unwrap().unwrap().quantity, 1);

        assert!(matches!(
            ledger.reserve(&sku.id, 0).await.unwrap_err(),
            SettlementError::InvalidItems(_)
        ));
    }
}
