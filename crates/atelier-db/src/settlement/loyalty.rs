//! # Loyalty Recalculator
//!
//! Recomputes a customer's lifetime spend from their bills and moves them up
//! a tier when the spend qualifies.
//!
//! ## Recalculation
//! ```text
//!   customer ──► current tier (must exist)
//!   bills + items ──► raw total per bill
//!                      └─ promotion still resolvable? apply it
//!                      └─ current tier discount on what is left
//!                 ──► Σ = lifetime spend
//!   thresholds (spend asc, id asc) ──► best discount among met
//!   strictly better than current? ──► persist + TierChange
//! ```
//!
//! Tiers only go up. A customer sitting on a better tier than their spend
//! supports (assigned by hand, or after a void) keeps it.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::repository::bill::BillRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::promotion::PromotionRepository;
use crate::repository::tier::TierRepository;
use crate::settlement::error::{SettlementError, SettlementResult};
use atelier_core::loyalty::{self, BillSpend};
use atelier_core::{CoreError, Customer, CustomerType, Money, PromotionDiscount, TierChange};

/// Recomputes lifetime spend and upgrades tiers.
#[derive(Debug, Clone)]
pub struct LoyaltyRecalculator {
    pool: SqlitePool,
}

impl LoyaltyRecalculator {
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyRecalculator { pool }
    }

    /// Re-evaluates the customer's tier on the caller's connection.
    ///
    /// Returns the change when one was written.
    pub async fn reevaluate_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> SettlementResult<Option<TierChange>> {
        let (customer, current, spend) = Self::spend_in(conn, customer_id).await?;

        let tiers = TierRepository::list_tiers_in(conn).await?;
        let thresholds = TierRepository::list_thresholds_in(conn).await?;
        if thresholds.is_empty() {
            warn!(customer_id, "No tier thresholds configured, tier left as is");
        }

        let selected = loyalty::select_tier(spend, &thresholds, &tiers)?;
        let Some(next) = loyalty::tier_upgrade(&current, selected) else {
            debug!(customer_id, spend = %spend, tier = %current.name, "Tier unchanged");
            return Ok(None);
        };

        CustomerRepository::set_tier_in(conn, &customer.id, &next.id).await?;
        info!(
            customer_id,
            from = %current.name,
            to = %next.name,
            spend = %spend,
            "Customer tier upgraded"
        );

        Ok(Some(TierChange {
            customer_id: customer.id,
            from_tier_id: current.id,
            to_tier_id: next.id.clone(),
            to_tier_name: next.name.clone(),
            lifetime_spend: spend.minor(),
        }))
    }

    /// Discount-adjusted lifetime spend at the customer's current tier.
    pub async fn lifetime_spend_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> SettlementResult<Money> {
        let (_, _, spend) = Self::spend_in(conn, customer_id).await?;
        Ok(spend)
    }

    async fn spend_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> SettlementResult<(Customer, CustomerType, Money)> {
        let customer = CustomerRepository::get_by_id_in(conn, customer_id)
            .await?
            .ok_or_else(|| SettlementError::CustomerNotFound(customer_id.to_string()))?;

        let current = TierRepository::get_tier_in(conn, &customer.customer_type_id)
            .await?
            .ok_or_else(|| CoreError::TierNotFound(customer.customer_type_id.clone()))?;

        let bills = BillRepository::bills_for_customer_in(conn, customer_id).await?;

        // Codes repeat across bills; look each one up once.
        let mut promotions: HashMap<String, Option<PromotionDiscount>> = HashMap::new();
        let mut spends = Vec::with_capacity(bills.len());
        for bill in &bills {
            let promotion = match bill.bill.promotion_code.as_deref() {
                Some(code) => match promotions.get(code) {
                    Some(cached) => *cached,
                    None => {
                        let resolved = PromotionRepository::get_by_code_in(conn, code)
                            .await?
                            .and_then(|p| p.discount());
                        promotions.insert(code.to_string(), resolved);
                        resolved
                    }
                },
                None => None,
            };
            spends.push(BillSpend {
                raw_total: bill.raw_total(),
                promotion,
            });
        }

        let spend = loyalty::lifetime_spend(&spends, current.discount());
        Ok((customer, current, spend))
    }

    /// Re-evaluates in a transaction of its own.
    pub async fn reevaluate(&self, customer_id: &str) -> SettlementResult<Option<TierChange>> {
        let mut tx = self.pool.begin().await?;
        let change = Self::reevaluate_in(&mut tx, customer_id).await?;
        tx.commit().await?;
        Ok(change)
    }

    pub async fn lifetime_spend(&self, customer_id: &str) -> SettlementResult<Money> {
        let mut conn = self.pool.acquire().await?;
        Self::lifetime_spend_in(&mut conn, customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::repository::{fixtures, generate_id};
    use crate::Database;
    use atelier_core::{Bill, BillItem, Customer, Pricing, Staff};

    async fn record_bill(
        db: &Database,
        customer: &Customer,
        clerk: &Staff,
        sku: &Pricing,
        quantity: i64,
        promotion_code: Option<&str>,
    ) {
        let bill = Bill {
            id: generate_id(),
            code: format!("HD-{:06}", rand::random::<u32>() % 1_000_000),
            created_on: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            staff_id: clerk.id.clone(),
            customer_id: customer.id.clone(),
            promotion_code: promotion_code.map(str::to_string),
            created_at: Utc::now(),
        };
        let item = BillItem {
            id: generate_id(),
            bill_id: bill.id.clone(),
            pricing_id: sku.id.clone(),
            unit_price: sku.price,
            quantity,
            line_total: sku.price * quantity,
            position: 0,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        BillRepository::insert_bill_in(&mut conn, &bill).await.unwrap();
        BillRepository::insert_item_in(&mut conn, &item).await.unwrap();
    }

    async fn setup() -> (Database, Customer, Staff, Pricing, [CustomerType; 3]) {
        let db = fixtures::db().await;
        let (bronze, silver, gold) = fixtures::seed_ladder(&db).await;
        let customer = fixtures::customer("C001", &bronze);
        let clerk = fixtures::staff("an");
        let coat = fixtures::pricing("COAT", 1_000_000, 100);
        db.customers().insert(&customer).await.unwrap();
        db.staff().insert(&clerk).await.unwrap();
        db.pricings().insert(&coat).await.unwrap();
        (db, customer, clerk, coat, [bronze, silver, gold])
    }

    #[tokio::test]
    async fn test_upgrade_at_exact_threshold() {
        let (db, customer, clerk, coat, [bronze, silver, _]) = setup().await;
        record_bill(&db, &customer, &clerk, &coat, 5, None).await;

        let recalculator = LoyaltyRecalculator::new(db.pool().clone());
        assert_eq!(recalculator.lifetime_spend(&customer.id).await.unwrap().minor(), 5_000_000);

        let change = recalculator.reevaluate(&customer.id).await.unwrap().unwrap();
        assert_eq!(change.from_tier_id, bronze.id);
        assert_eq!(change.to_tier_id, silver.id);
        assert_eq!(change.lifetime_spend, 5_000_000);

        // Silver's own 5% now shrinks the spend below its threshold; the
        // tier is kept.
        assert!(recalculator.reevaluate(&customer.id).await.unwrap().is_none());
        let stored = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.customer_type_id, silver.id);
    }

    #[tokio::test]
    async fn test_promotion_applied_when_still_resolvable() {
        let (db, customer, clerk, coat, _) = setup().await;
        db.promotions()
            .insert(&fixtures::promotion("HALF", 0.5, 10, None))
            .await
            .unwrap();
        record_bill(&db, &customer, &clerk, &coat, 2, Some("HALF")).await;
        record_bill(&db, &customer, &clerk, &coat, 1, Some("GONE")).await;

        let recalculator = LoyaltyRecalculator::new(db.pool().clone());
        // 2,000,000 halved + 1,000,000 with an unknown code.
        assert_eq!(recalculator.lifetime_spend(&customer.id).await.unwrap().minor(), 2_000_000);
    }

    #[tokio::test]
    async fn test_dangling_threshold_fails() {
        let (db, customer, _, _, _) = setup().await;
        let ghost = fixtures::tier("Ghost", 2_000);
        db.tiers()
            .insert_threshold(&fixtures::threshold(&ghost, 90_000_000))
            .await
            .unwrap();

        let err = LoyaltyRecalculator::new(db.pool().clone())
            .reevaluate(&customer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::TierLookupFailure(_)));
    }

    #[tokio::test]
    async fn test_no_thresholds_keeps_tier() {
        let (db, customer, clerk, coat, [bronze, _, _]) = setup().await;
        record_bill(&db, &customer, &clerk, &coat, 60, None).await;
        sqlx::query("DELETE FROM required_bills")
            .execute(db.pool())
            .await
            .unwrap();

        let change = LoyaltyRecalculator::new(db.pool().clone())
            .reevaluate(&customer.id)
            .await
            .unwrap();
        assert!(change.is_none());
        let stored = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.customer_type_id, bronze.id);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let (db, _, _, _, _) = setup().await;
        let err = LoyaltyRecalculator::new(db.pool().clone())
            .reevaluate("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::CustomerNotFound(_)));
    }
}
