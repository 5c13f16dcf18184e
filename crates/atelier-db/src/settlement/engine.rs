//! # Settlement Engine
//!
//! Turns a checkout request into a persisted bill in one transaction.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate items ─── InvalidItems                                        │
//! │  customer / staff exist ─── CustomerNotFound / StaffNotFound            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. redeem promotion (optional) ─── PromotionUnavailable               │
//! │   2. reserve each line           ─── InsufficientStock / SkuUnavailable │
//! │      (first statement is always one of these writes, so the             │
//! │       transaction owns the write lock before any read it relies on)     │
//! │   3. mint code + insert bill     ─── retry on UNIQUE(code)              │
//! │   4. insert items (frozen unit price)                                   │
//! │   5. points += floor(raw / divisor)                                     │
//! │   6. re-evaluate tier            ─── TierLookupFailure                  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error ──► ROLLBACK (dropping the transaction does it too)          │
//! │  Expired promotion ──► ROLLBACK, then disable it on its own             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let engine = SettlementEngine::new(&db, &config.settlement);
//! let receipt = engine
//!     .settle(SettlementRequest {
//!         customer_id: customer.id.clone(),
//!         staff: StaffPrincipal::new(&clerk.id, &clerk.username),
//!         items: vec![LineRequest::new(&tee.id, 2)],
//!         promotion_code: Some("SUMMER10".into()),
//!     })
//!     .await?;
//! println!("{} payable {}", receipt.bill.code, receipt.payable_total);
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::config::SettlementSettings;
use crate::pool::Database;
use crate::repository::bill::BillRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::generate_id;
use crate::repository::staff::StaffRepository;
use crate::repository::tier::TierRepository;
use crate::settlement::error::{PromotionError, SettlementError, SettlementResult};
use crate::settlement::ledger::StockLedger;
use crate::settlement::loyalty::LoyaltyRecalculator;
use crate::settlement::minter::{BillCodeMinter, CodeSource};
use crate::settlement::redeemer::PromotionRedeemer;
use atelier_core::loyalty::loyalty_points;
use atelier_core::validation::validate_items;
use atelier_core::{
    Bill, BillCode, BillItem, BillWithItems, CoreError, LineRequest, Money, Pricing, Promotion,
    SettlementReceipt, StaffPrincipal, TierChange, ValidationError, VoidReceipt,
};

// =============================================================================
// Request
// =============================================================================

/// What the checkout controller hands to [`SettlementEngine::settle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementRequest {
    pub customer_id: String,
    /// The authenticated staff member; becomes the bill owner.
    pub staff: StaffPrincipal,
    pub items: Vec<LineRequest>,
    /// Blank codes count as none.
    pub promotion_code: Option<String>,
}

impl SettlementRequest {
    fn promotion_code(&self) -> Option<&str> {
        self.promotion_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Unit price times quantity, refused when it does not fit in an `i64`.
fn checked_line_total(pricing: &Pricing, quantity: i64, index: usize) -> SettlementResult<Money> {
    pricing
        .price()
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: format!("items[{}].quantity", index),
                min: 1,
                max: i64::MAX / pricing.price.max(1),
            }
            .into()
        })
}

// =============================================================================
// Engine
// =============================================================================

/// Settles checkouts and voids bills.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    pool: SqlitePool,
    minter: BillCodeMinter,
    points_divisor: i64,
}

impl SettlementEngine {
    pub fn new(db: &Database, settings: &SettlementSettings) -> Self {
        SettlementEngine {
            pool: db.pool().clone(),
            minter: BillCodeMinter::new(settings.bill_code_attempts),
            points_divisor: settings.points_divisor,
        }
    }

    /// Same engine with bill code serials drawn from `source`.
    pub fn with_code_source(mut self, source: Arc<dyn CodeSource>) -> Self {
        self.minter = BillCodeMinter::with_source(source, self.minter.max_attempts());
        self
    }

    // =========================================================================
    // Settle
    // =========================================================================

    /// Settles a checkout.
    ///
    /// Nothing is written unless every step succeeds, with one exception:
    /// an expired promotion code is disabled even though the settlement fails.
    pub async fn settle(&self, request: SettlementRequest) -> SettlementResult<SettlementReceipt> {
        validate_items(&request.items)?;
        self.check_parties(&request).await?;

        let today = Utc::now().date_naive();
        let promotion_code = request.promotion_code().map(str::to_string);

        let mut tx = self.pool.begin().await?;

        let promotion = match promotion_code.as_deref() {
            Some(code) => match PromotionRedeemer::redeem_in(&mut tx, code, today).await {
                Ok(promotion) => Some(promotion),
                Err(err @ PromotionError::Expired { .. }) => {
                    tx.rollback().await?;
                    PromotionRedeemer::new(self.pool.clone()).expire(code, today).await?;
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            },
            None => None,
        };

        let receipt = self
            .settle_in(&mut tx, &request, promotion.as_ref(), promotion_code, today)
            .await?;

        tx.commit().await?;

        info!(
            bill = %receipt.bill.code,
            customer_id = %request.customer_id,
            staff = %request.staff.username,
            payable = receipt.payable_total,
            points = receipt.points_added,
            tier_changed = receipt.tier_changed(),
            "Bill settled"
        );

        Ok(receipt)
    }

    /// Everything after the promotion, on the open transaction.
    async fn settle_in(
        &self,
        conn: &mut SqliteConnection,
        request: &SettlementRequest,
        promotion: Option<&Promotion>,
        promotion_code: Option<String>,
        today: NaiveDate,
    ) -> SettlementResult<SettlementReceipt> {
        let mut reserved = Vec::with_capacity(request.items.len());
        let mut raw_total = Money::zero();
        for (index, line) in request.items.iter().enumerate() {
            let pricing = StockLedger::reserve_in(conn, &line.pricing_id, line.quantity).await?;
            let line_total = checked_line_total(&pricing, line.quantity, index)?;
            raw_total = raw_total
                .checked_add(line_total)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "items".to_string(),
                    min: 0,
                    max: i64::MAX,
                })?;
            reserved.push((pricing, line.quantity, line_total));
        }

        // Tier in force before this bill; the receipt's tier discount uses it.
        let customer = CustomerRepository::get_by_id_in(conn, &request.customer_id)
            .await?
            .ok_or_else(|| SettlementError::CustomerNotFound(request.customer_id.clone()))?;
        let tier = TierRepository::get_tier_in(conn, &customer.customer_type_id)
            .await?
            .ok_or_else(|| CoreError::TierNotFound(customer.customer_type_id.clone()))?;

        let bill = self
            .insert_bill_in(conn, request, promotion_code, today)
            .await?;

        let mut items = Vec::with_capacity(reserved.len());
        for (position, (pricing, quantity, line_total)) in reserved.into_iter().enumerate() {
            let item = BillItem {
                id: generate_id(),
                bill_id: bill.id.clone(),
                pricing_id: pricing.id,
                unit_price: pricing.price,
                quantity,
                line_total: line_total.minor(),
                position: position as i64,
            };
            BillRepository::insert_item_in(conn, &item).await?;
            items.push(item);
        }

        let points_added = loyalty_points(raw_total, self.points_divisor);
        if points_added > 0 {
            CustomerRepository::add_points_in(conn, &customer.id, points_added).await?;
        }

        let tier_change: Option<TierChange> =
            LoyaltyRecalculator::reevaluate_in(conn, &customer.id).await?;

        let promotion_discount = promotion
            .and_then(Promotion::discount)
            .map(|d| d.discount_on(raw_total))
            .unwrap_or_else(Money::zero);
        let after_promotion = raw_total.saturating_sub(promotion_discount);
        let tier_discount = after_promotion.discount_amount(tier.discount());
        let payable = after_promotion.saturating_sub(tier_discount);

        Ok(SettlementReceipt {
            bill,
            items,
            raw_total: raw_total.minor(),
            promotion_discount: promotion_discount.minor(),
            tier_discount: tier_discount.minor(),
            payable_total: payable.minor(),
            points_added,
            tier_change,
        })
    }

    /// Mints a code and inserts the bill, minting again if the insert loses
    /// a race for the code.
    async fn insert_bill_in(
        &self,
        conn: &mut SqliteConnection,
        request: &SettlementRequest,
        promotion_code: Option<String>,
        today: NaiveDate,
    ) -> SettlementResult<Bill> {
        let attempts = self.minter.max_attempts();
        for attempt in 1..=attempts {
            let code = self.minter.mint_in(conn).await?;
            let bill = Bill {
                id: generate_id(),
                code: code.to_string(),
                created_on: today,
                staff_id: request.staff.staff_id.clone(),
                customer_id: request.customer_id.clone(),
                promotion_code: promotion_code.clone(),
                created_at: Utc::now(),
            };

            match BillRepository::insert_bill_in(conn, &bill).await {
                Ok(()) => return Ok(bill),
                Err(e) if e.is_unique_violation_on("bills.code") => {
                    warn!(code = %code, attempt, "Bill code taken at insert, minting again");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SettlementError::CodeSpaceExhausted { attempts })
    }

    /// Customer must exist; staff must exist and be active.
    async fn check_parties(&self, request: &SettlementRequest) -> SettlementResult<()> {
        let mut conn = self.pool.acquire().await?;

        if CustomerRepository::get_by_id_in(&mut conn, &request.customer_id)
            .await?
            .is_none()
        {
            return Err(SettlementError::CustomerNotFound(request.customer_id.clone()));
        }

        match StaffRepository::get_by_id_in(&mut conn, &request.staff.staff_id).await? {
            Some(staff) if staff.is_active => Ok(()),
            _ => Err(SettlementError::StaffNotFound(request.staff.staff_id.clone())),
        }
    }

    // =========================================================================
    // Void
    // =========================================================================

    /// Voids a bill: stock and points go back, the bill and its items are
    /// deleted. The tier and any redeemed promotion stay as they are.
    pub async fn void_bill(&self, bill_id: &str) -> SettlementResult<VoidReceipt> {
        let mut tx = self.pool.begin().await?;

        // Taking the items is a write, so the header read below happens
        // under the write lock.
        let items = BillRepository::take_items_in(&mut tx, bill_id).await?;
        let header = BillRepository::get_by_id_in(&mut tx, bill_id)
            .await?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))?;
        let bill = BillWithItems { bill: header, items };

        let mut units_released = 0;
        for item in &bill.items {
            StockLedger::release_in(&mut tx, &item.pricing_id, item.quantity).await?;
            units_released += item.quantity;
        }

        let points = loyalty_points(bill.raw_total(), self.points_divisor);
        let points_removed = if points > 0 {
            CustomerRepository::deduct_points_in(&mut tx, &bill.bill.customer_id, points).await?
        } else {
            0
        };

        BillRepository::delete_in(&mut tx, bill_id).await?;
        tx.commit().await?;

        info!(
            bill = %bill.bill.code,
            units_released,
            points_removed,
            "Bill voided"
        );

        Ok(VoidReceipt {
            bill_id: bill.bill.id,
            bill_code: bill.bill.code,
            units_released,
            points_removed,
        })
    }

    // =========================================================================
    // Standalone Operations
    // =========================================================================

    /// Redeems one use of a promotion outside any settlement.
    pub async fn redeem_promotion(&self, code: &str) -> Result<Promotion, PromotionError> {
        PromotionRedeemer::new(self.pool.clone()).redeem(code).await
    }

    /// Looks a promotion up by code.
    pub async fn find_promotion(&self, code: &str) -> Result<Promotion, PromotionError> {
        PromotionRedeemer::new(self.pool.clone()).find_promotion(code).await
    }

    pub async fn reevaluate_tier(&self, customer_id: &str) -> SettlementResult<Option<TierChange>> {
        LoyaltyRecalculator::new(self.pool.clone())
            .reevaluate(customer_id)
            .await
    }

    pub async fn lifetime_spend(&self, customer_id: &str) -> SettlementResult<Money> {
        LoyaltyRecalculator::new(self.pool.clone())
            .lifetime_spend(customer_id)
            .await
    }

    /// Mints a currently unused bill code without reserving it.
    pub async fn mint_bill_code(&self) -> SettlementResult<BillCode> {
        let code = self.minter.mint(&self.pool).await?;
        debug!(code = %code, "Bill code generated");
        Ok(code)
    }

    /// The customer's bills with items, newest first.
    pub async fn bills_for_customer(&self, customer_id: &str) -> SettlementResult<Vec<BillWithItems>> {
        let mut conn = self.pool.acquire().await?;
        if CustomerRepository::get_by_id_in(&mut conn, customer_id)
            .await?
            .is_none()
        {
            return Err(SettlementError::CustomerNotFound(customer_id.to_string()));
        }
        Ok(BillRepository::bills_for_customer_in(&mut conn, customer_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::settlement::minter::tests::SequenceSource;
    use atelier_core::{Customer, Staff};

    struct Shop {
        db: Database,
        engine: SettlementEngine,
        customer: Customer,
        clerk: Staff,
        tee: Pricing,
        jeans: Pricing,
    }

    async fn shop() -> Shop {
        let db = fixtures::db().await;
        let (bronze, _, _) = fixtures::seed_ladder(&db).await;
        let customer = fixtures::customer("C001", &bronze);
        let clerk = fixtures::staff("an");
        let tee = fixtures::pricing("TEE", 50_000, 10);
        let jeans = fixtures::pricing("JEANS", 60_000, 10);
        db.customers().insert(&customer).await.unwrap();
        db.staff().insert(&clerk).await.unwrap();
        db.pricings().insert(&tee).await.unwrap();
        db.pricings().insert(&jeans).await.unwrap();
        let engine = SettlementEngine::new(&db, &SettlementSettings::default());
        Shop { db, engine, customer, clerk, tee, jeans }
    }

    fn request(shop: &Shop, items: Vec<LineRequest>, promo: Option<&str>) -> SettlementRequest {
        SettlementRequest {
            customer_id: shop.customer.id.clone(),
            staff: StaffPrincipal::new(&shop.clerk.id, &shop.clerk.username),
            items,
            promotion_code: promo.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_settle_writes_bill_items_and_points() {
        let shop = shop().await;
        let receipt = shop
            .engine
            .settle(request(
                &shop,
                vec![LineRequest::new(&shop.tee.id, 1), LineRequest::new(&shop.jeans.id, 1)],
                None,
            ))
            .await
            .unwrap();

        assert!(BillCode::parse(&receipt.bill.code).is_ok());
        assert_eq!(receipt.raw_total, 110_000);
        assert_eq!(receipt.payable_total, 110_000);
        assert_eq!(receipt.points_added, 1);
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1].position, 1);

        let stored = shop.db.bills().get_with_items(&receipt.bill.id).await.unwrap().unwrap();
        assert_eq!(stored.items, receipt.items);
        let customer = shop.db.customers().get_by_id(&shop.customer.id).await.unwrap().unwrap();
        assert_eq!(customer.accumulated_points, 1);
    }

    #[tokio::test]
    async fn test_blank_promotion_code_is_ignored() {
        let shop = shop().await;
        let receipt = shop
            .engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 1)], Some("  ")))
            .await
            .unwrap();
        assert_eq!(receipt.bill.promotion_code, None);
        assert_eq!(receipt.promotion_discount, 0);
    }

    #[tokio::test]
    async fn test_inactive_staff_rejected() {
        let shop = shop().await;
        shop.db.staff().deactivate(&shop.clerk.id).await.unwrap();
        let err = shop
            .engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 1)], None))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::StaffNotFound(_)));
    }

    #[tokio::test]
    async fn test_code_collision_retries_with_next_draw() {
        let shop = shop().await;
        let engine = shop
            .engine
            .clone()
            .with_code_source(Arc::new(SequenceSource::new(vec![7, 7, 8])));

        let first = engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 1)], None))
            .await
            .unwrap();
        let second = engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 1)], None))
            .await
            .unwrap();

        assert_eq!(first.bill.code, "HD-000007");
        assert_eq!(second.bill.code, "HD-000008");
    }

    #[tokio::test]
    async fn test_code_taken_at_insert_mints_again() {
        let shop = shop().await;
        // Another writer lands HD-000007 between the minter's check and our
        // insert. The trigger's row goes with the failed statement.
        sqlx::query(
            r#"
            CREATE TEMP TRIGGER take_code BEFORE INSERT ON bills
            WHEN NEW.code = 'HD-000007'
            BEGIN
                INSERT INTO bills (id, code, created_on, staff_id, customer_id, promotion_code, created_at)
                VALUES ('other-writer', NEW.code, NEW.created_on, NEW.staff_id,
                        NEW.customer_id, NULL, NEW.created_at);
            END
            "#,
        )
        .execute(shop.db.pool())
        .await
        .unwrap();

        let engine = shop
            .engine
            .clone()
            .with_code_source(Arc::new(SequenceSource::new(vec![7, 8])));
        let receipt = engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 1)], None))
            .await
            .unwrap();

        assert_eq!(receipt.bill.code, "HD-000008");
        assert!(shop.db.bills().get_by_code("HD-000007").await.unwrap().is_none());
        assert_eq!(stored_quantity(&shop, &shop.tee.id).await, 9);
    }

    #[tokio::test]
    async fn test_code_taken_at_every_insert_exhausts() {
        let shop = shop().await;
        sqlx::query(
            r#"
            CREATE TEMP TRIGGER take_code BEFORE INSERT ON bills
            BEGIN
                INSERT INTO bills (id, code, created_on, staff_id, customer_id, promotion_code, created_at)
                VALUES ('other-writer', NEW.code, NEW.created_on, NEW.staff_id,
                        NEW.customer_id, NULL, NEW.created_at);
            END
            "#,
        )
        .execute(shop.db.pool())
        .await
        .unwrap();

        let engine = SettlementEngine::new(
            &shop.db,
            &SettlementSettings {
                bill_code_attempts: 3,
                ..SettlementSettings::default()
            },
        );
        let err = engine
            .settle(request(&shop, vec![LineRequest::new(&shop.tee.id, 2)], None))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::CodeSpaceExhausted { attempts: 3 }));
        assert_eq!(stored_quantity(&shop, &shop.tee.id).await, 10);
    }

    #[tokio::test]
    async fn test_line_total_overflow_is_refused() {
        let shop = shop().await;
        let gown = fixtures::pricing("GOWN", 4_000_000_000_000_000_000, 5);
        shop.db.pricings().insert(&gown).await.unwrap();

        let err = shop
            .engine
            .settle(request(&shop, vec![LineRequest::new(&gown.id, 3)], None))
            .await
            .unwrap_err();

        match err {
            SettlementError::InvalidItems(ValidationError::OutOfRange { field, max, .. }) => {
                assert_eq!(field, "items[0].quantity");
                assert_eq!(max, 2);
            }
            other => panic!("expected InvalidItems, got {other:?}"),
        }
        assert_eq!(stored_quantity(&shop, &gown.id).await, 5);
        assert!(shop.engine.bills_for_customer(&shop.customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bill_total_overflow_is_refused() {
        let shop = shop().await;
        let gown = fixtures::pricing("GOWN", 3_000_000_000_000_000_000, 5);
        shop.db.pricings().insert(&gown).await.unwrap();

        // Each line fits; their sum does not.
        let err = shop
            .engine
            .settle(request(
                &shop,
                vec![LineRequest::new(&gown.id, 2), LineRequest::new(&gown.id, 2)],
                None,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SettlementError::InvalidItems(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(stored_quantity(&shop, &gown.id).await, 5);
    }

    async fn stored_quantity(shop: &Shop, pricing_id: &str) -> i64 {
        shop.db
            .pricings()
            .get_by_id(pricing_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    #[tokio::test]
    async fn test_void_returns_stock_and_points() {
        let shop = shop().await;
        let receipt = shop
            .engine
            .settle(request(&shop, vec![LineRequest::new(&shop.jeans.id, 3)], None))
            .await
            .unwrap();
        assert_eq!(receipt.points_added, 1);

        let void = shop.engine.void_bill(&receipt.bill.id).await.unwrap();
        assert_eq!(void.units_released, 3);
        assert_eq!(void.points_removed, 1);

        let jeans = shop.db.pricings().get_by_id(&shop.jeans.id).await.unwrap().unwrap();
        assert_eq!(jeans.quantity, 10);
        assert!(shop.db.bills().get_by_id(&receipt.bill.id).await.unwrap().is_none());
        assert!(matches!(
            shop.engine.void_bill(&receipt.bill.id).await.unwrap_err(),
            SettlementError::BillNotFound(_)
        ));
    }
}
