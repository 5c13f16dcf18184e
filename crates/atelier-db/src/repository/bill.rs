//! # Bill Repository
//!
//! Bills and their items.
//!
//! ## Snapshot Pattern
//! Each [`BillItem`] freezes the SKU's unit price at the moment of sale, so
//! later price edits never change a settled bill or the lifetime spend
//! computed from it.
//!
//! Bills are written only inside the settlement transaction; this repository
//! exposes the connection-scoped writes and pool-backed reads.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use atelier_core::{Bill, BillItem, BillWithItems};

const BILL_COLUMNS: &str =
    "id, code, created_on, staff_id, customer_id, promotion_code, created_at";

const ITEM_COLUMNS: &str = "id, bill_id, pricing_id, unit_price, quantity, line_total, position";

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // =========================================================================
    // Writes (connection-scoped)
    // =========================================================================

    /// Inserts a bill header.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `bills.code` - the code was taken
    ///   between minting and insert; mint again
    pub async fn insert_bill_in(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
        debug!(code = %bill.code, customer_id = %bill.customer_id, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, code, created_on, staff_id, customer_id, promotion_code, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.code)
        .bind(bill.created_on)
        .bind(&bill.staff_id)
        .bind(&bill.customer_id)
        .bind(&bill.promotion_code)
        .bind(bill.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one bill line.
    pub async fn insert_item_in(conn: &mut SqliteConnection, item: &BillItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bill_items (
                id, bill_id, pricing_id, unit_price, quantity, line_total, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.bill_id)
        .bind(&item.pricing_id)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.line_total)
        .bind(item.position)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes a bill's items and returns them in line order.
    pub async fn take_items_in(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let sql = format!("DELETE FROM bill_items WHERE bill_id = ?1 RETURNING {ITEM_COLUMNS}");
        let mut items = sqlx::query_as::<_, BillItem>(&sql)
            .bind(bill_id)
            .fetch_all(&mut *conn)
            .await?;
        items.sort_by_key(|item| item.position);

        Ok(items)
    }

    /// Deletes a bill; its items go with it (ON DELETE CASCADE).
    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// True when a bill with this code exists.
    pub async fn code_exists_in(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bills WHERE code = ?1)")
            .bind(code)
            .fetch_one(&mut *conn)
            .await?;

        Ok(exists)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(bill)
    }

    /// Gets a bill by its `HD-` code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Bill>> {
        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE code = ?1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bill)
    }

    /// Items of one bill in line order.
    pub async fn items_for_bill_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
    ) -> DbResult<Vec<BillItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY position");
        let items = sqlx::query_as::<_, BillItem>(&sql)
            .bind(bill_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items)
    }

    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<BillWithItems>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_with_items_in(&mut conn, id).await
    }

    pub async fn get_with_items_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<BillWithItems>> {
        let Some(bill) = Self::get_by_id_in(conn, id).await? else {
            return Ok(None);
        };
        let items = Self::items_for_bill_in(conn, id).await?;

        Ok(Some(BillWithItems { bill, items }))
    }

    /// Every bill of a customer with its items, newest first.
    pub async fn bills_for_customer(&self, customer_id: &str) -> DbResult<Vec<BillWithItems>> {
        let mut conn = self.pool.acquire().await?;
        Self::bills_for_customer_in(&mut conn, customer_id).await
    }

    /// Connection-scoped form of [`Self::bills_for_customer`].
    ///
    /// Two queries regardless of bill count: headers, then all items joined
    /// back by `bill_id`.
    pub async fn bills_for_customer_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<Vec<BillWithItems>> {
        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE customer_id = ?1 ORDER BY created_at DESC, code DESC"
        );
        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        let items = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT i.id, i.bill_id, i.pricing_id, i.unit_price, i.quantity, i.line_total, i.position
            FROM bill_items i
            JOIN bills b ON b.id = i.bill_id
            WHERE b.customer_id = ?1
            ORDER BY i.bill_id, i.position
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_bill: HashMap<String, Vec<BillItem>> = HashMap::new();
        for item in items {
            by_bill.entry(item.bill_id.clone()).or_default().push(item);
        }

        Ok(bills
            .into_iter()
            .map(|bill| {
                let items = by_bill.remove(&bill.id).unwrap_or_default();
                BillWithItems { bill, items }
            })
            .collect())
    }
}
