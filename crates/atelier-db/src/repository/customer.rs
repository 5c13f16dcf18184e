//! # Customer Repository
//!
//! Customer rows carry the two pieces of settlement state that change on
//! every checkout: accumulated points and the tier reference.
//!
//! ## Point Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ read points, add in Rust, write back  (lost update)             │
//! │  ✅ UPDATE customers SET accumulated_points = accumulated_points + ? │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use atelier_core::Customer;

const CUSTOMER_COLUMNS: &str =
    "id, code, full_name, phone, accumulated_points, customer_type_id, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Gets a customer by ID on the given connection.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(code = %customer.code, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, code, full_name, phone, accumulated_points,
                customer_type_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.code)
        .bind(&customer.full_name)
        .bind(&customer.phone)
        .bind(customer.accumulated_points)
        .bind(&customer.customer_type_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically adds loyalty points.
    pub async fn add_points_in(conn: &mut SqliteConnection, id: &str, points: i64) -> DbResult<()> {
        debug!(customer_id = %id, points, "Accruing points");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET accumulated_points = accumulated_points + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(points)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Removes up to `points`, never going below zero.
    ///
    /// Returns the number of points actually removed. Run it on a
    /// connection that already holds the write lock (a transaction that has
    /// written) so the balance read and the update see the same row.
    pub async fn deduct_points_in(
        conn: &mut SqliteConnection,
        id: &str,
        points: i64,
    ) -> DbResult<i64> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT accumulated_points FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        let balance = balance.ok_or_else(|| DbError::not_found("Customer", id))?;
        let removed = points.clamp(0, balance.max(0));

        sqlx::query(
            r#"
            UPDATE customers
            SET accumulated_points = MAX(accumulated_points - ?2, 0),
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(removed)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(removed)
    }

    /// Points the customer at a new tier.
    pub async fn set_tier_in(
        conn: &mut SqliteConnection,
        id: &str,
        customer_type_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET customer_type_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(customer_type_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CustomerRepository;
    use crate::repository::fixtures;
    use crate::DbError;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = fixtures::db().await;
        let (bronze, _, _) = fixtures::seed_ladder(&db).await;
        let customer = fixtures::customer("C001", &bronze);
        db.customers().insert(&customer).await.unwrap();

        let found = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(found, customer);
        assert!(db.customers().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_tier_rejected() {
        let db = fixtures::db().await;
        let ghost = fixtures::tier("Ghost", 0);
        let err = db
            .customers()
            .insert(&fixtures::customer("C001", &ghost))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_points_add_and_floor_on_deduct() {
        let db = fixtures::db().await;
        let (bronze, silver, _) = fixtures::seed_ladder(&db).await;
        let customer = fixtures::customer("C001", &bronze);
        db.customers().insert(&customer).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        CustomerRepository::add_points_in(&mut conn, &customer.id, 12).await.unwrap();
        assert_eq!(
            CustomerRepository::deduct_points_in(&mut conn, &customer.id, 5).await.unwrap(),
            5
        );
        assert_eq!(
            CustomerRepository::deduct_points_in(&mut conn, &customer.id, 50).await.unwrap(),
            7
        );
        CustomerRepository::set_tier_in(&mut conn, &customer.id, &silver.id).await.unwrap();
        drop(conn);

        let found = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(found.accumulated_points, 0);
        assert_eq!(found.customer_type_id, silver.id);
    }

    #[tokio::test]
    async fn test_missing_customer_is_not_found() {
        let db = fixtures::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let err = CustomerRepository::add_points_in(&mut conn, "nope", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
