//! # Staff Repository
//!
//! Staff accounts that own bills. Authentication lives outside this crate;
//! settlement only needs to know the account exists and is active.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use atelier_core::Staff;

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    pub async fn insert(&self, staff: &Staff) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO staff (id, username, display_name, is_active) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&staff.id)
        .bind(&staff.username)
        .bind(&staff.display_name)
        .bind(staff.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Staff>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT id, username, display_name, is_active FROM staff WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(staff)
    }

    /// Deactivates an account. Existing bills keep pointing at it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE staff SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", id));
        }

        Ok(())
    }
}
