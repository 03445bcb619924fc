//! # Routine Repository
//!
//! Storage for user routines that reference scanned products.
//!
//! The resolution pipeline only reads routines by product and flips
//! `is_active` off on revocation; everything else here exists for the
//! surrounding application and for tests.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use veritag_core::{Routine, Token};

use super::token_column;
use crate::error::DbResult;

const TABLE: &str = "routines";

const COLUMNS: &str = "id, name, product_token, product_id, is_active, created_at, updated_at";

/// Input for creating a routine.
#[derive(Debug, Clone)]
pub struct NewRoutine {
    pub name: String,
    pub product_token: Token,
    pub product_id: Option<String>,
}

/// Repository for routine database operations.
#[derive(Debug, Clone)]
pub struct RoutineRepository {
    pool: SqlitePool,
}

impl RoutineRepository {
    /// Creates a new RoutineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoutineRepository { pool }
    }

    /// Inserts an active routine and returns it.
    pub async fn insert(&self, routine: NewRoutine, now: DateTime<Utc>) -> DbResult<Routine> {
        let id = Uuid::new_v4().to_string();

        debug!(id = %id, token = %routine.product_token, "Inserting routine");

        let sql = format!(
            r#"
            INSERT INTO routines (id, name, product_token, product_id, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&id)
            .bind(&routine.name)
            .bind(routine.product_token.as_str())
            .bind(&routine.product_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        routine_from_row(&row)
    }

    /// Gets a routine by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Routine>> {
        let sql = format!("SELECT {COLUMNS} FROM routines WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(routine_from_row).transpose()
    }

    /// Routines referencing `token`, oldest first.
    pub async fn list_for_token(&self, token: &Token) -> DbResult<Vec<Routine>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM routines WHERE product_token = ?1 ORDER BY created_at ASC, id ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(routine_from_row).collect()
    }

    /// Deactivates every active routine referencing the product.
    ///
    /// A routine references the product when its `product_token` equals
    /// `token` or its `product_id` equals `product_id`. Already inactive
    /// routines are left alone, so repeating the call returns 0.
    pub async fn deactivate_for_product(
        &self,
        token: &Token,
        product_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE routines
            SET is_active = 0, updated_at = ?3
            WHERE is_active = 1 AND (product_token = ?1 OR product_id = ?2)
            "#,
        )
        .bind(token.as_str())
        .bind(product_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            info!(token = %token, product_id, count, "Deactivated routines for revoked product");
        }

        Ok(count)
    }
}

fn routine_from_row(row: &SqliteRow) -> DbResult<Routine> {
    Ok(Routine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        product_token: token_column(row, "product_token", TABLE)?,
        product_id: row.try_get("product_id")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};

    fn serum() -> Token {
        Token::parse("qr_SERUM0000000000000000").unwrap()
    }

    fn cleanser() -> Token {
        Token::parse("qr_CLEANSER000000000000").unwrap()
    }

    fn new_routine(name: &str, token: Token, product_id: Option<&str>) -> NewRoutine {
        NewRoutine {
            name: name.into(),
            product_token: token,
            product_id: product_id.map(String::from),
        }
    }

    async fn repo() -> RoutineRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().routines()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();

        let routine = repo
            .insert(new_routine("Morning", serum(), Some("prod-001")), now)
            .await
            .unwrap();
        assert!(routine.is_active);
        assert_eq!(routine.created_at, now);

        let fetched = repo.get(&routine.id).await.unwrap().unwrap();
        assert_eq!(fetched, routine);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivate_matches_token_or_product_id() {
        let repo = repo().await;
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();

        repo.insert(new_routine("Morning", serum(), None), now).await.unwrap();
        // Different token, same vendor product
        repo.insert(new_routine("Evening", cleanser(), Some("prod-001")), now)
            .await
            .unwrap();
        let unrelated = repo
            .insert(new_routine("Weekly", cleanser(), Some("prod-002")), now)
            .await
            .unwrap();

        let later = now + Duration::hours(1);
        let count = repo
            .deactivate_for_product(&serum(), "prod-001", later)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let serum_routines = repo.list_for_token(&serum()).await.unwrap();
        assert!(!serum_routines[0].is_active);
        assert_eq!(serum_routines[0].updated_at, later);

        let untouched = repo.get(&unrelated.id).await.unwrap().unwrap();
        assert!(untouched.is_active);

        // Second pass is a no-op
        let again = repo
            .deactivate_for_product(&serum(), "prod-001", later)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }
}
