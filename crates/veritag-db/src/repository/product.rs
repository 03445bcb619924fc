//! # Product Cache Repository
//!
//! Database operations for vendor-verified products.
//!
//! ## Upsert Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert(token, remote, now)                                             │
//! │       │                                                                 │
//! │       ├── no row for token → INSERT, cached_at = now                   │
//! │       │                                                                 │
//! │       └── row exists       → UPDATE name, category, description,       │
//! │                              batch_id, status, ttl, cached_at = now    │
//! │                              (token, product_id, verified_at kept)     │
//! │                                                                         │
//! │  The new record is derived by CachedProduct::from_remote/apply_remote  │
//! │  and written whole inside one transaction.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Staleness is not stored; callers compute it from `cached_at + ttl`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use veritag_core::{CachedProduct, ProductData, ProductStatus, Token};

use super::token_column;
use crate::error::{DbError, DbResult};

const TABLE: &str = "cached_products";

const COLUMNS: &str = "token, product_id, name, category, description, batch_id, \
                       verified_at, cached_at, ttl_secs, status";

/// Repository for the product cache.
#[derive(Debug, Clone)]
pub struct ProductCacheRepository {
    pool: SqlitePool,
}

impl ProductCacheRepository {
    /// Creates a new ProductCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductCacheRepository { pool }
    }

    /// Exact lookup by token. Never touches the network.
    pub async fn find(&self, token: &Token) -> DbResult<Option<CachedProduct>> {
        let sql = format!("SELECT {COLUMNS} FROM cached_products WHERE token = ?1");

        let row = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Inserts or updates the record for `token`.
    ///
    /// Idempotent: applying the same `remote` twice leaves the same
    /// observable state apart from `cached_at`.
    pub async fn upsert(
        &self,
        token: &Token,
        remote: &ProductData,
        now: DateTime<Utc>,
    ) -> DbResult<CachedProduct> {
        debug!(
            token = %token,
            product_id = %remote.product_id,
            status = %remote.status,
            "Upserting cached product"
        );

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM cached_products WHERE token = ?1");
        let existing = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let product = match existing.as_ref().map(product_from_row).transpose()? {
            Some(mut product) => {
                product.apply_remote(remote, now);
                product
            }
            None => CachedProduct::from_remote(token.clone(), remote, now),
        };

        sqlx::query(
            r#"
            INSERT INTO cached_products (
                token, product_id, name, category, description, batch_id,
                verified_at, cached_at, ttl_secs, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(token) DO UPDATE SET
                product_id = excluded.product_id,
                name = excluded.name,
                category = excluded.category,
                description = excluded.description,
                batch_id = excluded.batch_id,
                verified_at = excluded.verified_at,
                cached_at = excluded.cached_at,
                ttl_secs = excluded.ttl_secs,
                status = excluded.status
            "#,
        )
        .bind(product.token.as_str())
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.batch_id)
        .bind(product.verified_at)
        .bind(product.cached_at)
        .bind(product.ttl_secs)
        .bind(product.status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Overwrites the status of an existing record.
    pub async fn set_status(&self, token: &Token, status: ProductStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE cached_products SET status = ?2 WHERE token = ?1")
            .bind(token.as_str())
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CachedProduct", token.as_str()));
        }

        Ok(())
    }

    /// Lists every cached product, most recently cached first.
    pub async fn list_all(&self) -> DbResult<Vec<CachedProduct>> {
        let sql = format!("SELECT {COLUMNS} FROM cached_products ORDER BY cached_at DESC, token ASC");

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Counts cached products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cached_products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn product_from_row(row: &SqliteRow) -> DbResult<CachedProduct> {
    Ok(CachedProduct {
        token: token_column(row, "token", TABLE)?,
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        batch_id: row.try_get("batch_id")?,
        verified_at: row.try_get("verified_at")?,
        cached_at: row.try_get("cached_at")?,
        ttl_secs: row.try_get("ttl_secs")?,
        status: row.try_get("status")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
