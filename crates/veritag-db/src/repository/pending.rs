//! # Pending Resolution Repository
//!
//! The offline queue of scanned tokens awaiting vendor lookup.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   enqueue ──► PENDING ──mark_resolving──► RESOLVING                    │
//! │                  ▲                            │                         │
//! │                  │  transient failure,        ├── success ──► removed  │
//! │                  │  retries left              │                         │
//! │                  └────────────────────────────┤                         │
//! │                                               └── terminal / exhausted │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                                       FAILED            │
//! │                                                                         │
//! │  Capacity: at most 5 entries in PENDING; duplicates are no-ops.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use veritag_core::queue::check_capacity;
use veritag_core::{PendingResolutionEntry, PendingStatus, Token, MAX_RETRY_ATTEMPTS};

use super::token_column;
use crate::error::{DbError, DbResult};

const TABLE: &str = "pending_resolutions";

const COLUMNS: &str = "token, scanned_at, retry_count, last_retry_at, status";

/// Repository for the offline resolution queue.
#[derive(Debug, Clone)]
pub struct PendingResolutionRepository {
    pool: SqlitePool,
}

impl PendingResolutionRepository {
    /// Creates a new PendingResolutionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PendingResolutionRepository { pool }
    }

    /// Adds `token` to the queue.
    ///
    /// Returns `Ok(true)` when a new entry was created and `Ok(false)` when
    /// an entry for the token already existed (in any status).
    ///
    /// ## Errors
    /// [`DbError::Queue`] when the queue already holds 5 pending entries.
    /// The queue is unchanged in that case.
    pub async fn enqueue(&self, token: &Token, scanned_at: DateTime<Utc>) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT token FROM pending_resolutions WHERE token = ?1")
                .bind(token.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            debug!(token = %token, "Token already queued, skipping");
            return Ok(false);
        }

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_resolutions WHERE status = ?1")
                .bind(PendingStatus::Pending)
                .fetch_one(&mut *tx)
                .await?;

        if let Err(e) = check_capacity(pending.max(0) as usize) {
            warn!(token = %token, pending, "Offline queue full, refusing scan");
            return Err(e.into());
        }

        sqlx::query(
            r#"
            INSERT INTO pending_resolutions (token, scanned_at, retry_count, last_retry_at, status)
            VALUES (?1, ?2, 0, NULL, ?3)
            "#,
        )
        .bind(token.as_str())
        .bind(scanned_at)
        .bind(PendingStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(token = %token, pending = pending + 1, "Scan queued for later resolution");
        Ok(true)
    }

    /// Gets the entry for `token`, if any.
    pub async fn get(&self, token: &Token) -> DbResult<Option<PendingResolutionEntry>> {
        let sql = format!("SELECT {COLUMNS} FROM pending_resolutions WHERE token = ?1");

        let row = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    /// Entries that a drain should attempt, oldest scan first.
    ///
    /// Eligible means status `pending` and fewer than 3 attempts so far.
    pub async fn retry_eligible(&self) -> DbResult<Vec<PendingResolutionEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM pending_resolutions
             WHERE status = ?1 AND retry_count < ?2
             ORDER BY scanned_at ASC, token ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(PendingStatus::Pending)
            .bind(MAX_RETRY_ATTEMPTS)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Every entry regardless of status, oldest scan first.
    pub async fn list_all(&self) -> DbResult<Vec<PendingResolutionEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM pending_resolutions ORDER BY scanned_at ASC, token ASC"
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Number of entries in status `pending`.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_resolutions WHERE status = ?1")
                .bind(PendingStatus::Pending)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Claims an entry for an attempt.
    ///
    /// Sets status `resolving`, increments `retry_count` and stamps
    /// `last_retry_at`. Only entries currently `pending` can be claimed.
    pub async fn mark_resolving(
        &self,
        token: &Token,
        now: DateTime<Utc>,
    ) -> DbResult<PendingResolutionEntry> {
        let sql = format!(
            r#"
            UPDATE pending_resolutions
            SET status = ?2, retry_count = retry_count + 1, last_retry_at = ?3
            WHERE token = ?1 AND status = ?4
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(token.as_str())
            .bind(PendingStatus::Resolving)
            .bind(now)
            .bind(PendingStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => entry_from_row(&row),
            None => Err(DbError::not_found("PendingResolution", token.as_str())),
        }
    }

    /// Sets the status of an entry after an attempt.
    pub async fn set_status(&self, token: &Token, status: PendingStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE pending_resolutions SET status = ?2 WHERE token = ?1")
            .bind(token.as_str())
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PendingResolution", token.as_str()));
        }

        debug!(token = %token, status = %status, "Queue entry status updated");
        Ok(())
    }

    /// Returns an entry to the queue for a later drain.
    pub async fn mark_pending(&self, token: &Token) -> DbResult<()> {
        self.set_status(token, PendingStatus::Pending).await
    }

    /// Parks an entry as failed; it is kept but never retried automatically.
    pub async fn mark_failed(&self, token: &Token) -> DbResult<()> {
        self.set_status(token, PendingStatus::Failed).await
    }

    /// Releases entries left in `resolving` by an interrupted drain.
    ///
    /// Entries with attempts left go back to `pending`; exhausted ones
    /// become `failed`. Returns the number of entries released.
    pub async fn release_interrupted(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE pending_resolutions
            SET status = CASE WHEN retry_count >= ?1 THEN ?2 ELSE ?3 END
            WHERE status = ?4
            "#,
        )
        .bind(MAX_RETRY_ATTEMPTS)
        .bind(PendingStatus::Failed)
        .bind(PendingStatus::Pending)
        .bind(PendingStatus::Resolving)
        .execute(&self.pool)
        .await?;

        let released = result.rows_affected();
        if released > 0 {
            warn!(released, "Released queue entries from an interrupted drain");
        }

        Ok(released)
    }

    /// Removes an entry. Returns false if there was nothing to remove.
    pub async fn remove(&self, token: &Token) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pending_resolutions WHERE token = ?1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn entry_from_row(row: &SqliteRow) -> DbResult<PendingResolutionEntry> {
    Ok(PendingResolutionEntry {
        token: token_column(row, "token", TABLE)?,
        scanned_at: row.try_get("scanned_at")?,
        retry_count: row.try_get("retry_count")?,
        last_retry_at: row.try_get("last_retry_at")?,
        status: row.try_get("status")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
