//! # Repository Module
//!
//! Database repository implementations for Veritag.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ResolutionOrchestrator                                                │
//! │       │                                                                 │
//! │       │  db.product_cache().find(&token)                               │
//! │       ▼                                                                 │
//! │  ProductCacheRepository ──┐                                            │
//! │  PendingResolutionRepo ───┼── SQL Query ──► SQLite Database            │
//! │  RoutineRepository ───────┘                                            │
//! │                                                                         │
//! │  Every write replaces one row keyed by token (or routine id).          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductCacheRepository`](product::ProductCacheRepository) - cached products
//! - [`PendingResolutionRepository`](pending::PendingResolutionRepository) - offline queue
//! - [`RoutineRepository`](routine::RoutineRepository) - dependent routines

pub mod pending;
pub mod product;
pub mod routine;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use veritag_core::Token;

use crate::error::{DbError, DbResult};

/// Reads a token column, re-validating its format.
pub(crate) fn token_column(row: &SqliteRow, column: &str, table: &str) -> DbResult<Token> {
    let raw: String = row.try_get(column)?;
    Token::try_from(raw).map_err(|e| DbError::corrupt_token(table, e))
}
