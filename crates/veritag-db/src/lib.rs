//! # veritag-db: Local Storage for Veritag
//!
//! SQLite persistence for the product cache, the offline resolution queue
//! and the routines that depend on scanned products. Uses sqlx for async
//! access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Veritag Data Flow                                │
//! │                                                                         │
//! │  ResolutionOrchestrator (veritag-sync)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    veritag-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │◄───│ ProductCacheRepo   │  │ 001_init   │  │   │
//! │  │   │  SqlitePool   │    │ PendingResolution  │  │            │  │   │
//! │  │   │               │    │ RoutineRepo        │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (per-user data dir) or :memory: in tests                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use veritag_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("veritag.db")).await?;
//!
//! let cached = db.product_cache().find(&token).await?;
//! let queued = db.pending_queue().count_pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::pending::PendingResolutionRepository;
pub use repository::product::ProductCacheRepository;
pub use repository::routine::{NewRoutine, RoutineRepository};
