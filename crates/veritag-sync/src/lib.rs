//! # veritag-sync: Resolution Engine for Veritag
//!
//! Turns scanned payloads into trusted, cached product records, parks scans
//! in a bounded offline queue while the device has no connectivity, and
//! carries a vendor's revocation into the routines that use the product.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Resolution Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              ResolutionOrchestrator (one per session)            │  │
//! │  │                                                                  │  │
//! │  │  resolve_now(payload)          on_reconnect()                   │  │
//! │  └───────┬──────────────────────────┬──────────────────────┬────────┘  │
//! │          │                          │                      │           │
//! │          ▼                          ▼                      ▼           │
//! │  ┌────────────────┐  ┌─────────────────────────┐  ┌────────────────┐   │
//! │  │ RemoteResolver │  │ veritag-db              │  │ Revocation     │   │
//! │  │                │  │                         │  │ Propagator     │   │
//! │  │ HttpResolver   │  │ product cache           │  │                │   │
//! │  │ (reqwest)      │  │ pending queue (max 5)   │  │ deactivates    │   │
//! │  │                │  │ routines                │  │ routines       │   │
//! │  └────────────────┘  └─────────────────────────┘  └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`orchestrator`] - `ResolutionOrchestrator`, scan and drain flows
//! - [`resolver`] - `RemoteResolver` trait and the HTTP implementation
//! - [`revocation`] - Revocation propagation to dependent records
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `ResolveError`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use veritag_core::SystemClock;
//! use veritag_db::{Database, DbConfig};
//! use veritag_sync::{HttpResolver, ResolutionOrchestrator, VeritagConfig};
//!
//! let config = VeritagConfig::load(None)?;
//! let db = Database::new(DbConfig::new(config.database_path())).await?;
//! let resolver = Arc::new(HttpResolver::from_config(&config)?);
//!
//! let orchestrator = ResolutionOrchestrator::with_routines(
//!     db,
//!     resolver,
//!     Arc::new(SystemClock),
//!     config.remote.allowed_host.clone(),
//! );
//!
//! let resolution = orchestrator.resolve_now(scanned_text).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod revocation;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::VeritagConfig;
pub use error::{ResolveError, ResolveResult};
pub use orchestrator::{DrainReport, Resolution, ResolutionOrchestrator};
pub use resolver::{HttpResolver, RemoteResolver, TokenResolutionResponse};
pub use revocation::{DependentRecords, RevocationPropagator, RoutineRecords};
