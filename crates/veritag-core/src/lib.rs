//! # veritag-core: Pure Domain Logic for Veritag
//!
//! This crate is the **heart** of Veritag. It turns a scanned payload into a
//! canonical [`Token`] and defines the records the rest of the workspace
//! stores and moves around: cached products, pending resolutions and the
//! policies that govern them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Veritag Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Mobile UI / Connectivity Observer                │   │
//! │  │        scan ──► resolve_now(payload)      online ──► on_reconnect │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          veritag-sync (orchestrator, resolver, revocation)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ veritag-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ validation│  │   queue   │  │   clock   │  │   │
//! │  │   │  Token    │  │  payload  │  │ capacity  │  │  System   │  │   │
//! │  │   │  Product  │  │  → Token  │  │  retries  │  │  Manual   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 veritag-db (Database Layer)                     │   │
//! │  │          SQLite cache, pending queue, routines, migrations      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Token, CachedProduct, PendingResolutionEntry, ...)
//! - [`validation`] - Scanned payload → token validation
//! - [`queue`] - Offline queue capacity and retry policy
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use veritag_core::validation::validate_payload;
//!
//! let token = validate_payload(
//!     "https://verify.veritag.io/t/qr_ABCDEFGHIJKLMNOPQRST/",
//!     "verify.veritag.io",
//! )
//! .unwrap();
//!
//! assert_eq!(token.as_str(), "qr_ABCDEFGHIJKLMNOPQRST");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod queue;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{QueueError, RemoteError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of entries with `status = pending` in the offline queue.
///
/// ## Business Reason
/// A user who scans while offline must be able to remember what is queued.
/// Beyond this, the scan is rejected with an actionable "scan again" error
/// instead of silently evicting an older scan.
pub const QUEUE_CAPACITY: usize = 5;

/// Drain attempts after which a queue entry is no longer retried automatically.
pub const MAX_RETRY_ATTEMPTS: i64 = 3;

/// Longest cache lifetime accepted from the vendor, in seconds (one year).
pub const MAX_CACHE_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Every vendor token starts with this prefix.
pub const TOKEN_PREFIX: &str = "qr_";

/// Minimum number of alphanumeric characters after [`TOKEN_PREFIX`].
pub const TOKEN_BODY_MIN_LEN: usize = 20;

/// Maximum number of alphanumeric characters after [`TOKEN_PREFIX`].
pub const TOKEN_BODY_MAX_LEN: usize = 30;

/// Path prefix of a deep link carrying a token: `https://<host>/t/<token>`.
pub const PAYLOAD_PATH_PREFIX: &str = "/t/";

/// The only host whose deep links are accepted unless configured otherwise.
pub const DEFAULT_ALLOWED_HOST: &str = "verify.veritag.io";
