//! # Error Types
//!
//! Domain-specific error types for veritag-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  veritag-core errors (this file)                                       │
//! │  ├── ValidationError  - Bad scan input (never retried)                 │
//! │  ├── RemoteError      - Classified vendor/transport outcome            │
//! │  └── QueueError       - Offline queue refused the scan                 │
//! │                                                                         │
//! │  veritag-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  veritag-sync errors (separate crate)                                  │
//! │  └── ResolveError     - What the UI layer sees                         │
//! │                                                                         │
//! │  Flow: ValidationError / RemoteError / QueueError → ResolveError → UI  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Remote Error Classes
//! ```text
//! TERMINAL (vendor made a definitive statement)   TRANSIENT (may succeed later)
//! ─────────────────────────────────────────────   ─────────────────────────────
//! NotFound  (404)                                 RateLimited   (429)
//! Inactive  (410)                                 Unavailable   (503)
//!                                                 ServerError   (other non-2xx)
//!                                                 NetworkError  (no connectivity)
//!                                                 DecodingError (bad payload)
//! ```
//! Only `NetworkError` parks a foreground scan in the offline queue.

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Scanned payload validation failures.
///
/// All of these are user input problems: they are surfaced verbatim and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The payload could not be parsed as a URL at all.
    #[error("Scanned code is not a valid link: {0}")]
    MalformedUrl(String),

    /// The link does not use `https`.
    #[error("Scanned link must use https, got '{0}'")]
    InvalidScheme(String),

    /// The link points at a host other than the allow-listed one.
    #[error("Scanned link points at an unrecognised domain: '{0}'")]
    InvalidDomain(String),

    /// The link path is not a token path.
    #[error("Scanned link has an unexpected path: '{0}'")]
    InvalidPath(String),

    /// No token, or a token that does not match `qr_` + 20-30 alphanumerics.
    #[error("Scanned code does not contain a valid product token: '{0}'")]
    InvalidTokenFormat(String),
}

// =============================================================================
// Remote Error
// =============================================================================

/// Already-classified outcome of a failed remote resolution.
///
/// Mapping from HTTP status codes and transport failures is the resolver's
/// job; the orchestrator only consumes this enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The vendor does not know this token.
    #[error("Token not found")]
    NotFound,

    /// The vendor has deactivated this token.
    #[error("Token is no longer active")]
    Inactive,

    /// Too many requests; the vendor asked us to back off.
    #[error("Rate limited by the verification service")]
    RateLimited,

    /// The vendor service is temporarily unavailable.
    #[error("Verification service unavailable")]
    Unavailable,

    /// Any other non-success HTTP status.
    #[error("Verification service error (status {0})")]
    ServerError(u16),

    /// The request never got a response (offline, DNS, timeout, reset).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The response could not be decoded into product data.
    #[error("Could not decode verification response: {0}")]
    DecodingError(String),
}

impl RemoteError {
    /// Returns true if the vendor made a definitive statement about the token.
    ///
    /// Terminal errors are never retried automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteError::NotFound | RemoteError::Inactive)
    }

    /// Returns true if the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a foreground scan hitting this error should be parked
    /// in the offline queue.
    ///
    /// Rate limiting and server errors are surfaced instead so a busy vendor
    /// is not hammered by silent retries.
    pub fn should_enqueue(&self) -> bool {
        matches!(self, RemoteError::NetworkError(_))
    }
}

// =============================================================================
// Queue Error
// =============================================================================

/// Offline queue refusals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue already holds `capacity` pending scans.
    ///
    /// ## User Workflow
    /// ```text
    /// Offline scan #6
    ///      │
    ///      ▼
    /// enqueue() → QueueFull { capacity: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Offline queue is full, scan again when connected"
    /// ```
    #[error("Offline queue is full ({capacity} pending scans); scan again when connected")]
    QueueFull { capacity: usize },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_classes() {
        assert!(RemoteError::NotFound.is_terminal());
        assert!(RemoteError::Inactive.is_terminal());

        assert!(RemoteError::RateLimited.is_transient());
        assert!(RemoteError::Unavailable.is_transient());
        assert!(RemoteError::ServerError(500).is_transient());
        assert!(RemoteError::NetworkError("offline".into()).is_transient());
        assert!(RemoteError::DecodingError("eof".into()).is_transient());
    }

    #[test]
    fn test_only_network_errors_enqueue() {
        assert!(RemoteError::NetworkError("offline".into()).should_enqueue());

        assert!(!RemoteError::NotFound.should_enqueue());
        assert!(!RemoteError::RateLimited.should_enqueue());
        assert!(!RemoteError::Unavailable.should_enqueue());
        assert!(!RemoteError::ServerError(502).should_enqueue());
        assert!(!RemoteError::DecodingError("eof".into()).should_enqueue());
    }

    #[test]
    fn test_error_messages() {
        let err = QueueError::QueueFull { capacity: 5 };
        assert_eq!(
            err.to_string(),
            "Offline queue is full (5 pending scans); scan again when connected"
        );

        let err = ValidationError::InvalidDomain("evil.example".into());
        assert!(err.to_string().contains("evil.example"));
    }
}
