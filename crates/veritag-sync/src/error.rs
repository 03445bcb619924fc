//! # Resolve Error Types
//!
//! The error surface of the resolution engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Resolve Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Scan input    │  │     Remote      │  │     Offline queue       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Remote         │  │  QueueFull              │ │
//! │  │  (never retry)  │  │  (classified)   │  │  (scan again later)     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │    Database     │  │              Configuration                  │  │
//! │  │                 │  │                                             │  │
//! │  │  Database       │  │  InvalidConfig  MissingDeviceId  InvalidUrl │  │
//! │  │                 │  │  ConfigLoadFailed  ConfigSaveFailed         │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use veritag_core::{QueueError, RemoteError, ValidationError};
use veritag_db::DbError;

/// Result type alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Everything that can go wrong between a scan and a cached product.
#[derive(Debug, Error)]
pub enum ResolveError {
    // =========================================================================
    // Scan Errors
    // =========================================================================
    /// The scanned payload was rejected before any lookup.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The vendor lookup failed and the scan was not queued.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // =========================================================================
    // Queue Errors
    // =========================================================================
    /// The device is offline and the offline queue has no room.
    ///
    /// ## When This Occurs
    /// - A scan hits a network error while 5 scans are already pending
    ///
    /// The scan was NOT recorded; the user has to scan again.
    #[error("Offline queue is full ({capacity} pending scans); scan again when connected")]
    QueueFull { capacity: usize },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local storage failed.
    #[error("Database error: {0}")]
    Database(DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID.
    #[error("Device ID not configured. Run initial setup first.")]
    MissingDeviceId,

    /// Invalid service URL.
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Output Errors
    // =========================================================================
    /// Failed to serialize a result for output.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for ResolveError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Queue(queue) => queue.into(),
            other => ResolveError::Database(other),
        }
    }
}

impl From<QueueError> for ResolveError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::QueueFull { capacity } => ResolveError::QueueFull { capacity },
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for ResolveError {
    fn from(err: url::ParseError) -> Self {
        ResolveError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ResolveError {
    fn from(err: toml::de::Error) -> Self {
        ResolveError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ResolveError {
    fn from(err: toml::ser::Error) -> Self {
        ResolveError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ResolveError {
    /// Returns true if repeating the same scan later may succeed.
    ///
    /// ## Retryable Errors
    /// - Transient remote failures (rate limit, unavailable, server, decoding)
    /// - A full offline queue (once connectivity returns)
    ///
    /// ## Non-Retryable Errors
    /// - Validation failures
    /// - NotFound / Inactive
    /// - Configuration errors
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::Remote(e) => e.is_transient(),
            ResolveError::QueueFull { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the message should be shown to the user as-is
    /// because only the user can act on it.
    pub fn is_user_actionable(&self) -> bool {
        match self {
            ResolveError::Validation(_) | ResolveError::QueueFull { .. } => true,
            ResolveError::Remote(e) => e.is_terminal(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ResolveError::InvalidConfig(_)
                | ResolveError::MissingDeviceId
                | ResolveError::InvalidUrl(_)
                | ResolveError::ConfigLoadFailed(_)
                | ResolveError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_from_db_is_distinct() {
        let err: ResolveError = DbError::Queue(QueueError::QueueFull { capacity: 5 }).into();
        assert!(matches!(err, ResolveError::QueueFull { capacity: 5 }));
        assert!(err.is_user_actionable());

        let err: ResolveError = DbError::PoolExhausted.into();
        assert!(matches!(err, ResolveError::Database(_)));
        assert!(!err.is_user_actionable());
    }

    #[test]
    fn test_categories() {
        assert!(ResolveError::Remote(RemoteError::RateLimited).is_retryable());
        assert!(!ResolveError::Remote(RemoteError::NotFound).is_retryable());
        assert!(ResolveError::Remote(RemoteError::Inactive).is_user_actionable());

        let validation = ResolveError::from(ValidationError::InvalidScheme("http".into()));
        assert!(!validation.is_retryable());
        assert!(validation.is_user_actionable());

        assert!(ResolveError::MissingDeviceId.is_config_error());
        assert!(!ResolveError::QueueFull { capacity: 5 }.is_config_error());
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let inner = ValidationError::InvalidDomain("evil.example".into());
        let err = ResolveError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
    }
}
