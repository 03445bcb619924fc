//! # Offline Queue Policy
//!
//! The pure rules behind the pending-resolution queue. Storage lives in
//! veritag-db; the drain loop lives in veritag-sync. Both defer to the
//! functions here so the invariants are stated once.
//!
//! ## Drain Outcome Table
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Remote outcome               │ Next state                               │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ Ok(product)                  │ entry removed                            │
//! │ NotFound / Inactive          │ Failed (terminal)                        │
//! │ any error, retry_count >= 3  │ Failed                                   │
//! │ any error, retry_count <  3  │ Pending                                  │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```

use crate::error::{QueueError, RemoteError};
use crate::types::PendingStatus;
use crate::{MAX_RETRY_ATTEMPTS, QUEUE_CAPACITY};

/// Checks whether one more pending entry fits.
///
/// Hard failure, never eviction: the caller must surface the error.
///
/// ## Example
/// ```rust
/// use veritag_core::queue::check_capacity;
///
/// assert!(check_capacity(4).is_ok());
/// assert!(check_capacity(5).is_err());
/// ```
pub fn check_capacity(pending_count: usize) -> Result<(), QueueError> {
    if pending_count >= QUEUE_CAPACITY {
        return Err(QueueError::QueueFull {
            capacity: QUEUE_CAPACITY,
        });
    }

    Ok(())
}

/// Returns the status an entry moves to after a failed drain attempt.
///
/// `retry_count` is the count *after* the attempt was recorded. An exhausted
/// entry always becomes `Failed`, so it stops counting against
/// [`QUEUE_CAPACITY`].
pub fn status_after_failure(error: &RemoteError, retry_count: i64) -> PendingStatus {
    match error {
        RemoteError::NotFound | RemoteError::Inactive => PendingStatus::Failed,
        _ if retry_count >= MAX_RETRY_ATTEMPTS => PendingStatus::Failed,
        _ => PendingStatus::Pending,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
