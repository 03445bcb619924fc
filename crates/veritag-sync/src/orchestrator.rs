//! # Resolution Orchestrator
//!
//! Ties validation, cache, remote lookup, offline queue and revocation
//! together for one device session.
//!
//! ## Scan Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        resolve_now(payload)                             │
//! │                                                                         │
//! │  validate_payload ──✗──► ResolveError::Validation                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cache.find(token) ── fresh ──► (propagate if revoked)                 │
//! │       │                         Resolution::Cached   (no network)      │
//! │       │ absent / stale                                                  │
//! │       ▼                                                                 │
//! │  resolver.resolve(token)                                               │
//! │       ├── Ok ──────────► upsert ─► propagate ─► Resolution::Fetched    │
//! │       ├── NetworkError ► enqueue ─┬─► Resolution::Queued               │
//! │       │                           └─► ResolveError::QueueFull          │
//! │       └── other ───────► ResolveError::Remote                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drain Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          on_reconnect()                                 │
//! │                                                                         │
//! │  for entry in queue.retry_eligible()      (oldest scan first)          │
//! │       │                                                                 │
//! │       ├── mark_resolving (retry_count + 1, last_retry_at = now)        │
//! │       ├── resolver.resolve(token)                                      │
//! │       │     ├── Ok  ──► upsert ─► propagate ─► remove entry            │
//! │       │     └── Err ──► status_after_failure ─► pending | failed       │
//! │       └── any local failure is logged; the next entry still runs       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queue mutations (enqueue and drain) are serialised by one async mutex, so
//! a scan never races the capacity count of a running drain.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use veritag_core::queue::status_after_failure;
use veritag_core::validation::validate_payload;
use veritag_core::{
    CachedProduct, Clock, PendingResolutionEntry, PendingStatus, ProductData, Routine, Token,
};
use veritag_db::Database;

use crate::error::ResolveResult;
use crate::resolver::RemoteResolver;
use crate::revocation::{RevocationPropagator, RoutineRecords};

// =============================================================================
// Results
// =============================================================================

/// Successful outcome of [`ResolutionOrchestrator::resolve_now`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// Served from a fresh cache record; no network call was made.
    Cached { product: CachedProduct },

    /// Fetched from the vendor and written to the cache.
    Fetched { product: CachedProduct },

    /// The device is offline; the scan is parked in the queue.
    Queued { token: Token },
}

impl Resolution {
    /// The resolved product, if the scan was not queued.
    pub fn product(&self) -> Option<&CachedProduct> {
        match self {
            Resolution::Cached { product } | Resolution::Fetched { product } => Some(product),
            Resolution::Queued { .. } => None,
        }
    }

    /// Returns true if the vendor was not contacted.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Resolution::Cached { .. })
    }
}

/// Summary of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Entries picked up by this drain.
    pub attempted: usize,
    /// Entries resolved and removed from the queue.
    pub resolved: usize,
    /// Entries moved to `failed`.
    pub failed: usize,
    /// Entries returned to `pending` for a later drain.
    pub requeued: usize,
}

impl DrainReport {
    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Resolved => self.resolved += 1,
            EntryOutcome::Failed => self.failed += 1,
            EntryOutcome::Requeued => self.requeued += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Resolved,
    Failed,
    Requeued,
}

impl From<PendingStatus> for EntryOutcome {
    fn from(status: PendingStatus) -> Self {
        match status {
            PendingStatus::Failed => EntryOutcome::Failed,
            PendingStatus::Pending | PendingStatus::Resolving => EntryOutcome::Requeued,
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Single owner of the scan and drain flows for a device session.
pub struct ResolutionOrchestrator {
    db: Database,
    resolver: Arc<dyn RemoteResolver>,
    propagator: RevocationPropagator,
    clock: Arc<dyn Clock>,
    allowed_host: String,
    queue_lock: Mutex<()>,
}

impl ResolutionOrchestrator {
    /// Creates an orchestrator from explicit collaborators.
    pub fn new(
        db: Database,
        resolver: Arc<dyn RemoteResolver>,
        propagator: RevocationPropagator,
        clock: Arc<dyn Clock>,
        allowed_host: impl Into<String>,
    ) -> Self {
        ResolutionOrchestrator {
            db,
            resolver,
            propagator,
            clock,
            allowed_host: allowed_host.into(),
            queue_lock: Mutex::new(()),
        }
    }

    /// Creates an orchestrator whose revocations deactivate stored routines.
    pub fn with_routines(
        db: Database,
        resolver: Arc<dyn RemoteResolver>,
        clock: Arc<dyn Clock>,
        allowed_host: impl Into<String>,
    ) -> Self {
        let dependents = Arc::new(RoutineRecords::new(db.routines(), clock.clone()));
        let propagator = RevocationPropagator::new(dependents);
        Self::new(db, resolver, propagator, clock, allowed_host)
    }

    // =========================================================================
    // Scan
    // =========================================================================

    /// Resolves a scanned payload.
    ///
    /// ## Errors
    /// - `Validation` for a rejected payload (verbatim, never retried)
    /// - `QueueFull` when offline and 5 scans are already pending
    /// - `Remote` for any other vendor failure (not queued)
    /// - `Database` for local storage failures
    pub async fn resolve_now(&self, payload: &str) -> ResolveResult<Resolution> {
        let token = validate_payload(payload, &self.allowed_host).map_err(|e| {
            debug!(error = %e, "Rejected scanned payload");
            e
        })?;
        let scanned_at = self.clock.now();

        if let Some(cached) = self.db.product_cache().find(&token).await? {
            if !cached.is_stale(scanned_at) {
                debug!(token = %token, "Cache hit");
                // Repeats a propagation that failed after the upsert committed
                self.propagator.on_status_resolved(&cached).await?;
                return Ok(Resolution::Cached { product: cached });
            }
            debug!(token = %token, expires_at = ?cached.expires_at(), "Cached product is stale");
        } else {
            debug!(token = %token, "Cache miss");
        }

        match self.resolver.resolve(&token).await {
            Ok(data) => {
                let product = self.store(&token, &data).await?;
                info!(token = %token, status = %product.status, "Resolved scan");
                Ok(Resolution::Fetched { product })
            }
            Err(err) if err.should_enqueue() => {
                info!(token = %token, error = %err, "Offline, queueing scan");
                let _guard = self.queue_lock.lock().await;
                self.db.pending_queue().enqueue(&token, scanned_at).await?;
                Ok(Resolution::Queued { token })
            }
            Err(err) => {
                warn!(token = %token, error = %err, "Resolution failed");
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Drains the offline queue; call when connectivity returns.
    ///
    /// Entries are attempted one at a time, oldest scan first. A failure on
    /// one entry never stops the rest of the drain.
    pub async fn on_reconnect(&self) -> ResolveResult<DrainReport> {
        let _guard = self.queue_lock.lock().await;
        let queue = self.db.pending_queue();

        queue.release_interrupted().await?;
        let entries = queue.retry_eligible().await?;

        let mut report = DrainReport::default();
        if entries.is_empty() {
            debug!("Offline queue empty, nothing to drain");
            return Ok(report);
        }

        info!(count = entries.len(), "Draining offline queue");

        for entry in entries {
            report.attempted += 1;

            let outcome = match self.drain_entry(&entry.token).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(token = %entry.token, error = %e, "Failed to process queued scan");
                    self.settle_entry(&entry.token).await
                }
            };

            report.record(outcome);
        }

        info!(
            attempted = report.attempted,
            resolved = report.resolved,
            failed = report.failed,
            requeued = report.requeued,
            "Drain complete"
        );

        Ok(report)
    }

    async fn drain_entry(&self, token: &Token) -> ResolveResult<EntryOutcome> {
        let queue = self.db.pending_queue();
        let claimed = queue.mark_resolving(token, self.clock.now()).await?;

        match self.resolver.resolve(token).await {
            Ok(data) => {
                self.store(token, &data).await?;
                queue.remove(token).await?;
                info!(token = %token, attempt = claimed.retry_count, "Queued scan resolved");
                Ok(EntryOutcome::Resolved)
            }
            Err(err) => {
                let next = status_after_failure(&err, claimed.retry_count);
                queue.set_status(token, next).await?;
                warn!(
                    token = %token,
                    retry_count = claimed.retry_count,
                    error = %err,
                    status = %next,
                    "Queued scan not resolved"
                );
                Ok(next.into())
            }
        }
    }

    /// Puts an entry whose attempt hit a local error back into a stable state.
    async fn settle_entry(&self, token: &Token) -> EntryOutcome {
        let queue = self.db.pending_queue();

        match queue.get(token).await {
            Ok(Some(entry)) if entry.status == PendingStatus::Resolving => {
                let (next, settled) = if entry.is_exhausted() {
                    (PendingStatus::Failed, queue.mark_failed(token).await)
                } else {
                    (PendingStatus::Pending, queue.mark_pending(token).await)
                };
                if let Err(e) = settled {
                    // release_interrupted picks it up on the next drain
                    error!(token = %token, error = %e, "Could not settle queue entry");
                }
                next.into()
            }
            Ok(Some(entry)) => entry.status.into(),
            // Removal is the last step of a successful attempt
            Ok(None) => EntryOutcome::Resolved,
            Err(e) => {
                error!(token = %token, error = %e, "Could not read queue entry");
                EntryOutcome::Requeued
            }
        }
    }

    /// Writes vendor data to the cache and applies a revocation.
    async fn store(&self, token: &Token, data: &ProductData) -> ResolveResult<CachedProduct> {
        let product = self
            .db
            .product_cache()
            .upsert(token, data, self.clock.now())
            .await?;

        self.propagator.on_status_resolved(&product).await?;

        Ok(product)
    }

    // =========================================================================
    // Read Accessors
    // =========================================================================

    /// Every cached product, most recently cached first.
    pub async fn cached_products(&self) -> ResolveResult<Vec<CachedProduct>> {
        Ok(self.db.product_cache().list_all().await?)
    }

    /// Every queue entry, including failed ones.
    pub async fn pending_entries(&self) -> ResolveResult<Vec<PendingResolutionEntry>> {
        Ok(self.db.pending_queue().list_all().await?)
    }

    /// Number of scans waiting for a drain.
    pub async fn pending_count(&self) -> ResolveResult<usize> {
        let count = self.db.pending_queue().count_pending().await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Routines referencing `token`.
    pub async fn routines_for(&self, token: &Token) -> ResolveResult<Vec<Routine>> {
        Ok(self.db.routines().list_for_token(token).await?)
    }

    /// Deletes all local data, waiting for any running drain to finish.
    pub async fn wipe_all(&self) -> ResolveResult<()> {
        let _guard = self.queue_lock.lock().await;
        Ok(self.db.wipe_all().await?)
    }
}

impl std::fmt::Debug for ResolutionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionOrchestrator")
            .field("allowed_host", &self.allowed_host)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_report_record() {
        let mut report = DrainReport::default();
        report.record(EntryOutcome::Resolved);
        report.record(PendingStatus::Failed.into());
        report.record(PendingStatus::Pending.into());
        report.record(PendingStatus::Resolving.into());

        assert_eq!(
            report,
            DrainReport {
                attempted: 0,
                resolved: 1,
                failed: 1,
                requeued: 2,
            }
        );
    }

    #[test]
    fn test_resolution_serializes_with_outcome_tag() {
        let token = Token::parse("qr_ABCDEFGHIJKLMNOPQRST").unwrap();
        let json = serde_json::to_value(Resolution::Queued { token }).unwrap();
        assert_eq!(json["outcome"], "queued");
        assert_eq!(json["token"], "qr_ABCDEFGHIJKLMNOPQRST");
    }
}
