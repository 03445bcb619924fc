//! # Revocation Propagation
//!
//! When the vendor revokes a product, every local record that depends on
//! it is deactivated.
//!
//! ```text
//!  upsert(status = revoked)
//!         │
//!         ▼
//!  RevocationPropagator::on_status_resolved(product)
//!         │
//!         ▼
//!  DependentRecords::deactivate_referencing(token, product_id)
//!         │
//!         ▼
//!  routines.is_active = false   (count returned for logging)
//! ```
//!
//! Propagation only ever deactivates. A product that later comes back as
//! active does not bring its routines back; the user re-enables them.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use veritag_core::{CachedProduct, Clock, Token};
use veritag_db::{DbResult, RoutineRepository};

// =============================================================================
// Dependent Records Port
// =============================================================================

/// Local records that reference a product and must follow its revocation.
#[async_trait]
pub trait DependentRecords: Send + Sync {
    /// Deactivates every active record referencing the product.
    ///
    /// Returns how many records changed. Calling it again returns 0.
    async fn deactivate_referencing(&self, token: &Token, product_id: &str) -> DbResult<usize>;
}

/// Routines stored by veritag-db.
pub struct RoutineRecords {
    routines: RoutineRepository,
    clock: Arc<dyn Clock>,
}

impl RoutineRecords {
    pub fn new(routines: RoutineRepository, clock: Arc<dyn Clock>) -> Self {
        RoutineRecords { routines, clock }
    }
}

#[async_trait]
impl DependentRecords for RoutineRecords {
    async fn deactivate_referencing(&self, token: &Token, product_id: &str) -> DbResult<usize> {
        let changed = self
            .routines
            .deactivate_for_product(token, product_id, self.clock.now())
            .await?;

        Ok(usize::try_from(changed).unwrap_or(usize::MAX))
    }
}

// =============================================================================
// Propagator
// =============================================================================

/// Applies a product's revocation to its dependents.
#[derive(Clone)]
pub struct RevocationPropagator {
    dependents: Arc<dyn DependentRecords>,
}

impl RevocationPropagator {
    pub fn new(dependents: Arc<dyn DependentRecords>) -> Self {
        RevocationPropagator { dependents }
    }

    /// Deactivates dependents of `product` if it is revoked.
    ///
    /// Returns the number of records deactivated; 0 for an active product.
    pub async fn on_status_resolved(&self, product: &CachedProduct) -> DbResult<usize> {
        if !product.is_revoked() {
            return Ok(0);
        }

        let count = self
            .dependents
            .deactivate_referencing(&product.token, &product.product_id)
            .await?;

        info!(
            token = %product.token,
            product_id = %product.product_id,
            deactivated = count,
            "Propagated product revocation"
        );

        Ok(count)
    }
}

impl std::fmt::Debug for RevocationPropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationPropagator").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use veritag_core::{ProductData, ProductStatus};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DependentRecords for Recorder {
        async fn deactivate_referencing(&self, token: &Token, product_id: &str) -> DbResult<usize> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((token.to_string(), product_id.to_string()));
            Ok(2)
        }
    }

    fn product(status: ProductStatus) -> CachedProduct {
        let data = ProductData {
            product_id: "prod-001".into(),
            name: "Night Serum".into(),
            category: "skincare".into(),
            description: None,
            batch_id: None,
            verified_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status,
            ttl_secs: 3600,
        };
        CachedProduct::from_remote(
            Token::parse("qr_ABCDEFGHIJKLMNOPQRST").unwrap(),
            &data,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_active_product_is_not_propagated() {
        let recorder = Arc::new(Recorder::default());
        let propagator = RevocationPropagator::new(recorder.clone());

        let count = propagator.on_status_resolved(&product(ProductStatus::Active)).await.unwrap();
        assert_eq!(count, 0);
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoked_product_deactivates_dependents() {
        let recorder = Arc::new(Recorder::default());
        let propagator = RevocationPropagator::new(recorder.clone());

        let count = propagator.on_status_resolved(&product(ProductStatus::Revoked)).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            recorder.calls.lock().unwrap().as_slice(),
            &[("qr_ABCDEFGHIJKLMNOPQRST".to_string(), "prod-001".to_string())]
        );
    }
}
