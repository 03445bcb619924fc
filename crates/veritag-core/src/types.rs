//! # Domain Types
//!
//! Core domain types used throughout Veritag.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │     Token       │   │  CachedProduct  │   │PendingResolutionEntry│  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────────  │  │
//! │  │  qr_ + 20..30   │◄──│  token (key)    │   │  token (key)         │  │
//! │  │  alphanumerics  │   │  product_id     │   │  scanned_at          │  │
//! │  │                 │   │  cached_at, ttl │   │  retry_count         │  │
//! │  │                 │   │  status         │   │  status              │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │  ProductData    │   │  ProductStatus  │   │   PendingStatus      │  │
//! │  │  (vendor reply) │   │  Active         │   │   Pending            │  │
//! │  │                 │   │  Revoked        │   │   Resolving          │  │
//! │  └─────────────────┘   └─────────────────┘   │   Failed             │  │
//! │                                              └──────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Token As Join Key
//! The token is never stored as an entity of its own. It is the key that
//! ties a scan, its cached product and its queue entry together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::validate_token;
use crate::MAX_RETRY_ATTEMPTS;

// =============================================================================
// Token
// =============================================================================

/// A vendor-issued product token, `qr_` followed by 20-30 alphanumerics.
///
/// Construction always goes through [`Token::parse`], so holding a `Token`
/// means the format has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export)]
pub struct Token(String);

impl Token {
    /// Parses a bare token string.
    ///
    /// ## Example
    /// ```rust
    /// use veritag_core::Token;
    ///
    /// assert!(Token::parse("qr_ABCDEFGHIJKLMNOPQRST").is_ok());
    /// assert!(Token::parse("qr_short").is_err());
    /// ```
    pub fn parse(candidate: &str) -> Result<Self, ValidationError> {
        validate_token(candidate)?;
        Ok(Token(candidate.to_string()))
    }

    /// Returns the token text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Token {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_token(&value)?;
        Ok(Token(value))
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Product Status
// =============================================================================

/// Vendor-asserted status of a product.
///
/// Revocation is one-directional as far as dependent records are concerned:
/// a later `Active` only updates the cached product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Product is valid.
    #[default]
    Active,
    /// Vendor revoked the product; dependent records must be deactivated.
    Revoked,
}

impl ProductStatus {
    /// Parses the vendor's status string (`"active"` / `"revoked"`).
    ///
    /// Returns `None` for anything else so the resolver can report a
    /// decoding error instead of guessing.
    pub fn from_vendor(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ProductStatus::Active),
            "revoked" => Some(ProductStatus::Revoked),
            _ => None,
        }
    }

    /// Lowercase wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product Data (vendor reply)
// =============================================================================

/// Product data as returned by a successful remote resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductData {
    /// Vendor's product identifier.
    pub product_id: String,

    /// Display name.
    pub name: String,

    /// Product category.
    pub category: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Optional manufacturing batch.
    pub batch_id: Option<String>,

    /// When the vendor verified this product.
    #[ts(as = "String")]
    pub verified_at: DateTime<Utc>,

    /// Vendor status.
    pub status: ProductStatus,

    /// How long the record may be served from cache, in seconds.
    pub ttl_secs: i64,
}

// =============================================================================
// Cached Product
// =============================================================================

/// A vendor-verified product known to this device.
///
/// ## Invariants
/// - At most one record per `token`
/// - Updated in place on every successful resolution, never duplicated
/// - Never deleted by the resolution pipeline (only by a full data wipe)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedProduct {
    /// Unique key.
    pub token: Token,
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub batch_id: Option<String>,
    /// Vendor-asserted verification time.
    #[ts(as = "String")]
    pub verified_at: DateTime<Utc>,
    /// Local fetch/update time.
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
    /// Cache lifetime in seconds.
    pub ttl_secs: i64,
    pub status: ProductStatus,
}

impl CachedProduct {
    /// Builds a fresh record from a vendor reply.
    pub fn from_remote(token: Token, data: &ProductData, now: DateTime<Utc>) -> Self {
        CachedProduct {
            token,
            product_id: data.product_id.clone(),
            name: data.name.clone(),
            category: data.category.clone(),
            description: data.description.clone(),
            batch_id: data.batch_id.clone(),
            verified_at: data.verified_at,
            cached_at: now,
            ttl_secs: data.ttl_secs,
            status: data.status,
        }
    }

    /// Applies a newer vendor reply in place.
    ///
    /// Only the mutable fields move: `token`, `product_id` and `verified_at`
    /// keep the values from the first resolution.
    pub fn apply_remote(&mut self, data: &ProductData, now: DateTime<Utc>) {
        self.name = data.name.clone();
        self.category = data.category.clone();
        self.description = data.description.clone();
        self.batch_id = data.batch_id.clone();
        self.status = data.status;
        self.ttl_secs = data.ttl_secs;
        self.cached_at = now;
    }

    /// Returns the instant after which the record is stale.
    ///
    /// `None` when `cached_at + ttl` is past the representable range; such a
    /// record never goes stale.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.ttl_secs)
            .and_then(|ttl| self.cached_at.checked_add_signed(ttl))
    }

    /// Staleness is computed at read time: `now > cached_at + ttl`.
    #[inline]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now > expires_at)
    }

    /// Returns true if the vendor revoked this product.
    #[inline]
    pub fn is_revoked(&self) -> bool {
        self.status == ProductStatus::Revoked
    }
}

// =============================================================================
// Pending Resolution Status
// =============================================================================

/// Lifecycle of an offline queue entry.
///
/// ```text
///            enqueue
///               │
///               ▼
///   ┌──────► Pending ──── drain ────► Resolving ──── success ───► (removed)
///   │                                     │
///   │        network / transient (<3)     │
///   └─────────────────────────────────────┤
///                                         │ not found / inactive / any error (≥3)
///                                         ▼
///                                       Failed (kept for visibility)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// Waiting for the next drain.
    #[default]
    Pending,
    /// A drain attempt is in flight.
    Resolving,
    /// Not retried automatically again.
    Failed,
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingStatus::Pending => write!(f, "pending"),
            PendingStatus::Resolving => write!(f, "resolving"),
            PendingStatus::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Pending Resolution Entry
// =============================================================================

/// A scan that could not be resolved because the device was offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PendingResolutionEntry {
    /// Unique among queue entries.
    pub token: Token,
    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
    /// Number of drain attempts so far.
    pub retry_count: i64,
    #[ts(as = "Option<String>")]
    pub last_retry_at: Option<DateTime<Utc>>,
    pub status: PendingStatus,
}

impl PendingResolutionEntry {
    /// Creates a new entry as inserted by `enqueue`.
    pub fn new(token: Token, scanned_at: DateTime<Utc>) -> Self {
        PendingResolutionEntry {
            token,
            scanned_at,
            retry_count: 0,
            last_retry_at: None,
            status: PendingStatus::Pending,
        }
    }

    /// Returns true if a drain should attempt this entry.
    pub fn is_retry_eligible(&self) -> bool {
        self.status == PendingStatus::Pending && self.retry_count < MAX_RETRY_ATTEMPTS
    }

    /// Returns true once automatic retries have been used up.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= MAX_RETRY_ATTEMPTS
    }
}

// =============================================================================
// Routine (dependent record)
// =============================================================================

/// A user routine that references a scanned product.
///
/// Routines belong to the surrounding application. The resolution pipeline
/// only ever flips `is_active` to false when the referenced product is
/// revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Routine {
    pub id: String,
    pub name: String,
    /// Token of the product this routine uses.
    pub product_token: Token,
    /// Vendor product id, when known at creation time.
    pub product_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_data(status: ProductStatus) -> ProductData {
        ProductData {
            product_id: "prod-001".into(),
            name: "Night Serum".into(),
            category: "skincare".into(),
            description: None,
            batch_id: Some("B-42".into()),
            verified_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status,
            ttl_secs: 86_400,
        }
    }

    fn token() -> Token {
        Token::parse("qr_ABCDEFGHIJKLMNOPQRST").unwrap()
    }

    #[test]
    fn test_staleness_boundary() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let product = CachedProduct::from_remote(token(), &sample_data(ProductStatus::Active), t0);

        assert!(!product.is_stale(t0));
        // Exactly at expiry is still fresh: stale only when now > cached_at + ttl
        assert!(!product.is_stale(t0 + Duration::seconds(86_400)));
        assert!(product.is_stale(t0 + Duration::seconds(86_401)));
        assert!(product.is_stale(t0 + Duration::seconds(90_000)));
    }

    #[test]
    fn test_huge_ttl_never_goes_stale() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut data = sample_data(ProductStatus::Active);

        for ttl_secs in [9_000_000_000_000_000, i64::MAX] {
            data.ttl_secs = ttl_secs;
            let product = CachedProduct::from_remote(token(), &data, t0);
            assert_eq!(product.expires_at(), None);
            assert!(!product.is_stale(t0 + Duration::days(10_000)));
        }
    }

    #[test]
    fn test_apply_remote_keeps_identity() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut product =
            CachedProduct::from_remote(token(), &sample_data(ProductStatus::Active), t0);

        let mut update = sample_data(ProductStatus::Revoked);
        update.product_id = "prod-999".into();
        update.name = "Night Serum v2".into();
        update.ttl_secs = 60;
        let t1 = t0 + Duration::hours(1);
        product.apply_remote(&update, t1);

        assert_eq!(product.token, token());
        assert_eq!(product.product_id, "prod-001");
        assert_eq!(product.name, "Night Serum v2");
        assert_eq!(product.ttl_secs, 60);
        assert_eq!(product.cached_at, t1);
        assert!(product.is_revoked());
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(ProductStatus::default(), ProductStatus::Active);
        assert_eq!(PendingStatus::default(), PendingStatus::Pending);
    }

    #[test]
    fn test_product_status_from_vendor() {
        assert_eq!(ProductStatus::from_vendor("active"), Some(ProductStatus::Active));
        assert_eq!(ProductStatus::from_vendor("REVOKED"), Some(ProductStatus::Revoked));
        assert_eq!(ProductStatus::from_vendor("suspended"), None);
    }

    #[test]
    fn test_retry_eligibility() {
        let mut entry = PendingResolutionEntry::new(token(), Utc::now());
        assert!(entry.is_retry_eligible());

        entry.retry_count = MAX_RETRY_ATTEMPTS;
        assert!(!entry.is_retry_eligible());
        assert!(entry.is_exhausted());

        entry.retry_count = 1;
        entry.status = PendingStatus::Failed;
        assert!(!entry.is_retry_eligible());
    }

    #[test]
    fn test_token_serde_rejects_bad_format() {
        let ok: Result<Token, _> = serde_json::from_str("\"qr_ABCDEFGHIJKLMNOPQRST\"");
        assert!(ok.is_ok());

        let bad: Result<Token, _> = serde_json::from_str("\"not-a-token\"");
        assert!(bad.is_err());
    }
}
