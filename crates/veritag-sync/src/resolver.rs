//! # Remote Resolver
//!
//! Looks a token up at the vendor and classifies every failure.
//!
//! ## Request / Response
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  GET {base_url}/tokens/{token}                                         │
//! │      X-Device-Hash: <device hash>                                      │
//! │      X-App-Version: <app version>                                      │
//! │      Accept: application/json                                          │
//! │                                                                         │
//! │  200 ──► TokenResolutionResponse ──► ProductData                       │
//! │  404 ──► NotFound          410 ──► Inactive                            │
//! │  429 ──► RateLimited       503 ──► Unavailable                         │
//! │  other non-2xx ──► ServerError(status)                                 │
//! │  timeout / connect / reset ──► NetworkError                            │
//! │  bad body / unknown status ──► DecodingError                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use veritag_core::{ProductData, ProductStatus, RemoteError, Token, MAX_CACHE_TTL_SECS};

use crate::config::VeritagConfig;
use crate::error::{ResolveError, ResolveResult};

/// Header carrying the device hash.
pub const DEVICE_HASH_HEADER: &str = "X-Device-Hash";

/// Header carrying the client version.
pub const APP_VERSION_HEADER: &str = "X-App-Version";

// =============================================================================
// Resolver Trait
// =============================================================================

/// Resolves a token to vendor product data.
///
/// Implementations own the transport and must map every outcome to a
/// [`RemoteError`] variant; callers never see transport types.
#[async_trait]
pub trait RemoteResolver: Send + Sync {
    /// Looks up `token` at the vendor.
    async fn resolve(&self, token: &Token) -> Result<ProductData, RemoteError>;
}

// =============================================================================
// Wire Format
// =============================================================================

/// Body of a successful `GET /tokens/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResolutionResponse {
    /// Vendor status string, `"active"` or `"revoked"`.
    pub status: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub version: Option<u32>,

    pub product: ProductPayload,

    /// Cache lifetime in seconds.
    pub cache_ttl: i64,
}

/// Product section of [`TokenResolutionResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub product_id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    pub verified_at: DateTime<Utc>,
}

impl TokenResolutionResponse {
    /// Converts the wire body into domain data.
    ///
    /// ## Errors
    /// [`RemoteError::DecodingError`] for an unknown status, or a TTL that is
    /// negative or longer than [`MAX_CACHE_TTL_SECS`].
    pub fn into_product_data(self) -> Result<ProductData, RemoteError> {
        let status = ProductStatus::from_vendor(&self.status).ok_or_else(|| {
            RemoteError::DecodingError(format!("unknown product status '{}'", self.status))
        })?;

        if !(0..=MAX_CACHE_TTL_SECS).contains(&self.cache_ttl) {
            return Err(RemoteError::DecodingError(format!(
                "cache_ttl {} outside 0..={MAX_CACHE_TTL_SECS}",
                self.cache_ttl
            )));
        }

        Ok(ProductData {
            product_id: self.product.product_id,
            name: self.product.name,
            category: self.product.category,
            description: self.product.description,
            batch_id: self.product.batch_id,
            verified_at: self.product.verified_at,
            status,
            ttl_secs: self.cache_ttl,
        })
    }
}

/// Maps a non-success HTTP status to a remote error.
pub fn classify_status(status: u16) -> RemoteError {
    match status {
        404 => RemoteError::NotFound,
        410 => RemoteError::Inactive,
        429 => RemoteError::RateLimited,
        503 => RemoteError::Unavailable,
        other => RemoteError::ServerError(other),
    }
}

// =============================================================================
// HTTP Resolver
// =============================================================================

/// [`RemoteResolver`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
    device_hash: String,
    app_version: String,
}

impl HttpResolver {
    /// Creates a resolver with an explicit per-call timeout.
    pub fn new(
        base_url: impl Into<String>,
        device_hash: impl Into<String>,
        app_version: impl Into<String>,
        timeout: Duration,
    ) -> ResolveResult<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpResolver {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            device_hash: device_hash.into(),
            app_version: app_version.into(),
        })
    }

    /// Creates a resolver from the loaded configuration.
    pub fn from_config(config: &VeritagConfig) -> ResolveResult<Self> {
        Self::new(
            config.remote.base_url.clone(),
            config.device.hash.clone(),
            config.remote.app_version.clone(),
            config.timeout(),
        )
    }

    fn token_url(&self, token: &Token) -> String {
        format!("{}/tokens/{}", self.base_url, token)
    }
}

#[async_trait]
impl RemoteResolver for HttpResolver {
    async fn resolve(&self, token: &Token) -> Result<ProductData, RemoteError> {
        let url = self.token_url(token);
        debug!(token = %token, url = %url, "Resolving token");

        let response = self
            .client
            .get(&url)
            .header(DEVICE_HASH_HEADER, &self.device_hash)
            .header(APP_VERSION_HEADER, &self.app_version)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(token = %token, error = %e, "Resolution request failed");
                RemoteError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = classify_status(status.as_u16());
            debug!(token = %token, status = status.as_u16(), error = %err, "Vendor refused token");
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;

        let decoded: TokenResolutionResponse = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::DecodingError(e.to_string()))?;

        decoded.into_product_data()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> Token {
        Token::parse("qr_ABCDEFGHIJKLMNOPQRST").unwrap()
    }

    fn body(status: &str) -> serde_json::Value {
        json!({
            "status": status,
            "token_type": "product",
            "version": 1,
            "product": {
                "product_id": "prod-001",
                "name": "Night Serum",
                "category": "skincare",
                "batch_id": "B-42",
                "verified_at": "2026-01-01T00:00:00Z"
            },
            "cache_ttl": 86400
        })
    }

    fn resolver(server: &MockServer, timeout: Duration) -> HttpResolver {
        HttpResolver::new(format!("{}/api/v1/", server.uri()), "hash-123", "0.1.0", timeout).unwrap()
    }

    #[tokio::test]
    async fn test_success_sends_headers_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tokens/qr_ABCDEFGHIJKLMNOPQRST"))
            .and(header("X-Device-Hash", "hash-123"))
            .and(header("X-App-Version", "0.1.0"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("active")))
            .expect(1)
            .mount(&server)
            .await;

        let data = resolver(&server, Duration::from_secs(5))
            .resolve(&token())
            .await
            .unwrap();

        assert_eq!(data.product_id, "prod-001");
        assert_eq!(data.status, ProductStatus::Active);
        assert_eq!(data.ttl_secs, 86_400);
        assert_eq!(data.batch_id.as_deref(), Some("B-42"));
        assert!(data.description.is_none());
    }

    #[tokio::test]
    async fn test_revoked_status_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("revoked")))
            .mount(&server)
            .await;

        let data = resolver(&server, Duration::from_secs(5))
            .resolve(&token())
            .await
            .unwrap();
        assert_eq!(data.status, ProductStatus::Revoked);
    }

    #[tokio::test]
    async fn test_status_codes_are_classified() {
        let cases = [
            (404, RemoteError::NotFound),
            (410, RemoteError::Inactive),
            (429, RemoteError::RateLimited),
            (503, RemoteError::Unavailable),
            (500, RemoteError::ServerError(500)),
            (401, RemoteError::ServerError(401)),
        ];

        for (code, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;

            let err = resolver(&server, Duration::from_secs(5))
                .resolve(&token())
                .await
                .unwrap_err();
            assert_eq!(err, expected, "status {code}");
        }
    }

    #[tokio::test]
    async fn test_bad_body_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = resolver(&server, Duration::from_secs(5))
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::DecodingError(_)));
    }

    #[tokio::test]
    async fn test_unknown_vendor_status_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("quarantined")))
            .mount(&server)
            .await;

        let err = resolver(&server, Duration::from_secs(5))
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::DecodingError(msg) if msg.contains("quarantined")));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body("active"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = resolver(&server, Duration::from_millis(200))
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NetworkError(_)));
        assert!(err.should_enqueue());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Nothing listens on port 9 (discard) locally
        let resolver =
            HttpResolver::new("http://127.0.0.1:9", "hash", "0.1.0", Duration::from_secs(2)).unwrap();

        let err = resolver.resolve(&token()).await.unwrap_err();
        assert!(matches!(err, RemoteError::NetworkError(_)));
    }

    #[test]
    fn test_out_of_range_ttl_rejected() {
        for ttl in [-1, MAX_CACHE_TTL_SECS + 1, 9_000_000_000_000_000, i64::MAX] {
            let mut response: TokenResolutionResponse =
                serde_json::from_value(body("active")).unwrap();
            response.cache_ttl = ttl;
            assert!(matches!(
                response.into_product_data(),
                Err(RemoteError::DecodingError(_))
            ));
        }

        let mut response: TokenResolutionResponse =
            serde_json::from_value(body("active")).unwrap();
        response.cache_ttl = MAX_CACHE_TTL_SECS;
        assert_eq!(response.into_product_data().unwrap().ttl_secs, MAX_CACHE_TTL_SECS);
    }

    #[tokio::test]
    async fn test_huge_ttl_body_is_decoding_error() {
        let server = MockServer::start().await;
        let mut reply = body("active");
        reply["cache_ttl"] = json!(9_000_000_000_000_000_i64);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let err = resolver(&server, Duration::from_secs(5))
            .resolve(&token())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::DecodingError(_)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = HttpResolver::new("not a url", "hash", "0.1.0", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUrl(_)));
    }
}
