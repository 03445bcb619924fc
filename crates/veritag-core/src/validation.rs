//! # Validation Module
//!
//! Turns a scanned payload (QR code or deep link) into a canonical [`Token`].
//!
//! ## Validation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payload Validation                                 │
//! │                                                                         │
//! │  "https://verify.veritag.io/t/qr_ABCDEFGHIJKLMNOPQRST/"                │
//! │       │                                                                 │
//! │       ├── parse as URL            ✗ → MalformedUrl                     │
//! │       ├── scheme == https         ✗ → InvalidScheme                    │
//! │       ├── host == allowed host    ✗ → InvalidDomain (no subdomains)    │
//! │       ├── path is "/t" or "/t/"   ✓ → InvalidTokenFormat (no token)    │
//! │       ├── path starts with "/t/"  ✗ → InvalidPath                      │
//! │       ├── strip ONE trailing "/"                                        │
//! │       └── qr_ + 20..30 alnum      ✗ → InvalidTokenFormat               │
//! │                                                                         │
//! │  Pure and deterministic: same input → same output                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use veritag_core::validation::validate_payload;
//! use veritag_core::ValidationError;
//!
//! let err = validate_payload(
//!     "https://cdn.verify.veritag.io/t/qr_ABCDEFGHIJKLMNOPQRST",
//!     "verify.veritag.io",
//! )
//! .unwrap_err();
//!
//! assert!(matches!(err, ValidationError::InvalidDomain(_)));
//! ```

use url::Url;

use crate::error::ValidationError;
use crate::types::Token;
use crate::{PAYLOAD_PATH_PREFIX, TOKEN_BODY_MAX_LEN, TOKEN_BODY_MIN_LEN, TOKEN_PREFIX};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Payload Validator
// =============================================================================

/// Validates a scanned payload against the allow-listed host.
///
/// ## Arguments
/// * `raw_payload` - Arbitrary scanned text, not guaranteed to be a URI
/// * `allowed_host` - The single host whose links are accepted (exact match)
///
/// ## Returns
/// The token embedded in the link's `/t/<token>` path.
pub fn validate_payload(raw_payload: &str, allowed_host: &str) -> ValidationResult<Token> {
    let url = Url::parse(raw_payload.trim())
        .map_err(|e| ValidationError::MalformedUrl(e.to_string()))?;

    if url.scheme() != "https" {
        return Err(ValidationError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().unwrap_or_default();
    if !host.eq_ignore_ascii_case(allowed_host) {
        return Err(ValidationError::InvalidDomain(host.to_string()));
    }

    let path = url.path();
    let bare_prefix = PAYLOAD_PATH_PREFIX.trim_end_matches('/');
    if path == bare_prefix || path == PAYLOAD_PATH_PREFIX {
        return Err(ValidationError::InvalidTokenFormat(String::new()));
    }

    let Some(rest) = path.strip_prefix(PAYLOAD_PATH_PREFIX) else {
        return Err(ValidationError::InvalidPath(path.to_string()));
    };

    let candidate = rest.strip_suffix('/').unwrap_or(rest);
    Token::parse(candidate)
}

// =============================================================================
// Token Validator
// =============================================================================

/// Validates a bare token string.
///
/// ## Rules
/// - Starts with `qr_`
/// - Followed by 20 to 30 ASCII letters or digits, nothing else
///
/// ## Example
/// ```rust
/// use veritag_core::validation::validate_token;
///
/// assert!(validate_token("qr_ABCDEFGHIJKLMNOPQRST").is_ok());
/// assert!(validate_token("qr_ABCDEFGHIJ-KLMNOPQRST").is_err());
/// assert!(validate_token("QR_ABCDEFGHIJKLMNOPQRST").is_err());
/// ```
pub fn validate_token(candidate: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidTokenFormat(candidate.to_string());

    let body = candidate.strip_prefix(TOKEN_PREFIX).ok_or_else(invalid)?;

    if !(TOKEN_BODY_MIN_LEN..=TOKEN_BODY_MAX_LEN).contains(&body.len()) {
        return Err(invalid());
    }

    if !body.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "verify.veritag.io";
    const TOKEN: &str = "qr_ABCDEFGHIJKLMNOPQRST";

    fn link(path: &str) -> String {
        format!("https://{}{}", HOST, path)
    }

    #[test]
    fn test_valid_link_returns_token() {
        let token = validate_payload(&link("/t/qr_ABCDEFGHIJKLMNOPQRST"), HOST).unwrap();
        assert_eq!(token.as_str(), TOKEN);
    }

    #[test]
    fn test_trailing_slash_invariance() {
        for body_len in [20, 25, 30] {
            let token = format!("qr_{}", "a1B2".repeat(8)[..body_len].to_string());
            let plain = validate_payload(&link(&format!("/t/{}", token)), HOST).unwrap();
            let slashed = validate_payload(&link(&format!("/t/{}/", token)), HOST).unwrap();
            assert_eq!(plain, slashed);
            assert_eq!(plain.as_str(), token);
        }
    }

    #[test]
    fn test_only_one_trailing_slash_is_stripped() {
        let err = validate_payload(&link("/t/qr_ABCDEFGHIJKLMNOPQRST//"), HOST).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTokenFormat(_)));
    }

    #[test]
    fn test_malformed_payloads() {
        for raw in ["", "qr_ABCDEFGHIJKLMNOPQRST", "not a link", "https://"] {
            let err = validate_payload(raw, HOST).unwrap_err();
            assert!(
                matches!(err, ValidationError::MalformedUrl(_)),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_scheme_must_be_https() {
        let err = validate_payload(&format!("http://{}/t/{}", HOST, TOKEN), HOST).unwrap_err();
        assert_eq!(err, ValidationError::InvalidScheme("http".into()));

        let err = validate_payload("veritag://open/t/qr_ABCDEFGHIJKLMNOPQRST", HOST).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidScheme(_)));
    }

    #[test]
    fn test_other_domains_rejected() {
        for host in [
            "evil.example",
            "cdn.verify.veritag.io",
            "verify.veritag.io.evil.example",
            "veritag.io",
        ] {
            let err = validate_payload(&format!("https://{}/t/{}", host, TOKEN), HOST).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidDomain(_)),
                "{host} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_path_rules() {
        let err = validate_payload(&link("/p/qr_ABCDEFGHIJKLMNOPQRST"), HOST).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPath(_)));

        let err = validate_payload(&link("/"), HOST).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPath(_)));

        // Prefix present but no token
        for path in ["/t", "/t/"] {
            let err = validate_payload(&link(path), HOST).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidTokenFormat(_)));
        }

        // Nested segments are not a token
        let err = validate_payload(&link("/t/qr_ABCDEFGHIJKLMNOPQRST/extra"), HOST).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTokenFormat(_)));
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let token = validate_payload(&link("/t/qr_ABCDEFGHIJKLMNOPQRST?src=box#top"), HOST).unwrap();
        assert_eq!(token.as_str(), TOKEN);
    }

    #[test]
    fn test_validate_token_lengths() {
        assert!(validate_token(&format!("qr_{}", "A".repeat(19))).is_err());
        assert!(validate_token(&format!("qr_{}", "A".repeat(20))).is_ok());
        assert!(validate_token(&format!("qr_{}", "A".repeat(30))).is_ok());
        assert!(validate_token(&format!("qr_{}", "A".repeat(31))).is_err());
    }

    #[test]
    fn test_validate_token_charset() {
        assert!(validate_token("qr_abcdefghij0123456789").is_ok());
        assert!(validate_token("qr_abcdefghij_123456789").is_err());
        assert!(validate_token("qr_abcdéfghij0123456789").is_err());
        assert!(validate_token("xx_abcdefghij0123456789").is_err());
        assert!(validate_token("").is_err());
    }

    #[test]
    fn test_deterministic() {
        let raw = link("/t/qr_ABCDEFGHIJKLMNOPQRST/");
        assert_eq!(validate_payload(&raw, HOST), validate_payload(&raw, HOST));
    }
}
