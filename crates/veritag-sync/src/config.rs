//! # Veritag Configuration
//!
//! Configuration management for the resolution engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VERITAG_BASE_URL=https://staging.veritag.io/api/v1                 │
//! │     VERITAG_DEVICE_ID=abc-123                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/veritag/veritag.toml (Linux)                             │
//! │     ~/Library/Application Support/io.veritag.veritag/veritag.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     production service, 10s timeout, auto-generated device id          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! hash = "8f14e45fceea167a5a36dedd4bea2543"
//!
//! [remote]
//! base_url = "https://verify.veritag.io/api/v1"
//! allowed_host = "verify.veritag.io"
//! app_version = "0.1.0"
//! timeout_secs = 10
//!
//! [storage]
//! database_path = "/var/lib/veritag/veritag.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use veritag_core::DEFAULT_ALLOWED_HOST;

use crate::error::{ResolveError, ResolveResult};

/// Per-call timeout for vendor lookups when none is configured.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Production resolution endpoint.
pub const DEFAULT_BASE_URL: &str = "https://verify.veritag.io/api/v1";

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of this device as presented to the vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Opaque value sent as the `X-Device-Hash` header.
    #[serde(default = "default_device_hash")]
    pub hash: String,
}

fn default_device_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            hash: default_device_hash(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Vendor resolution service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL; tokens are resolved at `<base_url>/tokens/<token>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// The only host a scanned link may point at.
    #[serde(default = "default_allowed_host")]
    pub allowed_host: String,

    /// Sent as the `X-App-Version` header.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Per-call timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_allowed_host() -> String {
    DEFAULT_ALLOWED_HOST.to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: default_base_url(),
            allowed_host: default_allowed_host(),
            app_version: default_app_version(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Local storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file; the platform data directory is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Veritag configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeritagConfig {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Vendor service settings.
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Local storage settings.
    #[serde(default)]
    pub storage: StorageSettings,
}

impl VeritagConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (veritag.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ResolveResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ResolveResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ResolveError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ResolveResult<()> {
        if self.device.id.is_empty() {
            return Err(ResolveError::MissingDeviceId);
        }

        let base = Url::parse(&self.remote.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ResolveError::InvalidUrl(format!(
                "Base URL must start with http:// or https://, got: {}",
                self.remote.base_url
            )));
        }

        if self.remote.allowed_host.trim().is_empty() {
            return Err(ResolveError::InvalidConfig(
                "allowed_host must not be empty".into(),
            ));
        }

        if self.remote.timeout_secs == 0 {
            return Err(ResolveError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("VERITAG_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(hash) = lookup("VERITAG_DEVICE_HASH") {
            self.device.hash = hash;
        }

        if let Some(url) = lookup("VERITAG_BASE_URL") {
            debug!(url = %url, "Overriding base URL from environment");
            self.remote.base_url = url;
        }

        if let Some(host) = lookup("VERITAG_ALLOWED_HOST") {
            debug!(host = %host, "Overriding allowed host from environment");
            self.remote.allowed_host = host;
        }

        if let Some(timeout) = lookup("VERITAG_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.remote.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric VERITAG_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = lookup("VERITAG_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("io", "veritag", "veritag")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("veritag.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns the per-call remote timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Returns the effective database path.
    ///
    /// Falls back to `veritag.db` in the working directory when the platform
    /// has no data directory.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("veritag.db")))
            .unwrap_or_else(|| PathBuf::from("veritag.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = VeritagConfig::default();
        assert!(!config.device.id.is_empty());
        assert!(!config.device.hash.is_empty());
        assert_eq!(config.remote.allowed_host, "verify.veritag.io");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = VeritagConfig::default();

        config.device.id = String::new();
        assert!(matches!(config.validate(), Err(ResolveError::MissingDeviceId)));

        config.device.id = "test".to_string();
        config.remote.base_url = "ftp://verify.veritag.io".to_string();
        assert!(matches!(config.validate(), Err(ResolveError::InvalidUrl(_))));

        config.remote.base_url = "not a url".to_string();
        assert!(config.validate().unwrap_err().is_config_error());

        config.remote.base_url = "http://localhost:8080/api".to_string();
        assert!(config.validate().is_ok());

        config.remote.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ResolveError::InvalidConfig(_))));

        config.remote.timeout_secs = 5;
        config.remote.allowed_host = "  ".to_string();
        assert!(matches!(config.validate(), Err(ResolveError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config: VeritagConfig = toml::from_str(
            r#"
            [device]
            id = "from-file"

            [remote]
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.base_url, DEFAULT_BASE_URL);

        let env: HashMap<&str, &str> = [
            ("VERITAG_DEVICE_ID", "from-env"),
            ("VERITAG_TIMEOUT_SECS", "3"),
            ("VERITAG_DB_PATH", "/tmp/veritag-test.db"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.device_id(), "from-env");
        assert_eq!(config.remote.timeout_secs, 3);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/veritag-test.db"));
    }

    #[test]
    fn test_bad_timeout_override_is_ignored() {
        let mut config = VeritagConfig::default();
        config.apply_overrides(|key| (key == "VERITAG_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(config.remote.timeout_secs, DEFAULT_REMOTE_TIMEOUT_SECS);
    }

    #[test]
    fn test_save_then_load_keeps_device_identity() {
        let dir = std::env::temp_dir().join(format!("veritag-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("veritag.toml");

        let mut config = VeritagConfig::default();
        config.remote.timeout_secs = 25;
        config.save(Some(path.clone())).unwrap();

        let loaded = VeritagConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.device.hash, config.device.hash);
        assert_eq!(loaded.remote.base_url, config.remote.base_url);
        assert_eq!(loaded.remote.timeout_secs, 25);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let config = VeritagConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[remote]"));

        let parsed: VeritagConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.device.id, config.device.id);
    }
}
