//! Configuration types for the zonesync system
//!
//! This module defines all configuration structures used throughout the crate.
//! The reconciler only ever sees the suffix; credentials stay with the
//! collaborators that need them.

use serde::{Deserialize, Serialize};

/// Main zonesync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Managed DNS suffix (e.g., "internal.example"), without leading dot
    pub suffix: String,

    /// Inventory source configuration
    pub inventory: InventoryConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Validate the configuration
    ///
    /// Fails on missing credentials or a malformed suffix, before any
    /// network call is made.
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_suffix(&self.suffix)?;
        self.inventory.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Inventory source configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryConfig {
    /// HTTP devices API
    Http {
        /// API base URL
        base_url: String,
        /// Account whose devices are listed
        account: String,
        /// API key
        api_key: String,
    },
}

impl InventoryConfig {
    /// Validate the inventory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            InventoryConfig::Http {
                base_url,
                account,
                api_key,
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("Inventory base URL cannot be empty"));
                }
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Inventory base URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if account.is_empty() {
                    return Err(crate::Error::config("Inventory account cannot be empty"));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("Inventory API key cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryConfig::Http {
                base_url, account, ..
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("account", account)
                .field("api_key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, auto-detected from the suffix)
        zone_id: Option<String>,
        /// Account ID (optional, narrows zone auto-detection)
        account_id: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, zone_id, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_id.as_deref().is_some_and(str::is_empty) {
                    return Err(crate::Error::config("Cloudflare zone ID cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                account_id,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .field("account_id", account_id)
                .finish(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Serialize runs of the same engine
    ///
    /// An on-demand run that overlaps a scheduled one waits for it instead
    /// of computing the same diff and submitting it twice. Correctness does
    /// not depend on this; it only saves duplicate provider calls.
    #[serde(default = "default_serialize_runs")]
    pub serialize_runs: bool,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 256 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serialize_runs: default_serialize_runs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_serialize_runs() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Validate that a string is usable as the managed suffix
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
pub fn validate_suffix(suffix: &str) -> Result<(), crate::Error> {
    if suffix.is_empty() {
        return Err(crate::Error::config("DNS suffix cannot be empty"));
    }

    if suffix.starts_with('.') || suffix.ends_with('.') {
        return Err(crate::Error::config(format!(
            "DNS suffix must not start or end with a dot. Got: '{}'",
            suffix
        )));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if suffix.len() > 253 {
        return Err(crate::Error::config(format!(
            "DNS suffix too long: {} chars (max 253). Got: {}",
            suffix.len(),
            suffix
        )));
    }

    for label in suffix.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "DNS suffix has empty label: '{}'",
                suffix
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "DNS suffix label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "DNS suffix label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "DNS suffix label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(suffix: &str) -> SyncConfig {
        SyncConfig {
            suffix: suffix.to_string(),
            inventory: InventoryConfig::Http {
                base_url: "https://inventory.example/api/v2".to_string(),
                account: "acme".to_string(),
                api_key: "inventory-key".to_string(),
            },
            provider: ProviderConfig::Cloudflare {
                api_token: "cf-token".to_string(),
                zone_id: Some("zone123".to_string()),
                account_id: None,
            },
            engine: EngineConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config("internal.example").validate().is_ok());
        assert!(config("lab-1.internal.example").validate().is_ok());
    }

    #[test]
    fn malformed_suffix_is_rejected() {
        for suffix in ["", ".internal.example", "internal.example.", "a..b", "-a.b", "a_b.c"] {
            assert!(
                config(suffix).validate().is_err(),
                "suffix '{}' should be rejected",
                suffix
            );
        }
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let mut cfg = config("internal.example");
        cfg.provider = ProviderConfig::Cloudflare {
            api_token: String::new(),
            zone_id: None,
            account_id: None,
        };
        assert!(matches!(cfg.validate(), Err(crate::Error::Config(_))));

        let mut cfg = config("internal.example");
        cfg.inventory = InventoryConfig::Http {
            base_url: "https://inventory.example".to_string(),
            account: "acme".to_string(),
            api_key: String::new(),
        };
        assert!(matches!(cfg.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn engine_defaults_apply_when_omitted() {
        let json = serde_json::json!({
            "suffix": "internal.example",
            "inventory": {
                "type": "http",
                "base_url": "https://inventory.example",
                "account": "acme",
                "api_key": "k",
            },
            "provider": {
                "type": "cloudflare",
                "api_token": "t",
                "zone_id": null,
                "account_id": null,
            },
        });
        let cfg: SyncConfig = serde_json::from_value(json).unwrap();
        assert!(cfg.engine.serialize_runs);
        assert_eq!(cfg.engine.event_channel_capacity, 256);
        assert_eq!(cfg.provider.type_name(), "cloudflare");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let debug = format!("{:?}", config("internal.example"));
        assert!(!debug.contains("cf-token"));
        assert!(!debug.contains("inventory-key"));
        assert!(debug.contains("<REDACTED>"));
    }
}
