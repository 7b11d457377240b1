// # HTTP Inventory Source
//
// This crate provides an HTTP devices-API implementation of
// `zonesync_core::InventorySource`.
//
// ## Architecture
//
// One GET per sync run against `{base_url}/tailnet/{account}/devices`,
// authenticated with a bearer API key. Each device becomes a `Target`:
// its hostname, and the first of its addresses that parses as IPv4.
//
// Devices without an IPv4 address are still returned. The reconciler
// decides what to do with incomplete targets.
//
// ## Security
//
// - The API key never appears in logs or Debug output

use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;
use zonesync_core::{Error, InventoryConfig, InventorySource, Result, Target};

/// Default HTTP timeout for inventory requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body of the devices endpoint
#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Device {
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    addresses: Vec<String>,
}

impl From<Device> for Target {
    fn from(device: Device) -> Self {
        let ipv4 = device
            .addresses
            .iter()
            .find(|addr| addr.parse::<Ipv4Addr>().is_ok())
            .cloned();

        Target {
            hostname: device.hostname,
            ipv4,
        }
    }
}

/// Inventory source backed by an HTTP devices API
pub struct HttpInventorySource {
    /// API base URL, without trailing slash
    base_url: String,

    /// Account whose devices are listed
    account: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for HttpInventorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInventorySource")
            .field("base_url", &self.base_url)
            .field("account", &self.account)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl HttpInventorySource {
    /// Create a new HTTP inventory source
    ///
    /// # Parameters
    ///
    /// - `base_url`: API base URL (e.g., "https://api.tailscale.com/api/v2")
    /// - `account`: Account whose devices are listed
    /// - `api_key`: Bearer API key
    pub fn new(
        base_url: impl Into<String>,
        account: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Inventory API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account: account.into(),
            api_key,
            client,
        })
    }

    /// Create an inventory source from configuration
    pub fn from_config(config: &InventoryConfig) -> Result<Self> {
        config.validate()?;
        match config {
            InventoryConfig::Http {
                base_url,
                account,
                api_key,
            } => Self::new(base_url.clone(), account.clone(), api_key.clone()),
        }
    }

    fn devices_url(&self) -> String {
        format!("{}/tailnet/{}/devices", self.base_url, self.account)
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    async fn targets(&self) -> Result<Vec<Target>> {
        let response = self
            .client
            .get(self.devices_url())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::inventory(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::inventory(format!("HTTP error: {} - {}", status, body)));
        }

        let body: DevicesResponse = response
            .json()
            .await
            .map_err(|e| Error::inventory(format!("Failed to parse response: {}", e)))?;

        let targets: Vec<Target> = body.devices.into_iter().map(Target::from).collect();
        tracing::debug!("Inventory returned {} device(s)", targets.len());
        Ok(targets)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
