// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare implementation of `zonesync_core::DnsProvider`.
//
// ## Behavior
//
// - Lists every A-record of the zone, following pagination
// - Applies creates and deletes in ONE request to the batch endpoint
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 429, 5xx)
// - A batch reported as unsuccessful is an error, even on a 2xx status
// - Dry-run mode for safe testing
// - Zone auto-discovery from the managed suffix, or explicit zone ID
// - No retry, backoff or caching: a failed run is recomputed by the next one
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&page=..&per_page=..`
// - Batch DNS Records: POST `/zones/:zone_id/dns_records/batch`
// - List Zones: GET `/zones?name=...`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use zonesync_core::model::RECORD_TYPE_A;
use zonesync_core::{
    BatchOutcome, BatchRequest, DnsProvider, Error, ObservedRecord, ProviderConfig, Result,
};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing the zone
const LIST_PAGE_SIZE: u32 = 100;

const PROVIDER: &str = "cloudflare";

/// Cloudflare API response envelope
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CloudflareMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// `result` of a batch call
#[derive(Debug, Default, Deserialize)]
struct BatchResult {
    #[serde(default)]
    posts: Vec<ObservedRecord>,
    #[serde(default)]
    deletes: Vec<DeletedRecord>,
}

#[derive(Debug, Deserialize)]
struct DeletedRecord {
    id: String,
}

fn join_errors(errors: &[CloudflareMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a non-2xx response to an error
fn status_error(status: StatusCode, body: &str, action: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", action, body)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", action, status, body)),
    }
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: every call is one API round trip (plus zone
/// discovery when no zone ID is configured).
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended batch payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, auto-detected from `domain`)
    zone_id: Option<String>,

    /// Account ID (optional, narrows zone lookup)
    account_id: Option<String>,

    /// Domain used for zone auto-discovery (the managed suffix)
    domain: String,

    /// API base URL
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip the batch call
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("account_id", &self.account_id)
            .field("domain", &self.domain)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (auto-detected from `domain` otherwise)
    /// - `account_id`: Optional account ID
    /// - `domain`: Managed suffix, used for zone auto-discovery
    /// - `dry_run`: If true, perform reads but skip the batch call
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        account_id: Option<String>,
        domain: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            account_id,
            domain: domain.into(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration
    ///
    /// Dry-run mode is enabled when `ZONESYNC_MODE=dry-run`.
    pub fn from_config(config: &ProviderConfig, domain: &str) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                account_id,
            } => {
                let dry_run = std::env::var("ZONESYNC_MODE")
                    .unwrap_or_default()
                    .to_lowercase()
                    == "dry-run";

                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Self::new(
                    api_token.clone(),
                    zone_id.clone(),
                    account_id.clone(),
                    domain,
                    dry_run,
                )
            }
        }
    }

    /// Point the provider at a different API base URL (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether batch submission is skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Get the zone ID
    ///
    /// If zone_id is set, returns it directly. Otherwise, tries progressively
    /// shorter suffixes of the managed domain until a zone with exactly that
    /// name is found ("lab.internal.example" → "internal.example" → "example").
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=internal.example
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            return Ok(zone_id.clone());
        }

        let labels: Vec<&str> = self.domain.split('.').collect();
        for i in 0..labels.len() {
            let zone_name = labels[i..].join(".");
            tracing::debug!("Looking up zone ID for: {}", zone_name);

            let mut request = self
                .client
                .get(format!("{}/zones", self.base_url))
                .bearer_auth(&self.api_token)
                .query(&[("name", zone_name.as_str())]);
            if let Some(ref account_id) = self.account_id {
                request = request.query(&[("account.id", account_id.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::http(format!("Zone lookup request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(status_error(status, &body, "Zone lookup"));
            }

            let body: CloudflareResponse<Vec<Zone>> = response
                .json()
                .await
                .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
            if !body.success {
                return Err(Error::provider(
                    PROVIDER,
                    format!("Zone lookup failed: {}", join_errors(&body.errors)),
                ));
            }

            if let Some(zone) = body
                .result
                .unwrap_or_default()
                .into_iter()
                .find(|z| z.name == zone_name)
            {
                tracing::debug!("Found zone ID: {}", zone.id);
                return Ok(zone.id);
            }
        }

        Err(Error::not_found(format!("No zone found for {}", self.domain)))
    }

    /// Fetch one page of A-records
    ///
    /// # Returns
    ///
    /// The records on the page and the total number of pages
    async fn list_page(&self, zone_id: &str, page: u32) -> Result<(Vec<ObservedRecord>, u32)> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let page_param = page.to_string();
        let per_page = LIST_PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[
                ("type", RECORD_TYPE_A),
                ("page", page_param.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::http(format!("Record listing request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &body, "Record listing"));
        }

        let body: CloudflareResponse<Vec<ObservedRecord>> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        if !body.success {
            return Err(Error::provider(
                PROVIDER,
                format!("Record listing failed: {}", join_errors(&body.errors)),
            ));
        }

        let total_pages = body
            .result_info
            .map(|info| info.total_pages.max(info.page))
            .unwrap_or(page);
        Ok((body.result.unwrap_or_default(), total_pages))
    }

    fn dry_run_outcome(&self, batch: &BatchRequest) -> BatchOutcome {
        BatchOutcome {
            created: batch
                .posts
                .iter()
                .enumerate()
                .map(|(i, post)| {
                    let mut record =
                        ObservedRecord::a(format!("dry-run-{}", i), &post.name, &post.content);
                    record.ttl = Some(post.ttl);
                    record.proxied = Some(post.proxied);
                    record
                })
                .collect(),
            deleted: batch.deletes.iter().map(|d| d.id.clone()).collect(),
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every A-record in the zone
    ///
    /// # API Calls
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&page=1&per_page=100
    /// GET /zones/:zone_id/dns_records?type=A&page=2&per_page=100
    /// ...
    /// ```
    async fn list_records(&self) -> Result<Vec<ObservedRecord>> {
        let zone_id = self.zone_id().await?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let (mut batch, total_pages) = self.list_page(&zone_id, page).await?;
            let empty = batch.is_empty();
            records.append(&mut batch);

            if empty || page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} A-record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    /// Submit creates and deletes in one call
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records/batch
    /// {
    ///   "posts": [{"type": "A", "name": "...", "content": "...", "ttl": 3600, "proxied": false}],
    ///   "deletes": [{"id": "..."}]
    /// }
    /// ```
    async fn apply_batch(&self, batch: &BatchRequest) -> Result<BatchOutcome> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let zone_id = self.zone_id().await?;
        let url = format!("{}/zones/{}/dns_records/batch", self.base_url, zone_id);

        tracing::info!(
            "Submitting batch to Cloudflare: {} post(s), {} delete(s) [mode: {}]",
            batch.posts.len(),
            batch.deletes.len(),
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(batch)?
            );
            return Ok(self.dry_run_outcome(batch));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(batch)
            .send()
            .await
            .map_err(|e| Error::http(format!("Batch request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return match status.as_u16() {
                409 => Err(Error::provider(
                    PROVIDER,
                    format!("Conflict: batch conflicts with existing records. Status: {} - {}", status, body),
                )),
                _ => Err(status_error(status, &body, "Batch")),
            };
        }

        let body: CloudflareResponse<BatchResult> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        if !body.success || !body.errors.is_empty() {
            return Err(Error::provider(
                PROVIDER,
                format!("Batch rejected: {}", join_errors(&body.errors)),
            ));
        }

        let result = body.result.unwrap_or_default();
        Ok(BatchOutcome {
            created: result.posts,
            deleted: result.deletes.into_iter().map(|d| d.id).collect(),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
