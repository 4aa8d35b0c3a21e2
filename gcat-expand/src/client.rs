//! ArcGIS REST Client
//!
//! Fetches the `pjson` representation of a root service (layer listing) and
//! of individual layers (metadata).
//!
//! # Failure model
//! Every failure (transport error, timeout, non-2xx status, non-JSON body, or
//! an ArcGIS `{"error": ...}` body) is soft: the attempt is retried with
//! linear backoff and the call finally yields `None`. Callers only need the
//! success/absent distinction because every call site has one fallback.
//!
//! # API Reference
//! - Service listing: `<base>?f=pjson`
//! - Layer metadata: `<base>/<layerId>?f=pjson`

use crate::config::ExpandConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Reason a single fetch attempt failed
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("response is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("service returned error: {0}")]
    Service(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// One entry of a service's `layers` or `tables` listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerDescriptor {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "geometryType", default)]
    pub geometry_type: Option<String>,
    #[serde(rename = "subLayerIds", default)]
    pub sub_layer_ids: Option<Vec<i64>>,
    /// Listed under `tables` rather than `layers`
    #[serde(skip)]
    pub is_table: bool,
}

impl LayerDescriptor {
    /// Layer id, defaulting to 0 when the listing omits it
    pub fn layer_id(&self) -> i64 {
        self.id.unwrap_or(0)
    }

    /// Group layers contain other layers and have no geometry of their own
    pub fn is_group(&self) -> bool {
        self.sub_layer_ids
            .as_ref()
            .is_some_and(|ids| !ids.is_empty())
    }
}

/// Root service descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Passed through unexamined
    pub spatial_reference: Option<Value>,
    /// `layers` followed by `tables`, in listing order
    pub layers: Vec<LayerDescriptor>,
}

/// Metadata of one layer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LayerMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "geometryType", default)]
    pub geometry_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// "Feature Layer", "Table", "Raster Layer", ...
    #[serde(rename = "type", default)]
    pub layer_type: Option<String>,
}

/// Source of service listings and layer metadata
///
/// The HTTP implementation is [`ArcGisClient`]; tests substitute a scripted
/// source.
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// Fetch the root service listing, `None` on any failure
    async fn fetch_service_info(&self, base_url: &str) -> Option<ServiceInfo>;

    /// Fetch one layer's metadata, `None` on any failure
    async fn fetch_layer_metadata(&self, base_url: &str, layer_id: i64) -> Option<LayerMetadata>;
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "mapName", default)]
    map_name: Option<String>,
    #[serde(rename = "serviceDescription", default)]
    service_description: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "spatialReference", default)]
    spatial_reference: Option<Value>,
    #[serde(default)]
    layers: Option<Vec<LayerDescriptor>>,
    #[serde(default)]
    tables: Option<Vec<LayerDescriptor>>,
}

impl From<ServiceResponse> for ServiceInfo {
    fn from(response: ServiceResponse) -> Self {
        let mut layers = response.layers.unwrap_or_default();
        layers.extend(response.tables.unwrap_or_default().into_iter().map(|mut table| {
            table.is_table = true;
            table
        }));

        Self {
            name: non_empty(response.name).or_else(|| non_empty(response.map_name)),
            description: non_empty(response.service_description)
                .or_else(|| non_empty(response.description)),
            spatial_reference: response.spatial_reference,
            layers,
        }
    }
}

/// Treat an explicit `null` like a missing value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Append the `f=pjson` format parameter
pub fn pjson_url(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}f=pjson", url, separator)
}

/// HTTP client for ArcGIS REST services
pub struct ArcGisClient {
    http_client: Client,
    request_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ArcGisClient {
    pub fn new(config: &ExpandConfig) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// GET `url` as pjson, retrying with linear backoff
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        let attempts = self.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(url, attempt, "Fetch succeeded after retry");
                    }
                    return Some(value);
                }
                Err(e) if attempt < attempts => {
                    let backoff = self.retry_backoff.saturating_mul(attempt);
                    warn!(
                        url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Fetch failed, will retry after backoff"
                    );
                    sleep(backoff).await;
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Fetch failed, giving up");
                }
            }
        }

        None
    }

    /// One bounded attempt: request, status check, body, JSON parse
    async fn attempt(&self, url: &str) -> Result<Value, ClientError> {
        let request = async {
            let response = self.http_client.get(pjson_url(url)).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::Status(status));
            }

            let body = response.text().await?;
            let value: Value = serde_json::from_str(&body)?;

            if let Some(error) = value.get("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(ClientError::Service(message));
            }

            Ok::<_, ClientError>(value)
        };

        timeout(self.request_timeout, request)
            .await
            .map_err(|_| ClientError::Timeout(self.request_timeout))?
    }
}

#[async_trait]
impl LayerSource for ArcGisClient {
    async fn fetch_service_info(&self, base_url: &str) -> Option<ServiceInfo> {
        debug!(base_url, "Fetching service listing");

        let value = self.fetch_json(base_url).await?;
        match serde_json::from_value::<ServiceResponse>(value) {
            Ok(response) => Some(response.into()),
            Err(e) => {
                warn!(base_url, error = %e, "Unexpected service listing shape");
                None
            }
        }
    }

    async fn fetch_layer_metadata(&self, base_url: &str, layer_id: i64) -> Option<LayerMetadata> {
        let url = format!("{}/{}", base_url, layer_id);
        debug!(url = %url, "Fetching layer metadata");

        let value = self.fetch_json(&url).await?;
        match serde_json::from_value::<LayerMetadata>(value) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(url = %url, error = %e, "Unexpected layer metadata shape");
                None
            }
        }
    }
}

// ============================================================================
// Scripted source for testing
// ============================================================================
