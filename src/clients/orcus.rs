//! Client for the orcus cluster-sync service, which reports its counters as
//! one flat JSON object.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;
use url::Url;

use crate::clients::ClientError;

/// One decoded set of orcus sync counters. Produced fresh on every
/// [`OrcusClient::fetch_metrics`] call, never cached.
///
/// Field names follow the upstream service's JSON keys; fields the service
/// omits decode to zero.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct OrcusMetrics {
    pub last_sync_duration_seconds: f64,
    pub total_sync_clusters: u64,
    pub total_sync_errors: u64,
    pub total_sync_count: u64,
}

/// Client for the orcus metrics endpoint.
pub struct OrcusClient {
    api_endpoint: Url,
    http: reqwest::Client,
}

impl OrcusClient {
    /// Creates an `OrcusClient`, fetching the metrics once as a self-check.
    ///
    /// # Errors
    ///
    /// Fails if the initial fetch fails or does not decode.
    pub async fn new(http: reqwest::Client, api_endpoint: Url) -> Result<Self, ClientError> {
        let client = Self { api_endpoint, http };
        client.fetch_metrics().await?;
        Ok(client)
    }

    /// Fetches and decodes the orcus counters.
    ///
    /// # Errors
    ///
    /// `Connect` on transport failure, `Status` on non-200, `Decode` when the
    /// body is not the expected flat JSON object.
    #[instrument(skip(self), level = "debug", err, fields(backend = "orcus"))]
    pub async fn fetch_metrics(&self) -> Result<OrcusMetrics, ClientError> {
        let url = self.api_endpoint.as_str();

        let span = info_span!("backend.request", otel.kind = "client", http.url = %url);
        let response = self
            .http
            .get(self.api_endpoint.clone())
            .send()
            .instrument(span)
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|err| ClientError::Decode {
            endpoint: url.to_string(),
            reason: err.to_string(),
        })
    }
}
