//! Client for the orchestrator topology-management API. One metrics fetch
//! aggregates four sub-resources of the base API endpoint; if any of them
//! fails, the whole fetch fails and no partial snapshot is produced.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;
use url::Url;

use crate::clients::ClientError;

/// Health section of the orchestrator status response. Fields the service
/// omits decode to their zero values, as the upstream consumers assume.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct HealthStatus {
    details: HealthDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct HealthDetails {
    healthy: bool,
    is_active_node: bool,
    available_nodes: Vec<serde_json::Value>,
}

/// One failover-audit record. Only the id is consumed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct FailoverAudit {
    pub(crate) id: i64,
}

/// One failed-seed record. Only its presence in the list is consumed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FailedSeed {
    #[allow(dead_code)]
    seed_id: i64,
}

/// One aggregated orchestrator snapshot, produced fresh on every
/// [`OrchestratorClient::fetch_metrics`] call.
#[derive(Debug, PartialEq, Eq)]
pub struct OrchestratorMetrics {
    pub healthy: bool,
    pub is_active_node: bool,
    /// Number of entries in the status response's available-nodes list.
    pub available_nodes: usize,
    /// Number of clusters the orchestrator currently reports problems for.
    /// Problem elements are opaque upstream; only the count is meaningful.
    pub problems: usize,
    /// Highest id across the failover-audit list, 0 when the list is empty.
    pub last_failover_id: i64,
    /// Number of entries in the failed-seed list.
    pub failed_seeds: usize,
}

/// Client for the orchestrator API.
pub struct OrchestratorClient {
    api_endpoint: Url,
    http: reqwest::Client,
}

impl OrchestratorClient {
    /// Creates an `OrchestratorClient`, fetching one full snapshot as a
    /// self-check.
    ///
    /// # Errors
    ///
    /// Fails if any of the four sub-requests fails.
    pub async fn new(http: reqwest::Client, api_endpoint: Url) -> Result<Self, ClientError> {
        let client = Self { api_endpoint, http };
        client.fetch_metrics().await?;
        Ok(client)
    }

    /// Fetches the four sub-resources and derives one flat snapshot.
    ///
    /// # Errors
    ///
    /// The first failing sub-request (transport, non-200, or decode) aborts
    /// the whole call; no partial snapshot is observable.
    #[instrument(skip(self), level = "debug", err, fields(backend = "orchestrator"))]
    pub async fn fetch_metrics(&self) -> Result<OrchestratorMetrics, ClientError> {
        let status: HealthStatus = self.get_json("/status").await?;
        let problems: Vec<serde_json::Value> = self.get_json("/problems").await?;
        let failovers: Vec<FailoverAudit> = self.get_json("/audit-failure-detection").await?;
        let failed_seeds: Vec<FailedSeed> = self.get_json("/agents-failed-seeds").await?;

        Ok(OrchestratorMetrics {
            healthy: status.details.healthy,
            is_active_node: status.details.is_active_node,
            available_nodes: status.details.available_nodes.len(),
            problems: problems.len(),
            last_failover_id: last_failover_id(&failovers),
            failed_seeds: failed_seeds.len(),
        })
    }

    fn sub_resource(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.api_endpoint.as_str().trim_end_matches('/'),
            path
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.sub_resource(path);

        let span = info_span!("backend.request", otel.kind = "client", http.url = %url);
        let response = self
            .http
            .get(url.as_str())
            .send()
            .instrument(span)
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::Status {
                url,
                status: response.status(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|err| ClientError::Decode {
            endpoint: url,
            reason: err.to_string(),
        })
    }
}

/// Highest failover id seen in the audit list; 0 for an empty list. Ties are
/// irrelevant, only the maximum value matters.
fn last_failover_id(failovers: &[FailoverAudit]) -> i64 {
    failovers.iter().map(|f| f.id).fold(0, i64::max)
}
