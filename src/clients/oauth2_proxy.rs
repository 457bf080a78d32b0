//! Liveness client for the oauth2_proxy auth gateway. The gateway exposes no
//! status payload worth decoding; reaching its ping endpoint with a 200 *is*
//! the metric.

use reqwest::StatusCode;
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;
use url::Url;

use crate::clients::ClientError;

/// Client for the oauth2_proxy ping endpoint.
pub struct Oauth2ProxyClient {
    api_endpoint: Url,
    http: reqwest::Client,
}

impl Oauth2ProxyClient {
    /// Creates an `Oauth2ProxyClient`, probing the endpoint once.
    ///
    /// # Errors
    ///
    /// Fails if the initial probe does not return 200 OK.
    pub async fn new(http: reqwest::Client, api_endpoint: Url) -> Result<Self, ClientError> {
        let client = Self { api_endpoint, http };
        client.probe().await?;
        Ok(client)
    }

    /// Issues one GET against the ping endpoint, requiring 200 OK. The body
    /// is drained and discarded.
    ///
    /// # Errors
    ///
    /// `Connect` on transport failure, `Status` on a non-200 response.
    #[instrument(skip(self), level = "debug", err, fields(backend = "oauth2_proxy"))]
    pub async fn probe(&self) -> Result<(), ClientError> {
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

        response
            .bytes()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        Ok(())
    }
}
