//! Backend clients: one per monitored service, each owning its own
//! connection handle (HTTP client or MySQL pool). A client is built once at
//! startup through [`create_with_retries`] and lives for the process
//! lifetime; its constructor performs a single self-check call against the
//! backend and fails construction if the backend cannot be reached.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

pub mod oauth2_proxy;
pub mod orcus;
pub mod orchestrator;
pub mod xtradb;

pub use oauth2_proxy::Oauth2ProxyClient;
pub use orcus::{OrcusClient, OrcusMetrics};
pub use orchestrator::{OrchestratorClient, OrchestratorMetrics};
pub use xtradb::{XtradbClient, XtradbMetrics};

/// Errors produced by backend clients.
///
/// `Config` is a credentials/TLS-material problem and is never retried;
/// everything else is a connectivity-class failure that the bootstrap retry
/// loop may try again.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client configuration in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("failed to get {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("expected 200 OK from {url}, got {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("status query for {variable:?} failed: {source}")]
    Query {
        variable: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl ClientError {
    /// Configuration errors are fatal at bootstrap and bypass the retry loop.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Builds a backend client, retrying on failure.
///
/// Calls `factory` up to `retries + 1` times, sleeping `interval` after every
/// failed attempt except the last. `retries = 0` means exactly one attempt.
/// Returns the first successfully built client, or the last attempt's error.
/// A [`ClientError::Config`] is returned immediately without further
/// attempts.
///
/// This is the only place the process deliberately blocks waiting on a
/// backend; it runs once per enabled backend at startup.
///
/// # Errors
///
/// Returns the final attempt's error once the retry budget is exhausted.
pub async fn create_with_retries<T, F, Fut>(
    service: &str,
    factory: F,
    retries: u32,
    interval: Duration,
) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match factory().await {
            Ok(client) => return Ok(client),
            Err(err) if err.is_config() => return Err(err),
            Err(err) => {
                if attempt >= retries {
                    return Err(err);
                }
                attempt += 1;
                warn!(
                    service,
                    error = %err,
                    retry_in = ?interval,
                    "could not create client, retrying"
                );
                sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky_factory(
        failures: u32,
        attempts: Arc<AtomicU32>,
    ) -> impl Fn() -> std::future::Ready<Result<&'static str, ClientError>> {
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < failures {
                Err(ClientError::Decode {
                    endpoint: "http://backend/metrics".to_string(),
                    reason: "not yet up".to_string(),
                })
            } else {
                Ok("client")
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_failures_with_k_sleeps() {
        let attempts = Arc::new(AtomicU32::new(0));
        let interval = Duration::from_secs(5);

        let before = tokio::time::Instant::now();
        let client =
            create_with_retries("orcus", flaky_factory(3, attempts.clone()), 5, interval).await;

        assert_eq!(client.ok(), Some("client"));
        // k failures then success: k+1 attempts, k sleeps
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(before.elapsed(), interval * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let interval = Duration::from_secs(5);

        let before = tokio::time::Instant::now();
        let result =
            create_with_retries("orcus", flaky_factory(u32::MAX, attempts.clone()), 2, interval)
                .await;

        assert!(matches!(result, Err(ClientError::Decode { .. })));
        // budget N: N+1 attempts, N sleeps
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(before.elapsed(), interval * 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = create_with_retries(
            "orcus",
            flaky_factory(u32::MAX, attempts.clone()),
            0,
            Duration::from_secs(5),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let attempts = Arc::new(AtomicU32::new(0));

        let client = create_with_retries(
            "orcus",
            flaky_factory(0, attempts.clone()),
            5,
            Duration::from_secs(5),
        )
        .await;

        assert!(client.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn config_error_bypasses_retry_budget() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in_factory = attempts.clone();

        let result: Result<(), ClientError> = create_with_retries(
            "xtradb_cluster",
            move || {
                attempts_in_factory.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(ClientError::Config {
                    path: PathBuf::from("/etc/my.cnf"),
                    reason: "no user or password under [client]".to_string(),
                }))
            },
            5,
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(ClientError::Config { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
