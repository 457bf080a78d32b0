#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;

use orcus_exporter::cli::actions::ExporterSettings;

/// Serves a fake backend on an ephemeral local port. Aborting the returned
/// handle drops the listener, so later requests get connection-refused.
pub async fn spawn_backend(router: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve fake backend");
    });

    (addr, handle)
}

pub fn backend_url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).expect("valid backend url")
}

/// HTTP client matching the exporter's shared-client shape.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("build http client")
}

/// oauth2_proxy fake: a bare 200 on /ping.
pub fn oauth2_proxy_router() -> Router {
    Router::new().route("/ping", get(|| async { "OK" }))
}

/// orcus fake with fixed counters.
pub fn orcus_router() -> Router {
    Router::new().route(
        "/metrics",
        get(|| async {
            Json(json!({
                "LastSyncDurationSeconds": 0.25,
                "TotalSyncClusters": 12,
                "TotalSyncErrors": 3,
                "TotalSyncCount": 120
            }))
        }),
    )
}

/// orcus fake that can be flipped unhealthy mid-test.
pub fn toggleable_orcus_router(healthy: Arc<AtomicBool>) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let healthy = healthy.clone();
            async move {
                if healthy.load(Ordering::SeqCst) {
                    Json(json!({"TotalSyncCount": 120})).into_response()
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }),
    )
}

/// Tracks how many requests are being served at once.
#[derive(Default)]
pub struct InFlight {
    current: AtomicI32,
    max: AtomicI32,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_seen(&self) -> i32 {
        self.max.load(Ordering::SeqCst)
    }
}

/// orcus fake that records concurrent request entries and lingers long
/// enough for overlap to be observable.
pub fn counting_orcus_router(in_flight: Arc<InFlight>) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let in_flight = in_flight.clone();
            async move {
                in_flight.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.exit();
                Json(json!({"TotalSyncCount": 1}))
            }
        }),
    )
}

/// orchestrator fake: the four sub-resources under /api, with fixture values
/// matching the assertions in the test files (3 nodes, 2 problems, max audit
/// id 7, 1 failed seed).
pub fn orchestrator_router() -> Router {
    Router::new()
        .route(
            "/api/status",
            get(|| async {
                Json(json!({
                    "Code": "OK",
                    "Details": {
                        "Healthy": true,
                        "IsActiveNode": true,
                        "AvailableNodes": [
                            {"Hostname": "orc1"},
                            {"Hostname": "orc2"},
                            {"Hostname": "orc3"}
                        ]
                    }
                }))
            }),
        )
        .route(
            "/api/problems",
            get(|| async { Json(json!([{"ClusterName": "c1"}, {"ClusterName": "c2"}])) }),
        )
        .route(
            "/api/audit-failure-detection",
            get(|| async { Json(json!([{"Id": 3}, {"Id": 1}, {"Id": 7}, {"Id": 2}])) }),
        )
        .route(
            "/api/agents-failed-seeds",
            get(|| async { Json(json!([{"SeedId": 11}])) }),
        )
}

/// orchestrator fake missing the failover-audit sub-resource; the other
/// three answer normally.
pub fn orchestrator_router_without_audit() -> Router {
    Router::new()
        .route(
            "/api/status",
            get(|| async { Json(json!({"Details": {"Healthy": true, "AvailableNodes": []}})) }),
        )
        .route("/api/problems", get(|| async { Json(json!([])) }))
        .route("/api/agents-failed-seeds", get(|| async { Json(json!([])) }))
}

/// Exporter settings with every backend disabled; tests enable what they
/// spawn fakes for.
pub fn base_settings(port: u16) -> ExporterSettings {
    ExporterSettings {
        port,
        listen: Some("127.0.0.1".to_string()),
        metrics_path: "/metrics".to_string(),
        retries: 0,
        retry_interval: Duration::from_secs(0),
        scrape_timeout: Duration::from_secs(2),
        ssl_verify: false,
        oauth2_proxy_uri: None,
        orcus_uri: None,
        orchestrator_uri: None,
        xtradb_my_cnf: None,
    }
}

/// Find an available port for testing
pub fn get_available_port() -> u16 {
    use std::net::TcpListener;

    // Bind to port 0 lets the OS assign an available ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    listener
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Wait for the exporter to accept connections on the given port
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    use tokio::time::sleep;

    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }

    false
}
