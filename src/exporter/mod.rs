//! Composition root: bootstraps one client per enabled backend (retried,
//! blocking, fatal on exhaustion), wraps each in its collector, and serves
//! the merged exposition over HTTP. Backends that fail here keep the process
//! from ever binding its port; backends that fail later only show up as
//! `<namespace>_up 0`.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use opentelemetry::trace::TraceContextExt;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use ulid::Ulid;

use crate::cli::actions::ExporterSettings;
use crate::cli::telemetry::shutdown_tracer;
use crate::clients::{
    Oauth2ProxyClient, OrchestratorClient, OrcusClient, XtradbClient, create_with_retries,
};
use crate::collectors::registry::CollectorRegistry;
use crate::collectors::{
    CollectorKind, Oauth2ProxyCollector, OrchestratorCollector, OrcusCollector, XtradbCollector,
};

mod handlers;
mod shutdown;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

/// Bootstraps all enabled backends and runs the exporter until a termination
/// signal arrives.
///
/// # Errors
///
/// Fails before the listener binds when a backend bootstrap exhausts its
/// retry budget, when the credentials file is invalid, or when the metrics
/// path/bind address is unusable.
pub async fn new(settings: ExporterSettings) -> Result<()> {
    if !settings.metrics_path.starts_with('/') || settings.metrics_path == "/" {
        return Err(anyhow!(
            "Invalid metrics path {:?}: expected an absolute path other than '/'",
            settings.metrics_path
        ));
    }

    let registry = bootstrap_collectors(&settings).await?;

    if registry.is_empty() {
        info!("no collectors enabled, serving build info only");
    }

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_span)
        .on_response(on_response);

    let root_page = handlers::root::RootPage::new(&settings.metrics_path);

    let app = Router::new()
        .route(&settings.metrics_path, get(handlers::metrics::metrics))
        .route("/", get(handlers::root::root))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(trace_layer)
                .layer(from_fn(add_trace_headers))
                .layer(Extension(registry.clone()))
                .layer(Extension(root_page)),
        );

    let (listener, bind_addr) = bind_listener(settings.listen.as_deref(), settings.port).await?;

    println!(
        "{} {} - Listening on {bind_addr}{}\n\nEnabled collectors:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        settings.metrics_path,
        format_list(&registry.collector_names()),
    );

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
    {
        error!(error=%e, "server error");
    }

    info!("shutting down");

    shutdown_tracer();

    Ok(())
}

/// Builds one client per enabled backend through the retry-bounded
/// bootstrapper and wraps it in its collector. Runs sequentially; each
/// constructor self-checks against its backend once per attempt.
async fn bootstrap_collectors(settings: &ExporterSettings) -> Result<CollectorRegistry> {
    let http = reqwest::Client::builder()
        .timeout(settings.scrape_timeout)
        .danger_accept_invalid_certs(!settings.ssl_verify)
        .build()
        .context("Failed to build HTTP client")?;

    let mut collectors: Vec<CollectorKind> = Vec::new();

    if let Some(uri) = &settings.oauth2_proxy_uri {
        info!(uri = %uri, "creating oauth2_proxy client");
        let client = create_with_retries(
            "oauth2_proxy",
            || Oauth2ProxyClient::new(http.clone(), uri.clone()),
            settings.retries,
            settings.retry_interval,
        )
        .await
        .context("Could not create oauth2_proxy client")?;
        collectors.push(Oauth2ProxyCollector::new(client).into());
    }

    if let Some(uri) = &settings.orcus_uri {
        info!(uri = %uri, "creating orcus client");
        let client = create_with_retries(
            "orcus",
            || OrcusClient::new(http.clone(), uri.clone()),
            settings.retries,
            settings.retry_interval,
        )
        .await
        .context("Could not create orcus client")?;
        collectors.push(OrcusCollector::new(client).into());
    }

    if let Some(uri) = &settings.orchestrator_uri {
        info!(uri = %uri, "creating orchestrator client");
        let client = create_with_retries(
            "orchestrator",
            || OrchestratorClient::new(http.clone(), uri.clone()),
            settings.retries,
            settings.retry_interval,
        )
        .await
        .context("Could not create orchestrator client")?;
        collectors.push(OrchestratorCollector::new(client).into());
    }

    if let Some(my_cnf) = &settings.xtradb_my_cnf {
        info!(my_cnf = %my_cnf.display(), "creating Xtradb cluster client");
        let client = create_with_retries(
            "xtradb_cluster",
            || XtradbClient::new(my_cnf, settings.ssl_verify),
            settings.retries,
            settings.retry_interval,
        )
        .await
        .context("Could not create Xtradb cluster client")?;
        collectors.push(XtradbCollector::new(client).into());
    }

    CollectorRegistry::new(collectors)
}

async fn bind_listener(listen: Option<&str>, port: u16) -> Result<(TcpListener, String)> {
    match listen {
        Some(addr) => match addr.parse::<std::net::IpAddr>() {
            Ok(ip) => {
                let bind_addr = format!("{ip}:{port}");
                Ok((
                    TcpListener::bind(&bind_addr)
                        .await
                        .with_context(|| format!("Failed to bind to {bind_addr}"))?,
                    if ip.is_ipv6() {
                        format!("[{ip}]:{port}")
                    } else {
                        bind_addr
                    },
                ))
            }
            Err(_) => Err(anyhow!(
                "Invalid IP address: '{addr}'. Expected IPv4 (e.g., 0.0.0.0) or IPv6 (e.g., ::)"
            )),
        },
        None => {
            // Auto: try IPv6 first, fall back to IPv4
            match TcpListener::bind(format!("::0:{port}")).await {
                Ok(l) => Ok((l, format!("[::]:{port}"))),
                Err(_) => Ok((
                    TcpListener::bind(format!("0.0.0.0:{port}")).await?,
                    format!("0.0.0.0:{port}"),
                )),
            }
        }
    }
}

// Helper to format a list of items with a leading dash and indentation for
// the start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method().as_str();

    let path = request.uri().path();

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "http.server.request",
        otel.kind = "server",
        http.method = method,
        http.route = path,
        http.user_agent = user_agent,
        request_id = request_id,
    )
}

fn on_response<B>(response: &axum::http::Response<B>, latency: Duration, span: &Span) {
    if response.status().is_server_error() {
        span.record("otel.status_code", "ERROR");
    } else {
        span.record("otel.status_code", "OK");
    }

    info!(
        parent: span,
        status = response.status().as_u16(),
        elapsed_ms = latency.as_millis() as u64,
        "request completed"
    );
}

async fn add_trace_headers(req: Request<Body>, next: Next) -> Response {
    let mut res = next.run(req).await;

    let span = Span::current();

    let cx = span.context();

    // CLONE the SpanContext to avoid borrowing a temporary
    let span_context = cx.span().span_context().clone();

    if span_context.is_valid()
        && let Ok(val) = HeaderValue::from_str(&span_context.trace_id().to_string())
    {
        res.headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), val);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_exists() {
        // GIT_COMMIT_HASH is a compile-time constant, either a git hash or
        // the fallback
        assert!(GIT_COMMIT_HASH.len() >= 3);

        let is_hex = GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit());
        let is_fallback = GIT_COMMIT_HASH == ":-(";

        assert!(is_hex || is_fallback);
    }

    #[test]
    fn test_format_list_empty() {
        let items: Vec<String> = vec![];
        assert_eq!(format_list(&items), "");
    }

    #[test]
    fn test_format_list_multiple_items() {
        let items = vec!["oauth2_proxy", "orcus"];
        assert_eq!(format_list(&items), "  - oauth2_proxy\n  - orcus");
    }

    #[test]
    fn test_make_span_creates_span() {
        let request = Request::builder()
            .method("GET")
            .uri("/metrics")
            .header("user-agent", "test-client")
            .body(Body::empty())
            .unwrap();

        let span = make_span(&request);

        assert_eq!(
            span.metadata().map(|m| m.name()),
            Some("http.server.request")
        );
    }

    #[test]
    fn test_on_response_status_codes() {
        use axum::http::{Response, StatusCode};

        let span = info_span!("test");
        let latency = Duration::from_millis(100);

        let response_ok = Response::builder().status(StatusCode::OK).body(()).unwrap();
        on_response(&response_ok, latency, &span);

        let response_err = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(())
            .unwrap();
        on_response(&response_err, latency, &span);
    }
}
