use tokio::signal;

/// Resolves when SIGINT or SIGTERM arrives, letting axum finish in-flight
/// requests before the process exits.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        #[allow(clippy::expect_used)]
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("install SIGINT handler");

        #[allow(clippy::expect_used)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv()  => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        // Fallback to Ctrl+C only
        let _ = signal::ctrl_c().await;
    }
}
