use prometheus::proto::MetricFamily;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clients::Oauth2ProxyClient;
use crate::collectors::Collector;
use crate::collectors::util::{self, MetricDesc};

const NAMESPACE: &str = "oauth2_proxy";

/// Collects oauth2_proxy liveness. The gateway exposes nothing beyond being
/// reachable, so the descriptor table is just the "up" gauge.
pub struct Oauth2ProxyCollector {
    client: Oauth2ProxyClient,
    /// At most one probe is in flight per collector; concurrent scrapes of
    /// the same backend queue here.
    scrape_lock: Mutex<()>,
}

impl Oauth2ProxyCollector {
    #[must_use]
    pub fn new(client: Oauth2ProxyClient) -> Self {
        Self {
            client,
            scrape_lock: Mutex::new(()),
        }
    }
}

impl Collector for Oauth2ProxyCollector {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn describe(&self) -> Vec<&'static MetricDesc> {
        util::with_up(&[])
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        let _in_flight = self.scrape_lock.lock().await;

        match self.client.probe().await {
            Ok(()) => vec![util::up_family(NAMESPACE, true)],
            Err(err) => {
                warn!(collector = NAMESPACE, error = %err, "error getting oauth2_proxy status");
                vec![util::up_family(NAMESPACE, false)]
            }
        }
    }
}
