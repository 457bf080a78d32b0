use prometheus::proto::MetricFamily;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clients::{OrcusClient, OrcusMetrics};
use crate::collectors::Collector;
use crate::collectors::util::{self, MetricDesc, ValueKind};

const NAMESPACE: &str = "orcus";

const METRICS: &[MetricDesc] = &[
    MetricDesc {
        name: "clusters_synced_total",
        help: "Total synced clusters",
        kind: ValueKind::Counter,
    },
    MetricDesc {
        name: "sync_errors_total",
        help: "Total errors during sync",
        kind: ValueKind::Counter,
    },
    MetricDesc {
        name: "last_sync_duration_seconds",
        help: "Duration of last sync process",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "sync_count_total",
        help: "Total count of sync tasks",
        kind: ValueKind::Counter,
    },
];

/// Collects orcus cluster-sync metrics.
pub struct OrcusCollector {
    client: OrcusClient,
    /// At most one fetch is in flight per collector; concurrent scrapes of
    /// the same backend queue here.
    scrape_lock: Mutex<()>,
}

impl OrcusCollector {
    #[must_use]
    pub fn new(client: OrcusClient) -> Self {
        Self {
            client,
            scrape_lock: Mutex::new(()),
        }
    }

    /// One family per descriptor-table entry, in table order, all values
    /// from the same snapshot.
    #[allow(clippy::cast_precision_loss)]
    fn snapshot_families(stats: &OrcusMetrics) -> Vec<MetricFamily> {
        let values = [
            stats.total_sync_clusters as f64,
            stats.total_sync_errors as f64,
            stats.last_sync_duration_seconds,
            stats.total_sync_count as f64,
        ];

        METRICS
            .iter()
            .zip(values)
            .map(|(desc, value)| util::family(NAMESPACE, desc, value))
            .collect()
    }
}

impl Collector for OrcusCollector {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn describe(&self) -> Vec<&'static MetricDesc> {
        util::with_up(METRICS)
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        let _in_flight = self.scrape_lock.lock().await;

        match self.client.fetch_metrics().await {
            Ok(stats) => {
                let mut families = vec![util::up_family(NAMESPACE, true)];
                families.extend(Self::snapshot_families(&stats));
                families
            }
            Err(err) => {
                warn!(collector = NAMESPACE, error = %err, "error getting orcus stats");
                vec![util::up_family(NAMESPACE, false)]
            }
        }
    }
}
