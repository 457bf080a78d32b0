use prometheus::proto::MetricFamily;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clients::{XtradbClient, XtradbMetrics};
use crate::collectors::Collector;
use crate::collectors::util::{self, MetricDesc, ValueKind};

const NAMESPACE: &str = "xtradb_cluster";

const METRICS: &[MetricDesc] = &[
    MetricDesc {
        name: "cluster_size",
        help: "Number of nodes in Xtradb cluster",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "node_state",
        help: "State code of Xtradb cluster node",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "cluster_status",
        help: "State code of Xtradb cluster status",
        kind: ValueKind::Gauge,
    },
];

/// Collects XtraDB cluster status metrics.
pub struct XtradbCollector {
    client: XtradbClient,
    /// At most one fetch is in flight per collector; concurrent scrapes of
    /// the same backend queue here, so the single pooled connection is never
    /// contended.
    scrape_lock: Mutex<()>,
}

impl XtradbCollector {
    #[must_use]
    pub fn new(client: XtradbClient) -> Self {
        Self {
            client,
            scrape_lock: Mutex::new(()),
        }
    }

    /// One family per descriptor-table entry, in table order, all values
    /// from the same snapshot.
    #[allow(clippy::cast_precision_loss)]
    fn snapshot_families(stats: &XtradbMetrics) -> Vec<MetricFamily> {
        let values = [
            stats.cluster_size as f64,
            stats.node_state as f64,
            stats.cluster_status as f64,
        ];

        METRICS
            .iter()
            .zip(values)
            .map(|(desc, value)| util::family(NAMESPACE, desc, value))
            .collect()
    }
}

impl Collector for XtradbCollector {
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
                warn!(collector = NAMESPACE, error = %err, "error getting Xtradb cluster stats");
                vec![util::up_family(NAMESPACE, false)]
            }
        }
    }
}
